use super::SynLabel;
use crate::jvm::{BaseType, FieldType};
use crate::util::Width;

/// Stack map frame, in the compressed form the `StackMapTable` attribute uses
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Frame {
    Full {
        locals: Vec<FrameValue>,
        stack: Vec<FrameValue>,
    },
    Append {
        locals: Vec<FrameValue>,
    },
    Chop {
        num_locals: u8,
    },
    Same,
    Same1 {
        stack_value: FrameValue,
    },
}

/// Verification type of a single local or stack entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameValue {
    Top,
    Integer,
    Float,
    Long,
    Double,
    Null,
    UninitializedThis,
    Object(FieldType),
    Uninitialized(SynLabel),
}

impl From<&FieldType> for FrameValue {
    fn from(field_type: &FieldType) -> FrameValue {
        match field_type {
            FieldType::Base(BaseType::Long) => FrameValue::Long,
            FieldType::Base(BaseType::Double) => FrameValue::Double,
            FieldType::Base(BaseType::Float) => FrameValue::Float,
            FieldType::Base(_) => FrameValue::Integer,
            reference => FrameValue::Object(reference.clone()),
        }
    }
}

impl Width for FrameValue {
    fn width(&self) -> usize {
        match self {
            FrameValue::Long | FrameValue::Double => 2,
            _ => 1,
        }
    }
}

impl Frame {
    /// Expand the frame against the locals of the previous frame
    ///
    /// `locals` is updated in place and the operand stack is returned.
    pub fn apply(&self, locals: &mut Vec<FrameValue>) -> Vec<FrameValue> {
        match self {
            Frame::Full {
                locals: full_locals,
                stack,
            } => {
                *locals = full_locals.clone();
                stack.clone()
            }
            Frame::Append {
                locals: appended,
            } => {
                locals.extend(appended.iter().cloned());
                vec![]
            }
            Frame::Chop { num_locals } => {
                let keep = locals.len().saturating_sub(*num_locals as usize);
                locals.truncate(keep);
                vec![]
            }
            Frame::Same => vec![],
            Frame::Same1 { stack_value } => vec![stack_value.clone()],
        }
    }

    /// Smallest frame describing `locals` and an optional single stack value, relative to the
    /// locals of the previous frame
    pub fn between(
        previous: &[FrameValue],
        locals: &[FrameValue],
        stack_value: Option<FrameValue>,
    ) -> Frame {
        if previous == locals {
            return match stack_value {
                None => Frame::Same,
                Some(stack_value) => Frame::Same1 { stack_value },
            };
        }
        if stack_value.is_none() {
            if locals.len() > previous.len()
                && locals.len() - previous.len() <= 3
                && locals.starts_with(previous)
            {
                return Frame::Append {
                    locals: locals[previous.len()..].to_vec(),
                };
            }
            if previous.len() > locals.len()
                && previous.len() - locals.len() <= 3
                && previous.starts_with(locals)
            {
                return Frame::Chop {
                    num_locals: (previous.len() - locals.len()) as u8,
                };
            }
        }
        Frame::Full {
            locals: locals.to_vec(),
            stack: stack_value.into_iter().collect(),
        }
    }
}

/// Overwrite the local at slot index `slot` in a frame's list of locals
///
/// Locals in a frame are listed one entry per value, so `long` and `double` entries cover two
/// slots. A wide value cut in half by the store becomes `Top`.
pub fn set_frame_local(locals: &mut Vec<FrameValue>, slot: u16, value: FrameValue) {
    // `None` marks the upper half of a wide value
    let mut slots: Vec<Option<FrameValue>> = vec![];
    for local in locals.drain(..) {
        let wide = local.width() == 2;
        slots.push(Some(local));
        if wide {
            slots.push(None);
        }
    }

    let slot = slot as usize;
    let end = slot + value.width();
    while slots.len() < end {
        slots.push(Some(FrameValue::Top));
    }
    if slots[slot].is_none() {
        slots[slot - 1] = Some(FrameValue::Top);
    }
    if end < slots.len() && slots[end].is_none() {
        slots[end] = Some(FrameValue::Top);
    }
    if value.width() == 2 {
        slots[slot + 1] = None;
    }
    slots[slot] = Some(value);

    locals.extend(slots.into_iter().flatten());
    while locals.last() == Some(&FrameValue::Top) {
        locals.pop();
    }
}
