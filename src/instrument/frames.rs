//! Stack map frames around injected code
//!
//! Guarded probes end with a label that the guard jumps to, and from version 50 on that label
//! needs a frame. Frames are compressed against the previous frame in the method, so the tracker
//! follows the locals of the last frame in the input and in the output. Once injected frames make
//! the two differ, input frames are rewritten against the output's previous frame.
//!
//! An injected frame is held back until the next instruction. If the input already has a frame
//! at the same offset, the input frame is kept and the injected one dropped.

use crate::jvm::code::{set_frame_local, Frame, FrameValue};
use crate::jvm::{BinaryName, FieldType, MethodDecl};

#[derive(Debug)]
pub struct FrameTracker {
    class: BinaryName,

    /// Locals of the last input frame
    input: Vec<FrameValue>,

    /// Stack of the last input frame, while no instruction followed it
    input_stack: Option<Vec<FrameValue>>,

    /// Locals of the last frame written out
    output: Vec<FrameValue>,

    /// Locals at the current point, as far as they are known
    current: Vec<FrameValue>,

    /// Injected frame waiting for the next instruction, with its locals
    pending: Option<(Frame, Vec<FrameValue>)>,
}

impl FrameTracker {
    /// Start from the implicit frame at the method's entry
    pub fn new(class: &BinaryName, decl: &MethodDecl) -> FrameTracker {
        let mut locals = vec![];
        if !decl.is_static() {
            locals.push(if decl.is_constructor() {
                FrameValue::UninitializedThis
            } else {
                FrameValue::Object(FieldType::object(class.clone()))
            });
        }
        locals.extend(decl.descriptor.parameters.iter().map(FrameValue::from));

        FrameTracker {
            class: class.clone(),
            input: locals.clone(),
            input_stack: None,
            output: locals.clone(),
            current: locals,
            pending: None,
        }
    }

    /// Frame for the input's frame event, rewritten if the output's previous frame differs
    ///
    /// A frame injected at the same offset is dropped in favour of this one.
    pub fn input_frame(&mut self, frame: Frame) -> Frame {
        self.pending = None;
        let in_sync = self.input == self.output;
        let stack = frame.apply(&mut self.input);
        self.current = self.input.clone();
        let previous = std::mem::replace(&mut self.output, self.input.clone());

        let rewritten = match stack.as_slice() {
            _ if in_sync => frame,
            [] => Frame::between(&previous, &self.input, None),
            [value] => Frame::between(&previous, &self.input, Some(value.clone())),
            _ => Frame::Full {
                locals: self.input.clone(),
                stack: stack.clone(),
            },
        };
        self.input_stack = Some(stack);
        rewritten
    }

    /// Single stack value declared by an input frame at the current offset
    pub fn stack_top(&self) -> Option<FrameValue> {
        match self.input_stack.as_deref() {
            Some([value]) => Some(value.clone()),
            _ => None,
        }
    }

    /// `this` was initialized by the super-initializer call
    pub fn receiver_initialized(&mut self) {
        let this = FrameValue::Object(FieldType::object(self.class.clone()));
        for local in &mut self.current {
            if local == &FrameValue::UninitializedThis {
                *local = this.clone();
            }
        }
    }

    /// A value was stored into a local outside of what input frames describe
    pub fn store(&mut self, slot: u16, value: FrameValue) {
        set_frame_local(&mut self.current, slot, value);
    }

    /// Record the frame for the end of a guarded probe
    pub fn inject(&mut self, stack_value: Option<FrameValue>) {
        let frame = Frame::between(&self.output, &self.current, stack_value);
        self.pending = Some((frame, self.current.clone()));
    }

    /// Frame to write before the next instruction, if one is waiting
    pub fn before_instruction(&mut self) -> Option<Frame> {
        self.input_stack = None;
        let (frame, locals) = self.pending.take()?;
        self.output = locals;
        Some(frame)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::{MethodAccessFlags, MethodDescriptor, Name, ParseDescriptor, UnqualifiedName};

    fn widget() -> BinaryName {
        BinaryName::from_string(String::from("com/acme/Widget")).unwrap()
    }

    fn widget_value() -> FrameValue {
        FrameValue::Object(FieldType::object(widget()))
    }

    fn decl(access_flags: MethodAccessFlags, name: UnqualifiedName, desc: &str) -> MethodDecl {
        MethodDecl {
            access_flags,
            name,
            descriptor: MethodDescriptor::parse(desc).unwrap(),
            exceptions: vec![],
        }
    }

    #[test]
    fn constructor_frame_after_receiver_init() {
        let init = decl(MethodAccessFlags::PUBLIC, UnqualifiedName::INIT, "(I)V");
        let mut tracker = FrameTracker::new(&widget(), &init);

        tracker.receiver_initialized();
        tracker.inject(None);
        assert_eq!(
            tracker.before_instruction(),
            Some(Frame::Full {
                locals: vec![widget_value(), FrameValue::Integer],
                stack: vec![],
            })
        );

        // Later frames are relative to the rewritten one
        tracker.inject(Some(FrameValue::Integer));
        assert_eq!(
            tracker.before_instruction(),
            Some(Frame::Same1 {
                stack_value: FrameValue::Integer
            })
        );
        assert_eq!(tracker.before_instruction(), None);
    }

    #[test]
    fn input_frame_wins_at_the_same_offset() {
        let run = decl(
            MethodAccessFlags::STATIC,
            UnqualifiedName::from_string(String::from("run")).unwrap(),
            "(I)V",
        );
        let mut tracker = FrameTracker::new(&widget(), &run);
        tracker.inject(None);
        assert_eq!(tracker.input_frame(Frame::Same), Frame::Same);
        assert_eq!(tracker.before_instruction(), None);
    }

    #[test]
    fn input_frames_rewritten_after_a_store() {
        let run = decl(
            MethodAccessFlags::STATIC,
            UnqualifiedName::from_string(String::from("run")).unwrap(),
            "()V",
        );
        let exception = FrameValue::Object(FieldType::object(BinaryName::THROWABLE));
        let mut tracker = FrameTracker::new(&widget(), &run);

        let handler = Frame::Same1 {
            stack_value: exception.clone(),
        };
        assert_eq!(tracker.input_frame(handler.clone()), handler);
        assert_eq!(tracker.stack_top(), Some(exception.clone()));
        assert_eq!(tracker.before_instruction(), None);
        assert_eq!(tracker.stack_top(), None);

        tracker.store(0, exception.clone());
        tracker.inject(None);
        assert_eq!(
            tracker.before_instruction(),
            Some(Frame::Append {
                locals: vec![exception.clone()]
            })
        );

        // Relative to the handler frame in the input, but not in the output
        assert_eq!(
            tracker.input_frame(Frame::Same),
            Frame::Chop { num_locals: 1 }
        );
        tracker.inject(None);
        assert_eq!(tracker.before_instruction(), Some(Frame::Same));
    }
}
