use std::fmt;

/// Opaque label
///
/// Labels of the input event stream are created with [`SynLabel::new`]. Labels the instrumenter
/// invents for itself come out of a [`SynLabelGenerator`], which starts at
/// [`SynLabel::FIRST_INJECTED`] so that the two never collide.
#[derive(Copy, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct SynLabel(usize);

impl SynLabel {
    /// First label handed out to injected code
    pub const FIRST_INJECTED: SynLabel = SynLabel(1 << 24);

    pub const fn new(id: usize) -> SynLabel {
        SynLabel(id)
    }

    /// Get the next fresh label
    pub fn next(&self) -> SynLabel {
        SynLabel(self.0 + 1)
    }

    /// Was this label invented by the instrumenter?
    pub fn is_injected(&self) -> bool {
        *self >= SynLabel::FIRST_INJECTED
    }
}

/// Generates new labels
pub trait LabelGenerator<Label> {
    /// Generate a fresh label
    fn fresh_label(&mut self) -> Label;
}

/// Label generator for [`SynLabel`]
///
/// Cloning does not split the generator source - the cloned generator will produce the same
/// sequence of labels as the original.
#[derive(Clone, Debug)]
pub struct SynLabelGenerator(SynLabel);

impl SynLabelGenerator {
    pub fn new(start: SynLabel) -> SynLabelGenerator {
        SynLabelGenerator(start)
    }
}

impl Default for SynLabelGenerator {
    fn default() -> SynLabelGenerator {
        SynLabelGenerator::new(SynLabel::FIRST_INJECTED)
    }
}

impl LabelGenerator<SynLabel> for SynLabelGenerator {
    fn fresh_label(&mut self) -> SynLabel {
        let to_return = self.0;
        self.0 = self.0.next();
        to_return
    }
}

impl fmt::Debug for SynLabel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_injected() {
            formatter.write_fmt(format_args!("i{}", self.0 - SynLabel::FIRST_INJECTED.0))
        } else {
            formatter.write_fmt(format_args!("l{}", self.0))
        }
    }
}
