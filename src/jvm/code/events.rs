use super::{BranchInstruction, Frame, Instruction, SynLabel};
use crate::jvm::{Annotation, BinaryName, FieldType};

/// One element of a method's event stream
///
/// A method visitor receives, in order: annotations, [`MethodEvent::Code`], the body
/// (instructions, labels, line numbers, try/catch declarations and frames interleaved),
/// local variable entries, [`MethodEvent::Maxs`], and finally [`MethodEvent::End`]. Abstract and
/// native methods skip straight from their annotations to the end.
#[derive(Clone, Debug, PartialEq)]
pub enum MethodEvent {
    Annotation(Annotation),
    ParameterAnnotation {
        parameter: u8,
        annotation: Annotation,
    },

    /// Start of the method body
    Code,
    Instruction(Instruction),
    Branch(BranchInstruction),
    Label(SynLabel),
    LineNumber {
        line: u16,
        start: SynLabel,
    },
    TryCatchBlock(TryCatchBlock),
    Frame(Frame),
    LocalVariable(LocalVariable),
    Maxs {
        max_stack: u16,
        max_locals: u16,
    },
    End,
}

/// Exception table entry
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TryCatchBlock {
    pub start: SynLabel,
    pub end: SynLabel,
    pub handler: SynLabel,

    /// `None` for blocks that catch everything (`finally`)
    pub catch_type: Option<BinaryName>,
}

/// Local variable table entry
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LocalVariable {
    pub name: String,
    pub descriptor: FieldType,
    pub start: SynLabel,
    pub end: SynLabel,
    pub index: u16,
}
