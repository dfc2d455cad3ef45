use super::{Injected, ProbeContext, ProbeStrategy};
use crate::instrument::handlers::HandlerEntry;
use crate::jvm::code::BranchInstruction;
use crate::jvm::MethodVisitor;
use crate::Error;

/// Marks classes as preprocessed without injecting any code
///
/// Classes carrying this marker are the only ones instrumented when
/// [`Settings::instrument_preprocessed_only`](crate::instrument::Settings) is set.
pub struct PreprocessProbe;

impl ProbeStrategy for PreprocessProbe {
    fn name(&self) -> &'static str {
        "preprocess"
    }

    fn on_method_entry(
        &self,
        _cx: &mut ProbeContext,
        _out: &mut dyn MethodVisitor,
    ) -> Result<Injected, Error> {
        Ok(Injected::NOTHING)
    }

    fn on_method_return(
        &self,
        _cx: &mut ProbeContext,
        _insn: &BranchInstruction,
        _out: &mut dyn MethodVisitor,
    ) -> Result<Injected, Error> {
        Ok(Injected::NOTHING)
    }

    fn on_throw_instruction(
        &self,
        _cx: &mut ProbeContext,
        _out: &mut dyn MethodVisitor,
    ) -> Result<Injected, Error> {
        Ok(Injected::NOTHING)
    }

    fn on_exception_handler_entry(
        &self,
        _cx: &mut ProbeContext,
        _entry: &HandlerEntry,
        _out: &mut dyn MethodVisitor,
    ) -> Result<Injected, Error> {
        Ok(Injected::NOTHING)
    }
}
