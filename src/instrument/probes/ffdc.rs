//! First-failure data capture
//!
//! Every `catch` block reports the caught exception to `FFDCFilter.processException`, along with
//! the class, a probe id (the source line of the handler), and the receiver when there is one.
//! Nothing is traced at method entry or exit.

use super::{Injected, ProbeContext, ProbeStrategy};
use crate::instrument::emit::CodeEmitterExts;
use crate::instrument::handlers::{HandlerEntry, HandlerSlot};
use crate::jvm::code::{BranchInstruction, Instruction, InvokeType};
use crate::jvm::{BinaryName, MethodVisitor, UnqualifiedName};
use crate::Error;

pub struct FfdcProbe;

impl FfdcProbe {
    /// `[e] -> []`, reporting `e`
    fn process_exception(cx: &mut ProbeContext, out: &mut dyn MethodVisitor) -> Result<(), Error> {
        let probe_id = match cx.line {
            Some(line) => line.to_string(),
            None => String::from("0"),
        };
        out.const_string(cx.source_id())?;
        out.const_string(probe_id)?;
        if cx.has_this() {
            out.push_instruction(Instruction::ALoad(0))?;
            out.invoke(
                InvokeType::Static,
                BinaryName::FFDC_FILTER,
                UnqualifiedName::PROCESSEXCEPTION,
                "(Ljava/lang/Throwable;Ljava/lang/String;Ljava/lang/String;Ljava/lang/Object;)V",
            )?;
        } else {
            out.invoke(
                InvokeType::Static,
                BinaryName::FFDC_FILTER,
                UnqualifiedName::PROCESSEXCEPTION,
                "(Ljava/lang/Throwable;Ljava/lang/String;Ljava/lang/String;)V",
            )?;
        }
        cx.require_stack(4);
        Ok(())
    }
}

impl ProbeStrategy for FfdcProbe {
    fn name(&self) -> &'static str {
        "ffdc"
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
        cx: &mut ProbeContext,
        out: &mut dyn MethodVisitor,
    ) -> Result<Injected, Error> {
        if !cx.class.trace_exception_throw {
            return Ok(Injected::NOTHING);
        }
        out.push_instruction(Instruction::Dup)?;
        Self::process_exception(cx, out)?;
        Ok(Injected::UNGUARDED)
    }

    fn on_exception_handler_entry(
        &self,
        cx: &mut ProbeContext,
        entry: &HandlerEntry,
        out: &mut dyn MethodVisitor,
    ) -> Result<Injected, Error> {
        if entry
            .exception_types
            .iter()
            .all(|exception| cx.info.ignores(exception))
        {
            log::debug!(
                "{}: not capturing {:?} in {}",
                cx.source_id(),
                entry.exception_types,
                cx.method.signature()
            );
            return Ok(Injected::NOTHING);
        }
        match entry.slot {
            HandlerSlot::Local(slot) => out.push_instruction(Instruction::ALoad(slot))?,
            HandlerSlot::OnStack => out.push_instruction(Instruction::Dup)?,
        }
        Self::process_exception(cx, out)?;
        Ok(Injected::UNGUARDED)
    }

    fn honors_ignore_list(&self) -> bool {
        true
    }
}
