//! `java.util.logging` trace
//!
//! Every class gets a `Logger` named after the class, and probes log at `FINER` through the
//! logger's `entering`/`exiting`/`throwing` convenience methods. Each probe is guarded by
//! `isLoggable(Level.FINER)` so that disabled trace costs one call and a branch.

use super::{Injected, ProbeContext, ProbeStrategy, TraceHolder};
use crate::instrument::emit::{redaction_placeholder, CodeEmitterExts};
use crate::instrument::handlers::{HandlerEntry, HandlerSlot};
use crate::jvm::code::{
    BranchInstruction, FieldRef, Instruction, InvokeType, OrdComparison, SynLabel,
};
use crate::jvm::{BinaryName, FieldType, MethodVisitor, UnqualifiedName};
use crate::Error;

const CAUGHT_MESSAGE: &str = "Caught exception";

pub struct Jsr47Probe {
    field_name: UnqualifiedName,
}

impl Jsr47Probe {
    pub fn new(field_name: UnqualifiedName) -> Jsr47Probe {
        Jsr47Probe { field_name }
    }

    fn level_finer() -> FieldRef {
        FieldRef {
            owner: BinaryName::LEVEL,
            name: UnqualifiedName::FINER,
            descriptor: FieldType::object(BinaryName::LEVEL),
        }
    }

    /// Skip to the returned label unless `FINER` is loggable
    fn guard(cx: &mut ProbeContext, out: &mut dyn MethodVisitor) -> Result<SynLabel, Error> {
        let skip = cx.fresh_label();
        out.get_static(cx.trace_holder()?)?;
        out.get_static(Self::level_finer())?;
        out.invoke(
            InvokeType::Virtual,
            BinaryName::LOGGER,
            UnqualifiedName::ISLOGGABLE,
            "(Ljava/util/logging/Level;)Z",
        )?;
        out.push_branch_instruction(BranchInstruction::If(OrdComparison::EQ, skip))?;
        Ok(skip)
    }

    /// Push the logger, class, and method arguments below the value on top of the stack
    fn insert_source_below_top(
        cx: &mut ProbeContext,
        out: &mut dyn MethodVisitor,
    ) -> Result<(), Error> {
        out.get_static(cx.trace_holder()?)?;
        out.swap()?;
        out.const_string(cx.source_id())?;
        out.swap()?;
        out.const_string(cx.method_name())?;
        out.swap()
    }
}

impl ProbeStrategy for Jsr47Probe {
    fn name(&self) -> &'static str {
        "jsr47"
    }

    fn trace_holder(&self) -> Option<TraceHolder> {
        Some(TraceHolder {
            name: self.field_name.clone(),
            descriptor: FieldType::object(BinaryName::LOGGER),
        })
    }

    fn initialize_trace_holder(
        &self,
        cx: &mut ProbeContext,
        out: &mut dyn MethodVisitor,
    ) -> Result<Injected, Error> {
        out.const_string(cx.source_id())?;
        match &cx.class.info.trace_options.message_bundle {
            Some(bundle) => {
                out.const_string(bundle.as_str())?;
                out.invoke(
                    InvokeType::Static,
                    BinaryName::LOGGER,
                    UnqualifiedName::GETLOGGER,
                    "(Ljava/lang/String;Ljava/lang/String;)Ljava/util/logging/Logger;",
                )?;
            }
            None => {
                out.invoke(
                    InvokeType::Static,
                    BinaryName::LOGGER,
                    UnqualifiedName::GETLOGGER,
                    "(Ljava/lang/String;)Ljava/util/logging/Logger;",
                )?;
            }
        }
        out.put_static(cx.trace_holder()?)?;
        cx.require_stack(2);
        Ok(Injected::UNGUARDED)
    }

    fn on_method_entry(
        &self,
        cx: &mut ProbeContext,
        out: &mut dyn MethodVisitor,
    ) -> Result<Injected, Error> {
        if !cx.traces_entry_and_exit() {
            return Ok(Injected::NOTHING);
        }
        let skip = Self::guard(cx, out)?;
        out.get_static(cx.trace_holder()?)?;
        out.const_string(cx.source_id())?;
        out.const_string(cx.method_name())?;
        if cx.method.descriptor.parameters.is_empty() {
            out.invoke(
                InvokeType::Virtual,
                BinaryName::LOGGER,
                UnqualifiedName::ENTERING,
                "(Ljava/lang/String;Ljava/lang/String;)V",
            )?;
        } else {
            out.arguments_array(cx.method, |idx| cx.is_parameter_sensitive(idx))?;
            out.invoke(
                InvokeType::Virtual,
                BinaryName::LOGGER,
                UnqualifiedName::ENTERING,
                "(Ljava/lang/String;Ljava/lang/String;[Ljava/lang/Object;)V",
            )?;
        }
        out.place_label(skip)?;
        cx.require_stack(8);
        Ok(Injected::GUARDED)
    }

    fn on_method_return(
        &self,
        cx: &mut ProbeContext,
        insn: &BranchInstruction,
        out: &mut dyn MethodVisitor,
    ) -> Result<Injected, Error> {
        if !cx.traces_entry_and_exit() {
            return Ok(Injected::NOTHING);
        }
        let return_type = match (insn, &cx.method.descriptor.return_type) {
            (BranchInstruction::Return, _) | (_, None) => None,
            (_, Some(return_type)) => Some(return_type.clone()),
        };

        let skip = Self::guard(cx, out)?;
        match return_type {
            None => {
                out.get_static(cx.trace_holder()?)?;
                out.const_string(cx.source_id())?;
                out.const_string(cx.method_name())?;
                out.invoke(
                    InvokeType::Virtual,
                    BinaryName::LOGGER,
                    UnqualifiedName::EXITING,
                    "(Ljava/lang/String;Ljava/lang/String;)V",
                )?;
            }
            Some(return_type) => {
                if cx.is_result_sensitive() {
                    out.const_string(redaction_placeholder(&return_type))?;
                } else {
                    out.dup_value(&return_type)?;
                    out.box_value(&return_type)?;
                }
                Self::insert_source_below_top(cx, out)?;
                out.invoke(
                    InvokeType::Virtual,
                    BinaryName::LOGGER,
                    UnqualifiedName::EXITING,
                    "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/Object;)V",
                )?;
            }
        }
        out.place_label(skip)?;
        cx.require_stack(6);
        Ok(Injected::GUARDED)
    }

    fn on_throw_instruction(
        &self,
        cx: &mut ProbeContext,
        out: &mut dyn MethodVisitor,
    ) -> Result<Injected, Error> {
        if !cx.class.trace_exception_throw || !cx.traces_exceptions() {
            return Ok(Injected::NOTHING);
        }
        let skip = Self::guard(cx, out)?;
        out.push_instruction(Instruction::Dup)?;
        Self::insert_source_below_top(cx, out)?;
        out.invoke(
            InvokeType::Virtual,
            BinaryName::LOGGER,
            UnqualifiedName::THROWING,
            "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/Throwable;)V",
        )?;
        out.place_label(skip)?;
        cx.require_stack(5);
        Ok(Injected::GUARDED)
    }

    fn on_exception_handler_entry(
        &self,
        cx: &mut ProbeContext,
        entry: &HandlerEntry,
        out: &mut dyn MethodVisitor,
    ) -> Result<Injected, Error> {
        if !cx.class.trace_exception_handling || !cx.traces_exceptions() {
            return Ok(Injected::NOTHING);
        }
        let skip = Self::guard(cx, out)?;
        match entry.slot {
            HandlerSlot::Local(slot) => {
                out.get_static(cx.trace_holder()?)?;
                out.get_static(Self::level_finer())?;
                out.const_string(cx.source_id())?;
                out.const_string(cx.method_name())?;
                out.const_string(CAUGHT_MESSAGE)?;
                out.push_instruction(Instruction::ALoad(slot))?;
            }
            HandlerSlot::OnStack => {
                out.push_instruction(Instruction::Dup)?;
                out.get_static(cx.trace_holder()?)?;
                out.swap()?;
                out.get_static(Self::level_finer())?;
                out.swap()?;
                out.const_string(cx.source_id())?;
                out.swap()?;
                out.const_string(cx.method_name())?;
                out.swap()?;
                out.const_string(CAUGHT_MESSAGE)?;
                out.swap()?;
            }
        }
        out.invoke(
            InvokeType::Virtual,
            BinaryName::LOGGER,
            UnqualifiedName::LOGP,
            "(Ljava/util/logging/Level;Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;Ljava/lang/Throwable;)V",
        )?;
        out.place_label(skip)?;
        cx.require_stack(7);
        Ok(Injected::GUARDED)
    }
}
