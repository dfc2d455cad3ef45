//! `Tr`/`TraceComponent` trace
//!
//! Classes register a `TraceComponent` at static initialization and probes go through the static
//! `Tr.entry`, `Tr.exit` and `Tr.event` methods. The WebSphere and Liberty flavours only differ in
//! the package of `Tr` and `TraceComponent`.

use super::{Injected, ProbeContext, ProbeStrategy, TraceHolder};
use crate::instrument::emit::{redaction_placeholder, CodeEmitterExts};
use crate::instrument::handlers::{HandlerEntry, HandlerSlot};
use crate::jvm::code::{BranchInstruction, Instruction, InvokeType, OrdComparison, SynLabel};
use crate::jvm::{BinaryName, FieldType, MethodVisitor, Name, UnqualifiedName};
use crate::Error;

pub struct TraceComponentProbe {
    name: &'static str,
    tr: BinaryName,
    trace_component: BinaryName,
    field_name: UnqualifiedName,
}

/// Which enablement check guards a probe
#[derive(Copy, Clone)]
enum Guard {
    Entry,
    Event,
}

impl TraceComponentProbe {
    pub fn websphere(field_name: UnqualifiedName) -> TraceComponentProbe {
        TraceComponentProbe {
            name: "websphere-tr",
            tr: BinaryName::WEBSPHERE_TR,
            trace_component: BinaryName::WEBSPHERE_TRACE_COMPONENT,
            field_name,
        }
    }

    pub fn liberty(field_name: UnqualifiedName) -> TraceComponentProbe {
        TraceComponentProbe {
            name: "liberty-tr",
            tr: BinaryName::LIBERTY_TR,
            trace_component: BinaryName::LIBERTY_TRACE_COMPONENT,
            field_name,
        }
    }

    fn tc_descriptor(&self) -> String {
        format!("L{};", self.trace_component.as_str())
    }

    /// Skip to the returned label unless trace is on for this component
    fn guard(
        &self,
        cx: &mut ProbeContext,
        guard: Guard,
        out: &mut dyn MethodVisitor,
    ) -> Result<SynLabel, Error> {
        let skip = cx.fresh_label();
        out.invoke(
            InvokeType::Static,
            self.trace_component.clone(),
            UnqualifiedName::ISANYTRACINGENABLED,
            "()Z",
        )?;
        out.push_branch_instruction(BranchInstruction::If(OrdComparison::EQ, skip))?;
        out.get_static(cx.trace_holder()?)?;
        let check = match guard {
            Guard::Entry => UnqualifiedName::ISENTRYENABLED,
            Guard::Event => UnqualifiedName::ISEVENTENABLED,
        };
        out.invoke(InvokeType::Virtual, self.trace_component.clone(), check, "()Z")?;
        out.push_branch_instruction(BranchInstruction::If(OrdComparison::EQ, skip))?;
        Ok(skip)
    }

    /// Call `Tr.exit` with the object on top of the stack as the traced value
    ///
    /// Consumes that object.
    fn exit_with_top(
        &self,
        cx: &mut ProbeContext,
        out: &mut dyn MethodVisitor,
    ) -> Result<(), Error> {
        let tc = self.tc_descriptor();
        if cx.has_this() {
            out.push_instruction(Instruction::ALoad(0))?;
            out.swap()?;
        }
        out.get_static(cx.trace_holder()?)?;
        out.swap()?;
        out.const_string(cx.method_name())?;
        out.swap()?;
        let descriptor = if cx.has_this() {
            format!("(Ljava/lang/Object;{tc}Ljava/lang/String;Ljava/lang/Object;)V")
        } else {
            format!("({tc}Ljava/lang/String;Ljava/lang/Object;)V")
        };
        out.invoke(
            InvokeType::Static,
            self.tr.clone(),
            UnqualifiedName::EXIT,
            &descriptor,
        )
    }
}

impl ProbeStrategy for TraceComponentProbe {
    fn name(&self) -> &'static str {
        self.name
    }

    fn trace_holder(&self) -> Option<TraceHolder> {
        Some(TraceHolder {
            name: self.field_name.clone(),
            descriptor: FieldType::object(self.trace_component.clone()),
        })
    }

    fn initialize_trace_holder(
        &self,
        cx: &mut ProbeContext,
        out: &mut dyn MethodVisitor,
    ) -> Result<Injected, Error> {
        let options = &cx.class.info.trace_options;
        out.const_class(FieldType::object(cx.class.name.clone()))?;
        match options.trace_group() {
            Some(group) => out.const_string(group)?,
            None => out.const_null()?,
        }
        match &options.message_bundle {
            Some(bundle) => out.const_string(bundle.as_str())?,
            None => out.const_null()?,
        }
        let descriptor = format!(
            "(Ljava/lang/Class;Ljava/lang/String;Ljava/lang/String;){}",
            self.tc_descriptor()
        );
        out.invoke(
            InvokeType::Static,
            self.tr.clone(),
            UnqualifiedName::REGISTER,
            &descriptor,
        )?;
        out.put_static(cx.trace_holder()?)?;
        cx.require_stack(3);
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
        let tc = self.tc_descriptor();
        let skip = self.guard(cx, Guard::Entry, out)?;
        if cx.has_this() {
            out.push_instruction(Instruction::ALoad(0))?;
        }
        out.get_static(cx.trace_holder()?)?;
        out.const_string(cx.method_name())?;
        out.arguments_array(cx.method, |idx| cx.is_parameter_sensitive(idx))?;
        let descriptor = if cx.has_this() {
            format!("(Ljava/lang/Object;{tc}Ljava/lang/String;[Ljava/lang/Object;)V")
        } else {
            format!("({tc}Ljava/lang/String;[Ljava/lang/Object;)V")
        };
        out.invoke(
            InvokeType::Static,
            self.tr.clone(),
            UnqualifiedName::ENTRY,
            &descriptor,
        )?;
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

        let skip = self.guard(cx, Guard::Entry, out)?;
        match return_type {
            None => {
                let tc = self.tc_descriptor();
                if cx.has_this() {
                    out.push_instruction(Instruction::ALoad(0))?;
                }
                out.get_static(cx.trace_holder()?)?;
                out.const_string(cx.method_name())?;
                let descriptor = if cx.has_this() {
                    format!("(Ljava/lang/Object;{tc}Ljava/lang/String;)V")
                } else {
                    format!("({tc}Ljava/lang/String;)V")
                };
                out.invoke(
                    InvokeType::Static,
                    self.tr.clone(),
                    UnqualifiedName::EXIT,
                    &descriptor,
                )?;
            }
            Some(return_type) => {
                if cx.is_result_sensitive() {
                    out.const_string(redaction_placeholder(&return_type))?;
                } else {
                    out.dup_value(&return_type)?;
                    out.box_value(&return_type)?;
                }
                self.exit_with_top(cx, out)?;
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
        let skip = self.guard(cx, Guard::Entry, out)?;
        out.push_instruction(Instruction::Dup)?;
        self.exit_with_top(cx, out)?;
        out.place_label(skip)?;
        cx.require_stack(6);
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
        let message = format!("Caught exception in {}", cx.method_name());
        let skip = self.guard(cx, Guard::Event, out)?;
        match entry.slot {
            HandlerSlot::Local(slot) => {
                out.get_static(cx.trace_holder()?)?;
                out.const_string(message)?;
                out.const_int(1)?;
                out.push_instruction(Instruction::ANewArray(FieldType::object(
                    BinaryName::OBJECT,
                )))?;
                out.push_instruction(Instruction::Dup)?;
                out.const_int(0)?;
                out.push_instruction(Instruction::ALoad(slot))?;
                out.push_instruction(Instruction::AAStore)?;
            }
            HandlerSlot::OnStack => {
                // [e] -> [e tc msg arr] with e stored in arr[0]
                out.push_instruction(Instruction::Dup)?;
                out.get_static(cx.trace_holder()?)?;
                out.swap()?;
                out.const_string(message)?;
                out.swap()?;
                out.const_int(1)?;
                out.push_instruction(Instruction::ANewArray(FieldType::object(
                    BinaryName::OBJECT,
                )))?;
                out.push_instruction(Instruction::DupX1)?;
                out.swap()?;
                out.const_int(0)?;
                out.swap()?;
                out.push_instruction(Instruction::AAStore)?;
            }
        }
        let descriptor = format!(
            "({}Ljava/lang/String;[Ljava/lang/Object;)V",
            self.tc_descriptor()
        );
        out.invoke(
            InvokeType::Static,
            self.tr.clone(),
            UnqualifiedName::EVENT,
            &descriptor,
        )?;
        out.place_label(skip)?;
        cx.require_stack(7);
        Ok(Injected::GUARDED)
    }
}
