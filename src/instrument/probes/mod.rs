//! Probe families
//!
//! A [`ProbeStrategy`] decides what code goes at each instrumentation point of a method. The
//! method orchestrator calls it with the output visitor positioned exactly where the probe
//! belongs, and the strategy emits instructions there (or nothing). Strategies never see the
//! original instructions: those are forwarded by the orchestrator afterwards.
//!
//! Conventions all families follow:
//!
//!   - probes leave the operand stack exactly as they found it
//!   - probes never allocate locals
//!   - arguments are traced as an `Object[]`, with primitives boxed and sensitive values replaced
//!     by [`redaction_placeholder`](super::emit::redaction_placeholder)

mod ffdc;
mod jsr47;
mod preprocess;
mod trace_component;

pub use ffdc::FfdcProbe;
pub use jsr47::Jsr47Probe;
pub use preprocess::PreprocessProbe;
pub use trace_component::TraceComponentProbe;

use super::handlers::HandlerEntry;
use super::metadata::{ClassInfo, MethodInfo};
use super::settings::{ProbeKind, Settings};
use crate::jvm::code::{BranchInstruction, FieldRef, LabelGenerator, SynLabel, SynLabelGenerator};
use crate::jvm::{BinaryName, FieldType, MethodDecl, MethodVisitor, UnqualifiedName, Version};
use crate::Error;
use std::sync::Arc;

/// Static field in which a probe family keeps its trace handle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceHolder {
    pub name: UnqualifiedName,
    pub descriptor: FieldType,
}

impl TraceHolder {
    pub fn field(&self, class: &BinaryName) -> FieldRef {
        FieldRef {
            owner: class.clone(),
            name: self.name.clone(),
            descriptor: self.descriptor.clone(),
        }
    }
}

/// Class-wide facts shared by every probe of a class
#[derive(Clone, Debug)]
pub struct ClassContext {
    pub name: BinaryName,
    pub super_name: Option<BinaryName>,
    pub version: Version,
    pub info: Arc<ClassInfo>,

    /// Holder field, once the class orchestrator has settled on one
    pub trace_holder: Option<TraceHolder>,

    /// Probe explicit throws
    pub trace_exception_throw: bool,

    /// Trace handler entry (trace families only)
    pub trace_exception_handling: bool,

    /// Emit frames after guarded probes
    pub emit_frames: bool,
}

/// Everything a probe may consult at one instrumentation point
pub struct ProbeContext<'a> {
    pub class: &'a ClassContext,
    pub method: &'a MethodDecl,
    pub info: &'a MethodInfo,

    /// Most recent source line, if the method has line numbers
    pub line: Option<u16>,
    labels: &'a mut SynLabelGenerator,
    extra_stack: &'a mut u16,
}

impl<'a> ProbeContext<'a> {
    pub fn new(
        class: &'a ClassContext,
        method: &'a MethodDecl,
        info: &'a MethodInfo,
        line: Option<u16>,
        labels: &'a mut SynLabelGenerator,
        extra_stack: &'a mut u16,
    ) -> ProbeContext<'a> {
        ProbeContext {
            class,
            method,
            info,
            line,
            labels,
            extra_stack,
        }
    }

    /// Label for injected code
    pub fn fresh_label(&mut self) -> SynLabel {
        self.labels.fresh_label()
    }

    /// Note that the injected code needs this many operand stack slots on top of whatever the
    /// original code had there
    pub fn require_stack(&mut self, slots: u16) {
        *self.extra_stack = (*self.extra_stack).max(slots);
    }

    /// Field reference to the trace holder
    pub fn trace_holder(&self) -> Result<FieldRef, Error> {
        match &self.class.trace_holder {
            Some(holder) => Ok(holder.field(&self.class.name)),
            None => Err(Error::UnexpectedEvent {
                method: self.method.signature(),
                event: String::from("trace probe in a class without a trace holder"),
            }),
        }
    }

    /// Is entry/exit trace wanted for this method?
    pub fn traces_entry_and_exit(&self) -> bool {
        !self.method.is_static_initializer() && self.traces_exceptions()
    }

    /// Is exception trace wanted for this method?
    pub fn traces_exceptions(&self) -> bool {
        !(self.class.info.trivial || self.info.trivial || self.info.manual_trace)
    }

    /// Is the receiver available to pass along?
    pub fn has_this(&self) -> bool {
        !self.method.is_static()
    }

    pub fn is_parameter_sensitive(&self, parameter: usize) -> bool {
        self.class.info.sensitive || self.info.is_parameter_sensitive(parameter)
    }

    pub fn is_result_sensitive(&self) -> bool {
        self.class.info.sensitive || self.info.sensitive_result
    }

    /// Source identifier of the class, as trace and failure capture report it
    pub fn source_id(&self) -> String {
        self.class.name.java_name()
    }

    pub fn method_name(&self) -> &str {
        self.method.name.as_ref()
    }
}

/// What a probe emitted
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Injected {
    /// Some instructions were emitted
    pub code: bool,

    /// The emitted code ends with a label that a guard jumps to, which needs a stack map frame
    pub guarded: bool,
}

impl Injected {
    pub const NOTHING: Injected = Injected {
        code: false,
        guarded: false,
    };
    pub const UNGUARDED: Injected = Injected {
        code: true,
        guarded: false,
    };
    pub const GUARDED: Injected = Injected {
        code: true,
        guarded: true,
    };
}

/// Code generator for one probe family
pub trait ProbeStrategy: Send + Sync {
    /// Name recorded in the marker annotation of classes this family instrumented
    fn name(&self) -> &'static str;

    /// Static field the family needs in every instrumented class
    fn trace_holder(&self) -> Option<TraceHolder> {
        None
    }

    /// Emit the code that stores a fresh handle into the trace holder
    ///
    /// Runs at the very start of the static initializer.
    fn initialize_trace_holder(
        &self,
        _cx: &mut ProbeContext,
        _out: &mut dyn MethodVisitor,
    ) -> Result<Injected, Error> {
        Ok(Injected::NOTHING)
    }

    /// Method entry (after the super-initializer, for constructors)
    fn on_method_entry(
        &self,
        cx: &mut ProbeContext,
        out: &mut dyn MethodVisitor,
    ) -> Result<Injected, Error>;

    /// Just before a return instruction, with the returned value on top of the stack
    fn on_method_return(
        &self,
        cx: &mut ProbeContext,
        insn: &BranchInstruction,
        out: &mut dyn MethodVisitor,
    ) -> Result<Injected, Error>;

    /// Just before `athrow`, with the exception on top of the stack
    fn on_throw_instruction(
        &self,
        cx: &mut ProbeContext,
        out: &mut dyn MethodVisitor,
    ) -> Result<Injected, Error>;

    /// At the start of a `catch` block
    fn on_exception_handler_entry(
        &self,
        cx: &mut ProbeContext,
        entry: &HandlerEntry,
        out: &mut dyn MethodVisitor,
    ) -> Result<Injected, Error>;

    /// Must every `@FFDCIgnore` type be matched by a handler of the method?
    fn honors_ignore_list(&self) -> bool {
        false
    }
}

/// Construct the probe family the settings ask for
pub fn probe_strategy(settings: &Settings) -> Box<dyn ProbeStrategy> {
    match settings.probe {
        ProbeKind::Jsr47 => Box::new(Jsr47Probe::new(settings.logger_field_name.clone())),
        ProbeKind::WebSphereTr => Box::new(TraceComponentProbe::websphere(
            settings.trace_component_field_name.clone(),
        )),
        ProbeKind::LibertyTr => Box::new(TraceComponentProbe::liberty(
            settings.trace_component_field_name.clone(),
        )),
        ProbeKind::Ffdc => Box::new(FfdcProbe),
        ProbeKind::Preprocess => Box::new(PreprocessProbe),
    }
}
