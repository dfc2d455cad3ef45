use crate::jvm::UnqualifiedName;

/// Configuration of one instrumenter
///
/// Start from [`Settings::new`] and adjust the public fields.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Which family of probes gets injected
    pub probe: ProbeKind,

    /// Also fire a probe at every explicit `athrow`
    ///
    /// Classes can opt in individually with `@TraceOptions(traceExceptionThrow = true)`.
    pub trace_exception_throw: bool,

    /// Have trace probes fire when a `catch` block is entered
    ///
    /// This only affects the trace families. Failure capture always fires on handler entry,
    /// since that is its sole purpose. Classes can opt in individually with
    /// `@TraceOptions(traceExceptionHandling = true)`.
    pub trace_exception_handling: bool,

    /// Only instrument classes whose marker annotation records an earlier preprocess pass
    pub instrument_preprocessed_only: bool,

    /// Emit stack map frames after guarded probe code
    ///
    /// Frames are only emitted into classes whose version requires them. Leave this off when
    /// whatever writes the class out recomputes frames anyway.
    pub regenerate_frames: bool,

    /// Name of the static field holding a `java.util.logging.Logger`
    pub logger_field_name: UnqualifiedName,

    /// Name of the static field holding a `TraceComponent`
    pub trace_component_field_name: UnqualifiedName,
}

/// Available probe families
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// `java.util.logging` entering/exiting/throwing calls
    Jsr47,

    /// Traditional WebSphere `com.ibm.ejs.ras.Tr` trace
    WebSphereTr,

    /// Liberty `com.ibm.websphere.ras.Tr` trace
    LibertyTr,

    /// First failure data capture on caught exceptions
    Ffdc,

    /// No code changes, only metadata collection and the marker annotation
    Preprocess,
}

impl Settings {
    pub fn new(probe: ProbeKind) -> Settings {
        Settings {
            probe,
            trace_exception_throw: false,
            trace_exception_handling: false,
            instrument_preprocessed_only: false,
            regenerate_frames: true,
            logger_field_name: UnqualifiedName::LOGGER_FIELD,
            trace_component_field_name: UnqualifiedName::TRACE_COMPONENT_FIELD,
        }
    }
}
