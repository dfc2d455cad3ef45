use crate::jvm::code::SynLabel;
use crate::jvm::BinaryName;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// A class or member name failed validation
    MalformedName(String),

    /// A type or method descriptor could not be parsed
    MalformedDescriptor(std::io::Error),

    /// Events arrived in an order no well-formed class produces (indicates a caller bug)
    UnexpectedEvent {
        method: String,
        event: String,
    },

    /// Abstract execution of a constructor prefix failed (corrupt input or an engine bug)
    StackSimulation {
        method: String,
        instruction: String,
        kind: SimulationErrorKind,
    },

    /// A method declares it ignores an exception type that none of its handlers catch
    StaleIgnoreDirective {
        class: BinaryName,
        method: String,
        exception: BinaryName,
    },

    /// The method body is a compiler stub for code that did not compile
    SourceCompileError { class: BinaryName, method: String },
}

#[derive(Debug, PartialEq, Eq)]
pub enum SimulationErrorKind {
    /// An instruction pops more values than the simulated stack holds
    EmptyStack,

    /// Two branches into the same label disagree about the stack shape
    InconsistentBranchTarget {
        label: SynLabel,
        recorded: String,
        found: String,
    },
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::MalformedDescriptor(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedName(msg) => write!(f, "malformed name: {}", msg),
            Error::MalformedDescriptor(err) => write!(f, "malformed descriptor: {}", err),
            Error::UnexpectedEvent { method, event } => {
                write!(f, "unexpected event {} in method {}", event, method)
            }
            Error::StackSimulation {
                method,
                instruction,
                kind,
            } => write!(
                f,
                "stack simulation of {} failed at {}: {}",
                method, instruction, kind
            ),
            Error::StaleIgnoreDirective {
                class,
                method,
                exception,
            } => write!(
                f,
                "method {} of class {} ignores {} but never catches it; remove {} from its FFDCIgnore list",
                method,
                class.java_name(),
                exception.java_name(),
                exception.java_name()
            ),
            Error::SourceCompileError { class, method } => write!(
                f,
                "method {} of class {} contains unresolved compilation problems; fix the source and recompile",
                method,
                class.java_name()
            ),
        }
    }
}

impl fmt::Display for SimulationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationErrorKind::EmptyStack => f.write_str("operand stack underflow"),
            SimulationErrorKind::InconsistentBranchTarget {
                label,
                recorded,
                found,
            } => write!(
                f,
                "label {:?} reached with stack {} after {} was recorded",
                label, found, recorded
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MalformedDescriptor(err) => Some(err),
            _ => None,
        }
    }
}
