//! Bytecode instrumentation for trace and first failure data capture
//!
//! Classes are rewritten at the level of their instruction streams so that every method reports
//! entry, exit, thrown exceptions and caught exceptions to a logging or trace API, without access
//! to the source. See [`instrument::Instrumenter`] for the entry point and [`jvm`] for the model
//! of classes being rewritten.

pub mod instrument;
pub mod jvm;

mod errors;
mod util;

pub use errors::{Error, SimulationErrorKind};
