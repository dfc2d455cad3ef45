//! Injection of trace and failure capture probes into classes
//!
//! [`Instrumenter`] is the entry point. It runs a class through a [`ClassAdapter`], which decides
//! whether the class is eligible, settles the static field holding the trace handle, and wraps
//! every eligible method in a [`MethodAdapter`]. The method adapter asks a [`ProbeStrategy`] for
//! code at each instrumentation point:
//!
//!   - method entry (in constructors, right after the receiver is initialized, which the
//!     [`ConstructorStackSimulator`] detects)
//!   - every return
//!   - every explicit `athrow`
//!   - the start of every `catch` block (tracked by the [`ExceptionHandlerTracker`])

mod cache;
mod class_adapter;
mod emit;
mod filter;
mod frames;
mod handlers;
mod instrumenter;
mod metadata;
mod method_adapter;
mod probes;
mod settings;
mod simulator;

pub use cache::*;
pub use class_adapter::*;
pub use emit::*;
pub use filter::*;
pub use frames::*;
pub use handlers::*;
pub use instrumenter::*;
pub use metadata::*;
pub use method_adapter::*;
pub use probes::*;
pub use settings::*;
pub use simulator::*;
