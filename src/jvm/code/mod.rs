//! Method bodies as event streams
//!
//! A method body reaches the instrumenter as an ordered sequence of [`MethodEvent`]s. We split up
//! the [list of bytecode instructions][0] into two groups:
//!
//!   - [`Instruction`] for straight-line instructions
//!   - [`BranchInstruction`] for instructions that may jump, return, or throw
//!
//! Jump targets are opaque [`SynLabel`]s, placed into the stream by [`MethodEvent::Label`].
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se18/html/jvms-6.html#jvms-6.5

mod events;
mod frame;
mod instructions;
mod label;

pub use events::*;
pub use frame::*;
pub use instructions::*;
pub use label::*;
