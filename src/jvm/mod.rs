//! Model of JVM classes as the instrumenter sees them
//!
//! Classes are not read from or written to class files here. Instead, a class is a stream of
//! events pushed through a chain of [`ClassVisitor`]s: a header, annotations, fields, and then
//! for each method a [`MethodVisitor`] receiving [`code::MethodEvent`]s. [`ClassNode`] records such
//! a stream so that it can be inspected or replayed.
//!
//! ### Simple example
//!
//! Consider the following constructor:
//!
//! ```java,ignore,no_run
//! public Point(int x) {
//!     super();
//!     this.x = x;
//! }
//! ```
//!
//! Its body as events:
//!
//! ```
//! use ras_instrument::jvm::*;
//! use ras_instrument::jvm::code::{
//!     BranchInstruction, FieldRef, Instruction::*, InvokeType, MethodEvent, MethodRef,
//! };
//!
//! # fn point() -> Result<MethodNode, String> {
//! let point = BinaryName::from_string(String::from("com/acme/Point"))?;
//! let mut method = MethodNode::new(MethodDecl {
//!     access_flags: MethodAccessFlags::PUBLIC,
//!     name: UnqualifiedName::INIT,
//!     descriptor: MethodDescriptor {
//!         parameters: vec![FieldType::int()],
//!         return_type: None,
//!     },
//!     exceptions: vec![],
//! });
//! let object_init = MethodRef::new(
//!     BinaryName::OBJECT,
//!     UnqualifiedName::INIT,
//!     MethodDescriptor { parameters: vec![], return_type: None },
//! );
//! let field_x = FieldRef {
//!     owner: point,
//!     name: UnqualifiedName::from_string(String::from("x"))?,
//!     descriptor: FieldType::int(),
//! };
//! method.events = vec![
//!     MethodEvent::Code,
//!     MethodEvent::Instruction(ALoad(0)),
//!     MethodEvent::Instruction(Invoke(InvokeType::Special, object_init)),
//!     MethodEvent::Instruction(ALoad(0)),
//!     MethodEvent::Instruction(ILoad(1)),
//!     MethodEvent::Instruction(PutField(field_x)),
//!     MethodEvent::Branch(BranchInstruction::Return),
//!     MethodEvent::Maxs { max_stack: 2, max_locals: 2 },
//!     MethodEvent::End,
//! ];
//! # Ok(method)
//! # }
//! # point().unwrap();
//! ```

mod access_flags;
mod annotation;
pub mod code;
mod descriptors;
mod names;
mod node;
mod version;
mod visitor;

pub use access_flags::*;
pub use annotation::*;
pub use descriptors::*;
pub use names::*;
pub use node::*;
pub use version::*;
pub use visitor::*;
