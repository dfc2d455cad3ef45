//! Push-based visitation of classes
//!
//! A pipeline stage implements [`ClassVisitor`] and holds the next stage as a boxed visitor,
//! forwarding every event after doing its own accounting. Method bodies are delegated the same
//! way: [`ClassVisitor::visit_method`] returns the [`MethodVisitor`] that will receive the events
//! of that one method.

use super::code::MethodEvent;
use super::{
    Annotation, BinaryName, ClassAccessFlags, FieldAccessFlags, FieldType, MethodAccessFlags,
    MethodDescriptor, UnqualifiedName, Version,
};
use crate::jvm::descriptors::render_method;
use crate::Error;

/// Structural header of a class
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassHeader {
    pub version: Version,
    pub access_flags: ClassAccessFlags,
    pub name: BinaryName,

    /// `None` only for `java/lang/Object`
    pub super_name: Option<BinaryName>,
    pub interfaces: Vec<BinaryName>,
}

/// Field declaration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDecl {
    pub access_flags: FieldAccessFlags,
    pub name: UnqualifiedName,
    pub descriptor: FieldType,
}

/// Method declaration (everything about a method except its body)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDecl {
    pub access_flags: MethodAccessFlags,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor,
    pub exceptions: Vec<BinaryName>,
}

impl MethodDecl {
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == UnqualifiedName::INIT
    }

    pub fn is_static_initializer(&self) -> bool {
        self.name == UnqualifiedName::CLINIT
    }

    /// First local variable slot past `this` and the parameters
    pub fn first_local_slot(&self) -> u16 {
        self.descriptor.parameter_length(!self.is_static()) as u16
    }

    /// Name and descriptor, eg. `hashCode()I`
    pub fn signature(&self) -> String {
        render_method(&self.name, &self.descriptor)
    }
}

/// Consumer of the events of one method
pub trait MethodVisitor {
    fn visit(&mut self, event: MethodEvent) -> Result<(), Error>;
}

/// Consumer of the events of one class
///
/// Events arrive as: header, class annotations, fields, methods, end.
pub trait ClassVisitor {
    fn visit_header(&mut self, header: ClassHeader) -> Result<(), Error>;

    fn visit_annotation(&mut self, annotation: Annotation) -> Result<(), Error>;

    fn visit_field(&mut self, field: FieldDecl) -> Result<(), Error>;

    /// Start a method, returning the visitor that receives its events
    fn visit_method<'s>(
        &'s mut self,
        method: MethodDecl,
    ) -> Result<Box<dyn MethodVisitor + 's>, Error>;

    fn visit_end(&mut self) -> Result<(), Error>;
}

impl<V: MethodVisitor + ?Sized> MethodVisitor for &mut V {
    fn visit(&mut self, event: MethodEvent) -> Result<(), Error> {
        (**self).visit(event)
    }
}

impl<V: MethodVisitor + ?Sized> MethodVisitor for Box<V> {
    fn visit(&mut self, event: MethodEvent) -> Result<(), Error> {
        (**self).visit(event)
    }
}

impl<V: ClassVisitor + ?Sized> ClassVisitor for &mut V {
    fn visit_header(&mut self, header: ClassHeader) -> Result<(), Error> {
        (**self).visit_header(header)
    }

    fn visit_annotation(&mut self, annotation: Annotation) -> Result<(), Error> {
        (**self).visit_annotation(annotation)
    }

    fn visit_field(&mut self, field: FieldDecl) -> Result<(), Error> {
        (**self).visit_field(field)
    }

    fn visit_method<'s>(
        &'s mut self,
        method: MethodDecl,
    ) -> Result<Box<dyn MethodVisitor + 's>, Error> {
        (**self).visit_method(method)
    }

    fn visit_end(&mut self) -> Result<(), Error> {
        (**self).visit_end()
    }
}
