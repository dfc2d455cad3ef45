//! In-memory trees of class events
//!
//! [`ClassNode`] records everything a [`ClassVisitor`] is sent and can replay it into another
//! visitor. It is what callers hand to the instrumenter and what they get back.

use super::code::{Instruction, MethodEvent};
use super::visitor::{ClassHeader, ClassVisitor, FieldDecl, MethodDecl, MethodVisitor};
use super::{Annotation, RenderDescriptor, UnqualifiedName};
use crate::Error;

/// Recorded class
#[derive(Clone, Debug, PartialEq)]
pub struct ClassNode {
    pub header: ClassHeader,
    pub annotations: Vec<Annotation>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodNode>,
}

/// Recorded method
#[derive(Clone, Debug, PartialEq)]
pub struct MethodNode {
    pub decl: MethodDecl,
    pub events: Vec<MethodEvent>,
}

impl ClassNode {
    pub fn new(header: ClassHeader) -> ClassNode {
        ClassNode {
            header,
            annotations: vec![],
            fields: vec![],
            methods: vec![],
        }
    }

    /// Replay the recorded events into a visitor
    pub fn accept(&self, visitor: &mut dyn ClassVisitor) -> Result<(), Error> {
        visitor.visit_header(self.header.clone())?;
        for annotation in &self.annotations {
            visitor.visit_annotation(annotation.clone())?;
        }
        for field in &self.fields {
            visitor.visit_field(field.clone())?;
        }
        for method in &self.methods {
            let mut method_visitor = visitor.visit_method(method.decl.clone())?;
            method.accept(&mut *method_visitor)?;
        }
        visitor.visit_end()
    }

    /// Find a method by name and rendered descriptor, such as `(I)I`
    pub fn method(&self, name: &UnqualifiedName, descriptor: &str) -> Option<&MethodNode> {
        self.methods.iter().find(|method| {
            &method.decl.name == name && method.decl.descriptor.render() == descriptor
        })
    }

    pub fn annotation(&self, type_name: &super::BinaryName) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|annotation| &annotation.type_name == type_name)
    }
}

impl MethodNode {
    pub fn new(decl: MethodDecl) -> MethodNode {
        MethodNode {
            decl,
            events: vec![],
        }
    }

    pub fn accept(&self, visitor: &mut dyn MethodVisitor) -> Result<(), Error> {
        for event in &self.events {
            visitor.visit(event.clone())?;
        }
        Ok(())
    }

    /// Straight-line instructions of the body, in order
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.events.iter().filter_map(|event| match event {
            MethodEvent::Instruction(insn) => Some(insn),
            _ => None,
        })
    }
}

impl MethodVisitor for MethodNode {
    fn visit(&mut self, event: MethodEvent) -> Result<(), Error> {
        self.events.push(event);
        Ok(())
    }
}

impl ClassVisitor for ClassNode {
    fn visit_header(&mut self, header: ClassHeader) -> Result<(), Error> {
        self.header = header;
        Ok(())
    }

    fn visit_annotation(&mut self, annotation: Annotation) -> Result<(), Error> {
        self.annotations.push(annotation);
        Ok(())
    }

    fn visit_field(&mut self, field: FieldDecl) -> Result<(), Error> {
        self.fields.push(field);
        Ok(())
    }

    fn visit_method<'s>(
        &'s mut self,
        method: MethodDecl,
    ) -> Result<Box<dyn MethodVisitor + 's>, Error> {
        self.methods.push(MethodNode::new(method));
        let idx = self.methods.len() - 1;
        Ok(Box::new(&mut self.methods[idx]))
    }

    fn visit_end(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
