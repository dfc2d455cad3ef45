use crate::jvm::code::{
    BranchInstruction, Constant, FieldRef, Instruction, InvokeType, MethodEvent, MethodRef,
    SynLabel,
};
use crate::jvm::{
    BaseType, BinaryName, FieldType, MethodDecl, MethodDescriptor, MethodVisitor,
    ParseDescriptor, UnqualifiedName,
};
use crate::util::Width;
use crate::Error;

/// Text traced in place of a sensitive value
pub fn redaction_placeholder(field_type: &FieldType) -> String {
    format!("<sensitive {}>", field_type.java_name())
}

/// Helpers for emitting probe code into a method visitor
pub trait CodeEmitterExts {
    fn push_instruction(&mut self, insn: Instruction) -> Result<(), Error>;

    fn push_branch_instruction(&mut self, insn: BranchInstruction) -> Result<(), Error>;

    fn place_label(&mut self, label: SynLabel) -> Result<(), Error>;

    /// Push an integer constant onto the stack
    fn const_int(&mut self, integer: i32) -> Result<(), Error>;

    /// Push a constant string to the stack
    fn const_string(&mut self, string: impl Into<String>) -> Result<(), Error>;

    /// Push a value of type `java/lang/Class` onto the stack
    fn const_class(&mut self, ty: FieldType) -> Result<(), Error>;

    /// Push `null`
    fn const_null(&mut self) -> Result<(), Error>;

    /// Get a local at a particular offset
    fn get_local(&mut self, offset: u16, field_type: &FieldType) -> Result<(), Error>;

    /// Duplicate the value on top of the stack, accounting for type widths
    fn dup_value(&mut self, field_type: &FieldType) -> Result<(), Error>;

    /// Turn a primitive on top of the stack into its boxed object (references are left alone)
    fn box_value(&mut self, field_type: &FieldType) -> Result<(), Error>;

    fn swap(&mut self) -> Result<(), Error>;

    fn get_static(&mut self, field: FieldRef) -> Result<(), Error>;

    fn put_static(&mut self, field: FieldRef) -> Result<(), Error>;

    /// Invoke a method given by name and descriptor string
    fn invoke(
        &mut self,
        invoke_type: InvokeType,
        owner: BinaryName,
        name: UnqualifiedName,
        descriptor: &str,
    ) -> Result<(), Error>;

    /// Build an `Object[]` holding every argument of the method
    ///
    /// Primitive arguments are boxed. Arguments for which `sensitive` answers `true` are
    /// replaced by [`redaction_placeholder`]. Needs 5 slots of stack on top of what is there.
    fn arguments_array(
        &mut self,
        method: &MethodDecl,
        sensitive: impl Fn(usize) -> bool,
    ) -> Result<(), Error>;
}

impl<V: MethodVisitor + ?Sized> CodeEmitterExts for V {
    fn push_instruction(&mut self, insn: Instruction) -> Result<(), Error> {
        self.visit(MethodEvent::Instruction(insn))
    }

    fn push_branch_instruction(&mut self, insn: BranchInstruction) -> Result<(), Error> {
        self.visit(MethodEvent::Branch(insn))
    }

    fn place_label(&mut self, label: SynLabel) -> Result<(), Error> {
        self.visit(MethodEvent::Label(label))
    }

    fn const_int(&mut self, integer: i32) -> Result<(), Error> {
        use Instruction::*;
        let insn = match integer {
            -1 => IConstM1,
            0 => IConst0,
            1 => IConst1,
            2 => IConst2,
            3 => IConst3,
            4 => IConst4,
            5 => IConst5,
            _ => {
                if let Ok(b) = i8::try_from(integer) {
                    BiPush(b)
                } else if let Ok(s) = i16::try_from(integer) {
                    SiPush(s)
                } else {
                    Ldc(Constant::Integer(integer))
                }
            }
        };
        self.push_instruction(insn)
    }

    fn const_string(&mut self, string: impl Into<String>) -> Result<(), Error> {
        self.push_instruction(Instruction::Ldc(Constant::String(string.into())))
    }

    fn const_class(&mut self, ty: FieldType) -> Result<(), Error> {
        self.push_instruction(Instruction::Ldc(Constant::Class(ty)))
    }

    fn const_null(&mut self) -> Result<(), Error> {
        self.push_instruction(Instruction::AConstNull)
    }

    fn get_local(&mut self, offset: u16, field_type: &FieldType) -> Result<(), Error> {
        let insn = match field_type {
            FieldType::Base(BaseType::Long) => Instruction::LLoad(offset),
            FieldType::Base(BaseType::Double) => Instruction::DLoad(offset),
            FieldType::Base(BaseType::Float) => Instruction::FLoad(offset),
            FieldType::Base(_) => Instruction::ILoad(offset),
            FieldType::Object(_) | FieldType::Array(_) => Instruction::ALoad(offset),
        };
        self.push_instruction(insn)
    }

    fn dup_value(&mut self, field_type: &FieldType) -> Result<(), Error> {
        match field_type.width() {
            1 => self.push_instruction(Instruction::Dup),
            _ => self.push_instruction(Instruction::Dup2),
        }
    }

    fn box_value(&mut self, field_type: &FieldType) -> Result<(), Error> {
        if let FieldType::Base(base_type) = field_type {
            let value_of = MethodRef::new(
                base_type.boxed_class(),
                UnqualifiedName::VALUEOF,
                base_type.value_of_descriptor(),
            );
            self.push_instruction(Instruction::Invoke(InvokeType::Static, value_of))?;
        }
        Ok(())
    }

    fn swap(&mut self) -> Result<(), Error> {
        self.push_instruction(Instruction::Swap)
    }

    fn get_static(&mut self, field: FieldRef) -> Result<(), Error> {
        self.push_instruction(Instruction::GetStatic(field))
    }

    fn put_static(&mut self, field: FieldRef) -> Result<(), Error> {
        self.push_instruction(Instruction::PutStatic(field))
    }

    fn invoke(
        &mut self,
        invoke_type: InvokeType,
        owner: BinaryName,
        name: UnqualifiedName,
        descriptor: &str,
    ) -> Result<(), Error> {
        let descriptor = MethodDescriptor::parse(descriptor)?;
        let method = MethodRef::new(owner, name, descriptor);
        self.push_instruction(Instruction::Invoke(invoke_type, method))
    }

    fn arguments_array(
        &mut self,
        method: &MethodDecl,
        sensitive: impl Fn(usize) -> bool,
    ) -> Result<(), Error> {
        let parameters = &method.descriptor.parameters;
        let slots = method.descriptor.parameter_slots(!method.is_static());

        self.const_int(parameters.len() as i32)?;
        self.push_instruction(Instruction::ANewArray(FieldType::object(BinaryName::OBJECT)))?;
        for (idx, (parameter, slot)) in parameters.iter().zip(slots).enumerate() {
            self.push_instruction(Instruction::Dup)?;
            self.const_int(idx as i32)?;
            if sensitive(idx) {
                self.const_string(redaction_placeholder(parameter))?;
            } else {
                self.get_local(slot, parameter)?;
                self.box_value(parameter)?;
            }
            self.push_instruction(Instruction::AAStore)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::{MethodAccessFlags, MethodNode, Name};

    #[test]
    fn int_constants() {
        let mut code = MethodNode::new(MethodDecl {
            access_flags: MethodAccessFlags::STATIC,
            name: UnqualifiedName::CLINIT,
            descriptor: MethodDescriptor::parse("()V").unwrap(),
            exceptions: vec![],
        });
        for value in [-1, 5, 6, -129, 40000] {
            code.const_int(value).unwrap();
        }
        let insns: Vec<&Instruction> = code.instructions().collect();
        assert_eq!(
            insns,
            vec![
                &Instruction::IConstM1,
                &Instruction::IConst5,
                &Instruction::BiPush(6),
                &Instruction::SiPush(-129),
                &Instruction::Ldc(Constant::Integer(40000)),
            ]
        );
    }

    #[test]
    fn sensitive_argument_is_redacted() {
        let decl = MethodDecl {
            access_flags: MethodAccessFlags::PUBLIC,
            name: UnqualifiedName::from_string(String::from("login")).unwrap(),
            descriptor: MethodDescriptor::parse("(Ljava/lang/String;J)V").unwrap(),
            exceptions: vec![],
        };
        let mut code = MethodNode::new(decl.clone());
        code.arguments_array(&decl, |idx| idx == 0).unwrap();

        let insns: Vec<Instruction> = code.instructions().cloned().collect();
        assert_eq!(
            insns,
            vec![
                Instruction::IConst2,
                Instruction::ANewArray(FieldType::object(BinaryName::OBJECT)),
                Instruction::Dup,
                Instruction::IConst0,
                Instruction::Ldc(Constant::String(String::from(
                    "<sensitive java.lang.String>"
                ))),
                Instruction::AAStore,
                Instruction::Dup,
                Instruction::IConst1,
                Instruction::LLoad(2),
                Instruction::Invoke(
                    InvokeType::Static,
                    MethodRef::new(
                        BinaryName::LONG,
                        UnqualifiedName::VALUEOF,
                        MethodDescriptor::parse("(J)Ljava/lang/Long;").unwrap(),
                    )
                ),
                Instruction::AAStore,
            ]
        );
    }
}
