use super::SynLabel;
use crate::jvm::{BaseType, BinaryName, FieldType, MethodDescriptor, UnqualifiedName};
use crate::util::Width;
use std::ops::Not;

/// Non-branching JVM bytecode instruction
///
/// The representation differs a little from the class file encoding:
///
///   - the "wide" prefix and the `iload_<n>`-style short forms are merged into the instruction
///     they modify
///   - `ldc`, `ldc_w` and `ldc2_w` are a single instruction, the width of the constant decides
///   - `jsr` and `ret` are omitted (they cannot appear in class files that carry stack maps)
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Nop,
    AConstNull,
    IConstM1,
    IConst0,
    IConst1,
    IConst2,
    IConst3,
    IConst4,
    IConst5,
    LConst0,
    LConst1,
    FConst0,
    FConst1,
    FConst2,
    DConst0,
    DConst1,
    BiPush(i8),
    SiPush(i16),
    Ldc(Constant), // covers `ldc`, `ldc_w`, and `ldc2_w`
    ILoad(u16),    // covers `iload`, `iload{0,3}`, and `wide iload`
    LLoad(u16),
    FLoad(u16),
    DLoad(u16),
    ALoad(u16),
    IALoad,
    LALoad,
    FALoad,
    DALoad,
    AALoad,
    BALoad,
    CALoad,
    SALoad,
    IStore(u16), // covers `istore`, `istore{0,3}`, and `wide istore`
    LStore(u16),
    FStore(u16),
    DStore(u16),
    AStore(u16),
    IAStore,
    LAStore,
    FAStore,
    DAStore,
    AAStore,
    BAStore,
    CAStore,
    SAStore,
    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,
    IAdd,
    LAdd,
    FAdd,
    DAdd,
    ISub,
    LSub,
    FSub,
    DSub,
    IMul,
    LMul,
    FMul,
    DMul,
    IDiv,
    LDiv,
    FDiv,
    DDiv,
    IRem,
    LRem,
    FRem,
    DRem,
    INeg,
    LNeg,
    FNeg,
    DNeg,
    ISh(ShiftType), // covers `ishr`, `ishl`, and `iushr`
    LSh(ShiftType), // covers `lshr`, `lshl`, and `lushr`
    IAnd,
    LAnd,
    IOr,
    LOr,
    IXor,
    LXor,
    IInc(u16, i16), // covers `iinc` and `wide iinc`
    I2L,
    I2F,
    I2D,
    L2I,
    L2F,
    L2D,
    F2I,
    F2L,
    F2D,
    D2I,
    D2L,
    D2F,
    I2B,
    I2C,
    I2S,
    LCmp,
    FCmp(CompareMode), // covers `fcmpl` and `fcmpg`
    DCmp(CompareMode), // covers `dcmpl` and `dcmpg`
    GetStatic(FieldRef),
    PutStatic(FieldRef),
    GetField(FieldRef),
    PutField(FieldRef),
    Invoke(InvokeType, MethodRef),
    InvokeDynamic(InvokeDynamicRef),
    New(BinaryName),
    NewArray(BaseType),
    ANewArray(FieldType),
    MultiANewArray(FieldType, u8),
    ArrayLength,
    CheckCast(FieldType),
    InstanceOf(FieldType),
    MonitorEnter,
    MonitorExit,
}

/// Loadable constant, as referenced by `ldc` or passed to a bootstrap method
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    Class(FieldType),
    MethodType(MethodDescriptor),
    MethodHandle(MethodRef),
}

impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

/// Symbolic reference to a field
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: FieldType,
}

/// Symbolic reference to a method
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor,
}

impl MethodRef {
    pub fn new(owner: BinaryName, name: UnqualifiedName, descriptor: MethodDescriptor) -> Self {
        MethodRef {
            owner,
            name,
            descriptor,
        }
    }

    pub fn is_initializer(&self) -> bool {
        self.name == UnqualifiedName::INIT
    }
}

/// Call site for `invokedynamic`
#[derive(Clone, Debug, PartialEq)]
pub struct InvokeDynamicRef {
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor,
    pub bootstrap: MethodRef,
    pub arguments: Vec<Constant>,
}

/// Branching JVM bytecode instruction
///
/// Every instruction that ends a basic block, whether it jumps, switches, returns, or throws.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BranchInstruction {
    If(OrdComparison, SynLabel), // covers `ifeq`, `ifne`, `iflt`, `ifge`, `ifgt`, `ifle`
    IfICmp(OrdComparison, SynLabel), // covers `if_icmpeq`, `if_icmpne`, `if_icmplt`, ... `if_icmple`
    IfACmp(EqComparison, SynLabel), // covers `if_acmpeq`, `if_acmpne`
    IfNull(EqComparison, SynLabel), // covers `ifnull`, `ifnonnull`
    Goto(SynLabel),                 // covers `goto` and `goto_w`
    TableSwitch {
        /// Jump target if the argument is less than `low` or greater than
        /// `low + targets.len()`
        default: SynLabel,

        /// Value associated with the first jump target
        low: i32,

        /// Jump targets
        targets: Vec<SynLabel>,
    },
    LookupSwitch {
        /// Jump target if there is no corresponding key
        default: SynLabel,

        /// Jump targets (sorted so that the keys are ascending)
        targets: Vec<(i32, SynLabel)>,
    },
    IReturn,
    LReturn,
    FReturn,
    DReturn,
    AReturn,
    Return,
    AThrow,
}

impl BranchInstruction {
    /// Labels the instruction may jump to (not counting fall through)
    pub fn jump_targets(&self) -> Vec<SynLabel> {
        match self {
            BranchInstruction::If(_, lbl)
            | BranchInstruction::IfICmp(_, lbl)
            | BranchInstruction::IfACmp(_, lbl)
            | BranchInstruction::IfNull(_, lbl)
            | BranchInstruction::Goto(lbl) => vec![*lbl],
            BranchInstruction::TableSwitch {
                default, targets, ..
            } => {
                let mut all = vec![*default];
                all.extend(targets.iter().copied());
                all
            }
            BranchInstruction::LookupSwitch { default, targets } => {
                let mut all = vec![*default];
                all.extend(targets.iter().map(|(_, lbl)| *lbl));
                all
            }
            BranchInstruction::IReturn
            | BranchInstruction::LReturn
            | BranchInstruction::FReturn
            | BranchInstruction::DReturn
            | BranchInstruction::AReturn
            | BranchInstruction::Return
            | BranchInstruction::AThrow => vec![],
        }
    }

    /// Does the instruction return from the method?
    pub fn is_return(&self) -> bool {
        matches!(
            self,
            BranchInstruction::IReturn
                | BranchInstruction::LReturn
                | BranchInstruction::FReturn
                | BranchInstruction::DReturn
                | BranchInstruction::AReturn
                | BranchInstruction::Return
        )
    }

    /// Stack slots the instruction consumes
    pub fn pop_width(&self) -> usize {
        match self {
            BranchInstruction::Goto(_) | BranchInstruction::Return => 0,
            BranchInstruction::If(_, _)
            | BranchInstruction::IfNull(_, _)
            | BranchInstruction::TableSwitch { .. }
            | BranchInstruction::LookupSwitch { .. }
            | BranchInstruction::IReturn
            | BranchInstruction::FReturn
            | BranchInstruction::AReturn
            | BranchInstruction::AThrow => 1,
            BranchInstruction::IfICmp(_, _)
            | BranchInstruction::IfACmp(_, _)
            | BranchInstruction::LReturn
            | BranchInstruction::DReturn => 2,
        }
    }
}

/// Types of shift operations
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ShiftType {
    Left,
    LogicalRight,
    ArithmeticRight,
}

/// Comparison modes for floating point
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum CompareMode {
    /// -1 on NaN
    L,

    /// 1 on NaN
    G,
}

/// Binary comparison operators available for `int` branches
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OrdComparison {
    EQ,
    GE,
    GT,
    LE,
    LT,
    NE,
}

impl Not for OrdComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            OrdComparison::EQ => OrdComparison::NE,
            OrdComparison::GE => OrdComparison::LT,
            OrdComparison::GT => OrdComparison::LE,
            OrdComparison::LE => OrdComparison::GT,
            OrdComparison::LT => OrdComparison::GE,
            OrdComparison::NE => OrdComparison::EQ,
        }
    }
}

/// Equality/inequality comparison operators
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum EqComparison {
    EQ,
    NE,
}

impl Not for EqComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            EqComparison::EQ => EqComparison::NE,
            EqComparison::NE => EqComparison::EQ,
        }
    }
}

/// Type of method to invoke
///
/// Note: `InvokeDynamic` is kept separate because it does not reference a `MethodRef`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,
    Interface,
}

impl InvokeType {
    /// Does the invocation consume a receiver from the stack?
    pub fn has_receiver(&self) -> bool {
        !matches!(self, InvokeType::Static)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::SynLabel;

    #[test]
    fn switch_targets() {
        let switch = BranchInstruction::LookupSwitch {
            default: SynLabel::new(3),
            targets: vec![(1, SynLabel::new(1)), (7, SynLabel::new(2))],
        };
        assert_eq!(
            switch.jump_targets(),
            vec![SynLabel::new(3), SynLabel::new(1), SynLabel::new(2)]
        );
        assert!(BranchInstruction::AThrow.jump_targets().is_empty());
        assert!(!BranchInstruction::AThrow.is_return());
        assert!(BranchInstruction::DReturn.is_return());
        assert_eq!(BranchInstruction::DReturn.pop_width(), 2);
    }

    #[test]
    fn inverted_comparisons() {
        assert_eq!(!OrdComparison::LT, OrdComparison::GE);
        assert_eq!(!EqComparison::NE, EqComparison::EQ);
    }
}
