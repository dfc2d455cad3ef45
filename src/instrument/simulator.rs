//! Abstract execution of constructor prefixes
//!
//! Until the superclass initializer has run on the receiver, a constructor must not touch
//! `this`. The only reliable way to see that moment is to track which operand stack slots hold
//! the receiver: the `invokespecial <init>` that consumes a receiver loaded from local 0 is the
//! one that initializes the object under construction. Other `<init>` calls (for instance the
//! one in `new C(null)`) initialize unrelated objects.
//!
//! Every stack entry here is one slot, so `long` and `double` values take two entries. This keeps
//! the `dup`/`swap` family exact without caring about value categories.

use crate::errors::SimulationErrorKind;
use crate::jvm::code::{BranchInstruction, Instruction, InvokeType, SynLabel};
use crate::jvm::BinaryName;
use crate::util::Width;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// What we know about one operand stack slot
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum AbstractValue {
    /// The receiver under construction
    This,

    /// Anything else
    Other,
}

/// Operand stack tracker for one constructor
#[derive(Debug)]
pub struct ConstructorStackSimulator {
    class_name: BinaryName,
    super_name: Option<BinaryName>,
    stack: Vec<AbstractValue>,

    /// Stack at the first jump seen to each label
    branch_targets: HashMap<SynLabel, Vec<AbstractValue>>,
    super_initialized: bool,
}

impl ConstructorStackSimulator {
    pub fn new(class_name: BinaryName, super_name: Option<BinaryName>) -> Self {
        ConstructorStackSimulator {
            class_name,
            super_name,
            stack: vec![],
            branch_targets: HashMap::new(),
            super_initialized: false,
        }
    }

    /// Has the receiver been initialized by a superclass (or sibling) constructor yet?
    ///
    /// Once this is true, it stays true.
    pub fn has_super_been_initialized(&self) -> bool {
        self.super_initialized
    }

    pub fn stack(&self) -> &[AbstractValue] {
        &self.stack
    }

    /// Account for a label being placed
    ///
    /// If some jump to the label was already seen, the stack at that jump is the stack here.
    /// This matters after `goto`, where the stack left over from the preceding code is stale.
    pub fn visit_label(&mut self, label: SynLabel) {
        if let Some(snapshot) = self.branch_targets.get(&label) {
            self.stack.clone_from(snapshot);
        }
    }

    /// Account for an exception handler (the handler starts with just the exception on the stack)
    pub fn visit_try_catch(&mut self, handler: SynLabel) {
        self.branch_targets
            .entry(handler)
            .or_insert_with(|| vec![AbstractValue::Other]);
    }

    /// Account for a straight-line instruction
    ///
    /// Returns `true` if this instruction is the one that initialized the receiver.
    pub fn visit_instruction(&mut self, insn: &Instruction) -> Result<bool, SimulationErrorKind> {
        use AbstractValue::*;
        use Instruction::*;

        match insn {
            Nop | IInc(_, _) => (),

            AConstNull | IConstM1 | IConst0 | IConst1 | IConst2 | IConst3 | IConst4 | IConst5
            | FConst0 | FConst1 | FConst2 | BiPush(_) | SiPush(_) => self.push_other(1),
            LConst0 | LConst1 | DConst0 | DConst1 => self.push_other(2),
            Ldc(constant) => self.push_other(constant.width()),

            ALoad(0) => self.stack.push(This),
            ILoad(_) | FLoad(_) | ALoad(_) => self.push_other(1),
            LLoad(_) | DLoad(_) => self.push_other(2),

            IALoad | FALoad | AALoad | BALoad | CALoad | SALoad => self.apply(2, 1)?,
            LALoad | DALoad => self.apply(2, 2)?,

            IStore(_) | FStore(_) | AStore(_) => self.pop(1)?,
            LStore(_) | DStore(_) => self.pop(2)?,

            IAStore | FAStore | AAStore | BAStore | CAStore | SAStore => self.pop(3)?,
            LAStore | DAStore => self.pop(4)?,

            Pop => self.pop(1)?,
            Pop2 => self.pop(2)?,
            Dup => self.dup(1, 0)?,
            DupX1 => self.dup(1, 1)?,
            DupX2 => self.dup(1, 2)?,
            Dup2 => self.dup(2, 0)?,
            Dup2X1 => self.dup(2, 1)?,
            Dup2X2 => self.dup(2, 2)?,
            Swap => {
                let arg1 = self.pop_one()?;
                let arg2 = self.pop_one()?;
                self.stack.push(arg1);
                self.stack.push(arg2);
            }

            IAdd | ISub | IMul | IDiv | IRem | IAnd | IOr | IXor | ISh(_) | FAdd | FSub
            | FMul | FDiv | FRem | FCmp(_) => self.apply(2, 1)?,
            LAdd | LSub | LMul | LDiv | LRem | LAnd | LOr | LXor | DAdd | DSub | DMul | DDiv
            | DRem => self.apply(4, 2)?,
            LSh(_) => self.apply(3, 2)?,
            LCmp | DCmp(_) => self.apply(4, 1)?,

            INeg | FNeg | I2F | F2I | I2B | I2C | I2S => self.apply(1, 1)?,
            LNeg | DNeg | L2D | D2L => self.apply(2, 2)?,
            I2L | I2D | F2L | F2D => self.apply(1, 2)?,
            L2I | L2F | D2I | D2F => self.apply(2, 1)?,

            GetStatic(field) => self.push_other(field.descriptor.width()),
            PutStatic(field) => self.pop(field.descriptor.width())?,
            GetField(field) => self.apply(1, field.descriptor.width())?,
            PutField(field) => self.pop(field.descriptor.width() + 1)?,

            Invoke(invoke_type, method) => {
                self.pop(method.descriptor.parameter_length(false))?;
                let mut initialized_this = false;
                if invoke_type.has_receiver() {
                    let receiver = self.pop_one()?;
                    if *invoke_type == InvokeType::Special
                        && method.is_initializer()
                        && receiver == This
                    {
                        initialized_this = self.initializes_this(&method.owner);
                    }
                }
                self.push_other(method.descriptor.return_width());
                if initialized_this {
                    self.super_initialized = true;
                    return Ok(true);
                }
            }
            InvokeDynamic(call_site) => {
                self.pop(call_site.descriptor.parameter_length(false))?;
                self.push_other(call_site.descriptor.return_width());
            }

            New(_) => self.push_other(1),
            NewArray(_) | ANewArray(_) | ArrayLength | InstanceOf(_) => self.apply(1, 1)?,
            MultiANewArray(_, dimensions) => self.apply(*dimensions as usize, 1)?,

            // A cast does not change which object is on the stack
            CheckCast(_) => {
                let value = self.pop_one()?;
                self.stack.push(value);
            }

            MonitorEnter | MonitorExit => self.pop(1)?,
        }

        Ok(false)
    }

    /// Account for a branching instruction
    ///
    /// The stack left after the instruction's own operands are popped is recorded for every
    /// label it may jump to.
    pub fn visit_branch(&mut self, insn: &BranchInstruction) -> Result<(), SimulationErrorKind> {
        self.pop(insn.pop_width())?;
        for target in insn.jump_targets() {
            self.record_branch_target(target)?;
        }
        Ok(())
    }

    /// Remember the stack at a jump to `label`
    ///
    /// The first jump wins. Later jumps must agree with it: verified code always has the same
    /// stack height at a label, and the receiver can only be in the same slots on every path.
    fn record_branch_target(&mut self, label: SynLabel) -> Result<(), SimulationErrorKind> {
        match self.branch_targets.entry(label) {
            Entry::Vacant(vacant) => {
                vacant.insert(self.stack.clone());
                Ok(())
            }
            Entry::Occupied(occupied) if occupied.get() == &self.stack => Ok(()),
            Entry::Occupied(occupied) => Err(SimulationErrorKind::InconsistentBranchTarget {
                label,
                recorded: format!("{:?}", occupied.get()),
                found: format!("{:?}", self.stack),
            }),
        }
    }

    fn initializes_this(&self, owner: &BinaryName) -> bool {
        if owner == &self.class_name || Some(owner) == self.super_name.as_ref() {
            log::trace!("{:?} receiver initialized by {:?}.<init>", self.class_name, owner);
            true
        } else {
            log::warn!(
                "{:?} receiver passed to {:?}.<init>, which is neither the class nor its superclass",
                self.class_name,
                owner
            );
            false
        }
    }

    fn push_other(&mut self, slots: usize) {
        for _ in 0..slots {
            self.stack.push(AbstractValue::Other);
        }
    }

    fn pop_one(&mut self) -> Result<AbstractValue, SimulationErrorKind> {
        self.stack.pop().ok_or(SimulationErrorKind::EmptyStack)
    }

    fn pop(&mut self, slots: usize) -> Result<(), SimulationErrorKind> {
        let len = self.stack.len();
        if len < slots {
            return Err(SimulationErrorKind::EmptyStack);
        }
        self.stack.truncate(len - slots);
        Ok(())
    }

    /// Pop some slots and push a result of unknown identity
    fn apply(&mut self, popped: usize, pushed: usize) -> Result<(), SimulationErrorKind> {
        self.pop(popped)?;
        self.push_other(pushed);
        Ok(())
    }

    /// Copy the top `copied` slots and insert the copies below the next `skipped` slots
    ///
    /// `dup_x2` is `dup(1, 2)`, `dup2_x1` is `dup(2, 1)`, etc.
    fn dup(&mut self, copied: usize, skipped: usize) -> Result<(), SimulationErrorKind> {
        let len = self.stack.len();
        if len < copied + skipped {
            return Err(SimulationErrorKind::EmptyStack);
        }
        let copies: Vec<AbstractValue> = self.stack[len - copied..].to_vec();
        let at = len - copied - skipped;
        self.stack.splice(at..at, copies);
        Ok(())
    }
}
