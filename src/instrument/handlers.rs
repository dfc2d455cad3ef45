//! Tracking of exception handler entry points
//!
//! A handler label is declared by a try/catch block and reached later in the body. Right after
//! the label the caught exception is on top of the stack. Most handlers immediately store it into
//! a local, in which case the probe should run after that store and read the local instead. So
//! reaching a handler label only makes it *pending*, and the next instruction decides where the
//! exception lives.

use crate::jvm::code::{Instruction, SynLabel, TryCatchBlock};
use crate::jvm::BinaryName;
use std::collections::{HashMap, HashSet};

/// Static type given to the exception of a multi-catch handler
static THROWABLE: BinaryName = BinaryName::THROWABLE;

/// Where a caught exception can be found when the handler-entry probe runs
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum HandlerSlot {
    /// Top of the operand stack
    OnStack,

    /// Local variable slot
    Local(u16),
}

impl HandlerSlot {
    /// Slot index, with `-1` standing for the top of the stack
    pub fn index(&self) -> i32 {
        match self {
            HandlerSlot::OnStack => -1,
            HandlerSlot::Local(slot) => *slot as i32,
        }
    }
}

/// A handler that was just entered
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct HandlerEntry {
    pub label: SynLabel,

    /// Types caught (several for multi-catch clauses), in declaration order
    pub exception_types: Vec<BinaryName>,
    pub slot: HandlerSlot,
}

impl HandlerEntry {
    /// Most specific static type of the caught exception, when there is one
    pub fn exception_type(&self) -> &BinaryName {
        match self.exception_types.as_slice() {
            [single] => single,
            _ => &THROWABLE,
        }
    }
}

/// Per-method handler bookkeeping
#[derive(Debug, Default)]
pub struct ExceptionHandlerTracker {
    /// Catch types declared for each handler label
    handlers: HashMap<SynLabel, Vec<BinaryName>>,

    /// Handler whose label was reached but whose first instruction wasn't seen yet
    pending: Option<(SynLabel, Vec<BinaryName>)>,

    /// Handlers already reported
    entered: HashSet<SynLabel>,

    /// Every exception type whose handler was entered
    observed: HashSet<BinaryName>,
}

impl ExceptionHandlerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a try/catch block
    ///
    /// Blocks without a catch type implement `finally` and are not tracked.
    pub fn declare(&mut self, block: &TryCatchBlock) {
        if let Some(catch_type) = &block.catch_type {
            let types = self.handlers.entry(block.handler).or_default();
            if !types.contains(catch_type) {
                types.push(catch_type.clone());
            }
        }
    }

    pub fn is_handler(&self, label: SynLabel) -> bool {
        self.handlers.contains_key(&label)
    }

    /// Account for a label being placed
    pub fn visit_label(&mut self, label: SynLabel) {
        if self.entered.contains(&label) {
            return;
        }
        if let Some(types) = self.handlers.get(&label) {
            match &mut self.pending {
                // Two handler labels at the same location
                Some((_, pending_types)) => {
                    for catch_type in types {
                        if !pending_types.contains(catch_type) {
                            pending_types.push(catch_type.clone());
                        }
                    }
                    self.entered.insert(label);
                }
                None => self.pending = Some((label, types.clone())),
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Where the exception will be once `next` (the first instruction of the handler) has run
    ///
    /// `Some(slot)` means the probe belongs after `next`; `None` means before.
    pub fn slot_after(next: &Instruction) -> Option<HandlerSlot> {
        match next {
            Instruction::AStore(slot) => Some(HandlerSlot::Local(*slot)),
            _ => None,
        }
    }

    /// Resolve the pending handler, if there is one
    ///
    /// Every handler is resolved at most once.
    pub fn take_pending(&mut self, slot: HandlerSlot) -> Option<HandlerEntry> {
        let (label, exception_types) = self.pending.take()?;
        self.entered.insert(label);
        self.observed.extend(exception_types.iter().cloned());
        Some(HandlerEntry {
            label,
            exception_types,
            slot,
        })
    }

    /// Was a handler for exactly this type entered?
    pub fn observed(&self, exception_type: &BinaryName) -> bool {
        self.observed.contains(exception_type)
    }
}
