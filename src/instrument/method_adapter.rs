use super::frames::FrameTracker;
use super::handlers::{ExceptionHandlerTracker, HandlerEntry, HandlerSlot};
use super::metadata::MethodInfo;
use super::probes::{ClassContext, ProbeContext, ProbeStrategy};
use super::simulator::ConstructorStackSimulator;
use crate::errors::SimulationErrorKind;
use crate::jvm::code::{
    BranchInstruction, Constant, FrameValue, Instruction, LabelGenerator, LocalVariable,
    MethodEvent, SynLabel, SynLabelGenerator, TryCatchBlock,
};
use crate::jvm::{BinaryName, FieldType, MethodDecl, MethodVisitor};
use crate::Error;
use std::collections::HashSet;

/// Text the Eclipse compiler leaves in stubs for methods that failed to compile
const COMPILE_ERROR_MARKER: &str = "Unresolved compilation problem";

/// Progress through the method's events
///
/// The entry probe runs synchronously when the body starts, or right after the receiver is
/// initialized in constructors, so there is no separate state for an entry that is due but not
/// yet emitted: the adapter moves straight to `InBody` while emitting it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    /// Annotations only, body not started
    Declared,

    /// Constructor body before the receiver was initialized
    AwaitingEntry,

    /// Entry probe has run
    InBody,

    /// `End` was seen
    Done,
}

/// Instrumentation point, as handed to the probe strategy
enum ProbePoint<'e> {
    InitializeHolder,
    Entry,
    Return(&'e BranchInstruction),
    Throw,
    /// With the static type of the caught exception
    Handler(&'e HandlerEntry, FrameValue),
}

/// Rewrites the events of one method, injecting probes on the way to the next visitor
pub struct MethodAdapter<'a> {
    next: Box<dyn MethodVisitor + 'a>,
    probe: &'a dyn ProbeStrategy,

    /// Set once any probe emits code, shared by every method of the class
    modified: &'a mut bool,
    class: &'a ClassContext,
    decl: MethodDecl,
    info: MethodInfo,

    /// Method metadata was supplied up front, so annotations need not be observed
    info_from_metadata: bool,
    state: State,

    /// Present for constructors until the receiver is initialized
    simulator: Option<ConstructorStackSimulator>,

    /// Present when stack map frames are written after guarded probes
    frames: Option<FrameTracker>,
    handlers: ExceptionHandlerTracker,
    labels: SynLabelGenerator,

    /// Label placed ahead of everything in the body, injected code included
    method_start: SynLabel,

    /// First label of the original body
    first_label: Option<SynLabel>,
    placed_labels: HashSet<SynLabel>,
    line: Option<u16>,

    /// Largest extra stack depth any probe needs
    extra_stack: u16,
    saw_compile_error: bool,

    /// Store a fresh handle into the trace holder at the start of the body
    initialize_holder: bool,
}

impl<'a> MethodAdapter<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        next: Box<dyn MethodVisitor + 'a>,
        probe: &'a dyn ProbeStrategy,
        modified: &'a mut bool,
        class: &'a ClassContext,
        decl: MethodDecl,
        info: MethodInfo,
        info_from_metadata: bool,
        initialize_holder: bool,
    ) -> MethodAdapter<'a> {
        let mut labels = SynLabelGenerator::default();
        let method_start = labels.fresh_label();
        let frames = if class.emit_frames {
            Some(FrameTracker::new(&class.name, &decl))
        } else {
            None
        };
        MethodAdapter {
            next,
            probe,
            modified,
            class,
            decl,
            info,
            info_from_metadata,
            state: State::Declared,
            simulator: None,
            frames,
            handlers: ExceptionHandlerTracker::new(),
            labels,
            method_start,
            first_label: None,
            placed_labels: HashSet::new(),
            line: None,
            extra_stack: 0,
            saw_compile_error: false,
            initialize_holder,
        }
    }

    fn unexpected(&self, event: &MethodEvent) -> Error {
        Error::UnexpectedEvent {
            method: format!("{}.{}", self.class.name.java_name(), self.decl.signature()),
            event: format!("{:?} in state {:?}", event, self.state),
        }
    }

    fn simulation_error(&self, instruction: String, kind: SimulationErrorKind) -> Error {
        Error::StackSimulation {
            method: format!("{}.{}", self.class.name.java_name(), self.decl.signature()),
            instruction,
            kind,
        }
    }

    /// Start of the body: place the entry label and, outside of constructors, fire entry
    fn start_body(&mut self) -> Result<(), Error> {
        self.next.visit(MethodEvent::Code)?;
        self.next.visit(MethodEvent::Label(self.method_start))?;

        if self.initialize_holder {
            self.fire(ProbePoint::InitializeHolder)?;
        }

        if self.decl.is_constructor() {
            self.simulator = Some(ConstructorStackSimulator::new(
                self.class.name.clone(),
                self.class.super_name.clone(),
            ));
            self.state = State::AwaitingEntry;
        } else {
            self.enter_body()?;
        }
        Ok(())
    }

    fn enter_body(&mut self) -> Result<(), Error> {
        self.simulator = None;
        self.state = State::InBody;
        self.fire(ProbePoint::Entry)
    }

    /// Run a probe and account for what it emitted
    fn fire(&mut self, point: ProbePoint<'_>) -> Result<(), Error> {
        self.flush_frame()?;
        let mut cx = ProbeContext::new(
            self.class,
            &self.decl,
            &self.info,
            self.line,
            &mut self.labels,
            &mut self.extra_stack,
        );
        let out: &mut dyn MethodVisitor = &mut *self.next;
        let (injected, stack_value) = match point {
            ProbePoint::InitializeHolder => {
                (self.probe.initialize_trace_holder(&mut cx, out)?, None)
            }
            ProbePoint::Entry => (self.probe.on_method_entry(&mut cx, out)?, None),
            ProbePoint::Return(insn) => {
                let value = match (insn, &self.decl.descriptor.return_type) {
                    (BranchInstruction::Return, _) | (_, None) => None,
                    (_, Some(return_type)) => Some(FrameValue::from(return_type)),
                };
                (self.probe.on_method_return(&mut cx, insn, out)?, value)
            }
            ProbePoint::Throw => {
                let value = FrameValue::Object(FieldType::object(BinaryName::THROWABLE));
                (self.probe.on_throw_instruction(&mut cx, out)?, Some(value))
            }
            ProbePoint::Handler(entry, caught) => {
                let value = match entry.slot {
                    HandlerSlot::OnStack => Some(caught),
                    HandlerSlot::Local(_) => None,
                };
                (
                    self.probe.on_exception_handler_entry(&mut cx, entry, out)?,
                    value,
                )
            }
        };

        if injected.code {
            *self.modified = true;
            log::trace!(
                "{} probe injected into {}.{}",
                self.probe.name(),
                self.class.name.java_name(),
                self.decl.signature()
            );
        }
        if injected.guarded {
            if let Some(frames) = &mut self.frames {
                frames.inject(stack_value);
            }
        }
        Ok(())
    }

    /// Write the frame of the probe that just ended, ahead of the next instruction
    fn flush_frame(&mut self) -> Result<(), Error> {
        match self.frames.as_mut().and_then(FrameTracker::before_instruction) {
            Some(frame) => self.next.visit(MethodEvent::Frame(frame)),
            None => Ok(()),
        }
    }

    /// Static type of the exception a handler starts with
    ///
    /// Taken from the input's frame at the handler when there is one, since it has the precise
    /// type of a multi-catch clause.
    fn caught_value(&self) -> Option<FrameValue> {
        self.frames.as_ref().and_then(FrameTracker::stack_top)
    }

    /// Resolve a handler entered just before this point
    fn enter_handler(
        &mut self,
        slot: HandlerSlot,
        caught: Option<FrameValue>,
    ) -> Result<(), Error> {
        if let Some(entry) = self.handlers.take_pending(slot) {
            let caught = caught.unwrap_or_else(|| {
                FrameValue::Object(FieldType::object(entry.exception_type().clone()))
            });
            if let (HandlerSlot::Local(index), Some(frames)) = (slot, &mut self.frames) {
                frames.store(index, caught.clone());
            }
            if self.state == State::InBody {
                self.fire(ProbePoint::Handler(&entry, caught))?;
            } else {
                log::debug!(
                    "{}.{}: handler {:?} precedes receiver initialization, no probe",
                    self.class.name.java_name(),
                    self.decl.signature(),
                    entry.label
                );
            }
        }
        Ok(())
    }

    fn visit_label(&mut self, label: SynLabel) -> Result<(), Error> {
        if self.first_label.is_none() {
            self.first_label = Some(label);
        }
        self.placed_labels.insert(label);
        if let Some(simulator) = &mut self.simulator {
            simulator.visit_label(label);
        }
        self.next.visit(MethodEvent::Label(label))?;
        self.handlers.visit_label(label);
        Ok(())
    }

    fn visit_try_catch(&mut self, block: TryCatchBlock) -> Result<(), Error> {
        if self.placed_labels.contains(&block.handler) {
            log::warn!(
                "{}.{}: handler {:?} declared after its label was placed, no probe",
                self.class.name.java_name(),
                self.decl.signature(),
                block.handler
            );
        }
        self.handlers.declare(&block);
        if let Some(simulator) = &mut self.simulator {
            simulator.visit_try_catch(block.handler);
        }
        self.next.visit(MethodEvent::TryCatchBlock(block))
    }

    fn visit_instruction(&mut self, insn: Instruction) -> Result<(), Error> {
        if self.handlers.has_pending() {
            let caught = self.caught_value();
            match ExceptionHandlerTracker::slot_after(&insn) {
                Some(slot) => {
                    self.forward_instruction(insn)?;
                    return self.enter_handler(slot, caught);
                }
                None => self.enter_handler(HandlerSlot::OnStack, caught)?,
            }
        }
        self.forward_instruction(insn)
    }

    fn forward_instruction(&mut self, insn: Instruction) -> Result<(), Error> {
        if let Instruction::Ldc(Constant::String(text)) = &insn {
            if text.contains(COMPILE_ERROR_MARKER) {
                self.saw_compile_error = true;
            }
        }

        let mut just_initialized = false;
        if let Some(simulator) = &mut self.simulator {
            match simulator.visit_instruction(&insn) {
                Ok(initialized) => just_initialized = initialized,
                Err(kind) => return Err(self.simulation_error(format!("{:?}", insn), kind)),
            }
        }

        self.flush_frame()?;
        self.next.visit(MethodEvent::Instruction(insn))?;

        if just_initialized {
            if let Some(frames) = &mut self.frames {
                frames.receiver_initialized();
            }
            log::trace!(
                "{}.{}: receiver initialized, firing entry",
                self.class.name.java_name(),
                self.decl.signature()
            );
            self.enter_body()?;
        }
        Ok(())
    }

    fn visit_branch(&mut self, insn: BranchInstruction) -> Result<(), Error> {
        if self.handlers.has_pending() {
            let caught = self.caught_value();
            self.enter_handler(HandlerSlot::OnStack, caught)?;
        }

        if self.state == State::InBody {
            if insn.is_return() {
                self.fire(ProbePoint::Return(&insn))?;
            } else if insn == BranchInstruction::AThrow {
                self.fire(ProbePoint::Throw)?;
            }
        }

        if let Some(simulator) = &mut self.simulator {
            if let Err(kind) = simulator.visit_branch(&insn) {
                return Err(self.simulation_error(format!("{:?}", insn), kind));
            }
        }

        self.flush_frame()?;
        self.next.visit(MethodEvent::Branch(insn))
    }

    /// Widen parameter entries that start at the first original label to the true method start
    fn visit_local_variable(&mut self, mut variable: LocalVariable) -> Result<(), Error> {
        if variable.index < self.decl.first_local_slot() && Some(variable.start) == self.first_label
        {
            variable.start = self.method_start;
        }
        self.next.visit(MethodEvent::LocalVariable(variable))
    }

    /// Reject ignore directives that no handler of the method matched
    fn check_ignored_exceptions(&self) -> Result<(), Error> {
        if !self.probe.honors_ignore_list() || self.state == State::Declared {
            return Ok(());
        }
        for exception in &self.info.ignored_exceptions {
            if self.handlers.observed(exception) {
                continue;
            }
            return Err(if self.saw_compile_error {
                Error::SourceCompileError {
                    class: self.class.name.clone(),
                    method: self.decl.signature(),
                }
            } else {
                Error::StaleIgnoreDirective {
                    class: self.class.name.clone(),
                    method: self.decl.signature(),
                    exception: exception.clone(),
                }
            });
        }
        Ok(())
    }

    fn visit_end(&mut self) -> Result<(), Error> {
        if self.state == State::AwaitingEntry {
            log::warn!(
                "{}.{}: receiver never initialized, no entry probe",
                self.class.name.java_name(),
                self.decl.signature()
            );
        }
        self.check_ignored_exceptions()?;
        self.state = State::Done;
        self.next.visit(MethodEvent::End)
    }
}

impl<'a> MethodVisitor for MethodAdapter<'a> {
    fn visit(&mut self, event: MethodEvent) -> Result<(), Error> {
        match (self.state, event) {
            (State::Done, event) => Err(self.unexpected(&event)),

            (State::Declared, MethodEvent::Annotation(annotation)) => {
                if !self.info_from_metadata {
                    self.info.observe_annotation(&annotation);
                }
                self.next.visit(MethodEvent::Annotation(annotation))
            }
            (
                State::Declared,
                MethodEvent::ParameterAnnotation {
                    parameter,
                    annotation,
                },
            ) => {
                if !self.info_from_metadata {
                    self.info.observe_parameter_annotation(parameter, &annotation);
                }
                self.next.visit(MethodEvent::ParameterAnnotation {
                    parameter,
                    annotation,
                })
            }
            (State::Declared, MethodEvent::Code) => self.start_body(),
            (State::Declared, MethodEvent::End) => self.visit_end(),
            (State::Declared, event) => Err(self.unexpected(&event)),

            (_, event @ MethodEvent::Annotation(_))
            | (_, event @ MethodEvent::ParameterAnnotation { .. })
            | (_, event @ MethodEvent::Code) => Err(self.unexpected(&event)),

            (_, MethodEvent::Instruction(insn)) => self.visit_instruction(insn),
            (_, MethodEvent::Branch(insn)) => self.visit_branch(insn),
            (_, MethodEvent::Label(label)) => self.visit_label(label),
            (_, MethodEvent::LineNumber { line, start }) => {
                self.line = Some(line);
                self.next.visit(MethodEvent::LineNumber { line, start })
            }
            (_, MethodEvent::TryCatchBlock(block)) => self.visit_try_catch(block),
            (_, MethodEvent::Frame(frame)) => {
                let frame = match &mut self.frames {
                    Some(frames) => frames.input_frame(frame),
                    None => frame,
                };
                self.next.visit(MethodEvent::Frame(frame))
            }
            (_, MethodEvent::LocalVariable(variable)) => self.visit_local_variable(variable),
            (
                _,
                MethodEvent::Maxs {
                    max_stack,
                    max_locals,
                },
            ) => self.next.visit(MethodEvent::Maxs {
                max_stack: max_stack.saturating_add(self.extra_stack),
                max_locals,
            }),
            (_, MethodEvent::End) => self.visit_end(),
        }
    }
}
