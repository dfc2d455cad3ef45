use ras_instrument::instrument::{
    ClassIdentity, Instrumented, Instrumenter, MetadataCache, ProbeKind, Settings,
};
use ras_instrument::jvm::code::{
    BranchInstruction, Constant, FieldRef, Frame, FrameValue, Instruction, InvokeType,
    LocalVariable, MethodEvent, MethodRef, OrdComparison, SynLabel, TryCatchBlock,
};
use ras_instrument::jvm::{
    Annotation, AnnotationValue, BinaryName, ClassAccessFlags, ClassHeader, ClassNode,
    FieldAccessFlags, FieldDecl, FieldType, MethodAccessFlags, MethodDecl, MethodDescriptor,
    MethodNode, Name, ParseDescriptor, UnqualifiedName, Version,
};
use ras_instrument::{Error, SimulationErrorKind};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn class_name(name: &str) -> BinaryName {
    BinaryName::from_string(String::from(name)).unwrap()
}

fn member_name(name: &str) -> UnqualifiedName {
    UnqualifiedName::from_string(String::from(name)).unwrap()
}

fn descriptor(descriptor: &str) -> MethodDescriptor {
    MethodDescriptor::parse(descriptor).unwrap()
}

fn class(name: &str, version: Version, methods: Vec<MethodNode>) -> ClassNode {
    ClassNode {
        header: ClassHeader {
            version,
            access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            name: class_name(name),
            super_name: Some(BinaryName::OBJECT),
            interfaces: vec![],
        },
        annotations: vec![],
        fields: vec![],
        methods,
    }
}

fn method(
    access_flags: MethodAccessFlags,
    name: &str,
    signature: &str,
    events: Vec<MethodEvent>,
) -> MethodNode {
    MethodNode {
        decl: MethodDecl {
            access_flags,
            name: member_name(name),
            descriptor: descriptor(signature),
            exceptions: vec![],
        },
        events,
    }
}

fn insn(insn: Instruction) -> MethodEvent {
    MethodEvent::Instruction(insn)
}

fn branch(insn: BranchInstruction) -> MethodEvent {
    MethodEvent::Branch(insn)
}

fn label(id: usize) -> MethodEvent {
    MethodEvent::Label(SynLabel::new(id))
}

fn catch(handler: usize, catch_type: &str) -> MethodEvent {
    MethodEvent::TryCatchBlock(TryCatchBlock {
        start: SynLabel::new(0),
        end: SynLabel::new(1),
        handler: SynLabel::new(handler),
        catch_type: Some(class_name(catch_type)),
    })
}

fn ffdc_ignore(exceptions: &[&str]) -> MethodEvent {
    let values = exceptions
        .iter()
        .map(|exception| AnnotationValue::Class(FieldType::object(class_name(exception))))
        .collect();
    MethodEvent::Annotation(
        Annotation::new(BinaryName::FFDC_IGNORE, false)
            .with("value", AnnotationValue::Array(values)),
    )
}

fn instrument(kind: ProbeKind, class: &ClassNode) -> Result<Instrumented, Error> {
    init_logging();
    let cache = MetadataCache::new();
    Instrumenter::with_cache(Settings::new(kind), &cache).instrument(class, None)
}

fn output_method<'c>(class: &'c ClassNode, name: &str, signature: &str) -> &'c MethodNode {
    class.method(&member_name(name), signature).unwrap()
}

fn frames(method: &MethodNode) -> Vec<Frame> {
    method
        .events
        .iter()
        .filter_map(|event| match event {
            MethodEvent::Frame(frame) => Some(frame.clone()),
            _ => None,
        })
        .collect()
}

/// Were two frames written with no code between them, at the same offset?
fn has_stacked_frames(method: &MethodNode) -> bool {
    let mut frame_here = false;
    for event in &method.events {
        match event {
            MethodEvent::Frame(_) if frame_here => return true,
            MethodEvent::Frame(_) => frame_here = true,
            MethodEvent::Instruction(_) | MethodEvent::Branch(_) => frame_here = false,
            _ => (),
        }
    }
    false
}

fn instructions(method: &MethodNode) -> Vec<Instruction> {
    method.instructions().cloned().collect()
}

/// Every invocation of a method with this name
fn calls<'m>(method: &'m MethodNode, name: &str) -> Vec<&'m MethodRef> {
    method
        .instructions()
        .filter_map(|insn| match insn {
            Instruction::Invoke(_, method) if method.name.as_str() == name => Some(method),
            _ => None,
        })
        .collect()
}

fn marker(class: &ClassNode) -> Vec<String> {
    class
        .annotation(&BinaryName::INJECTED_TRACE)
        .map(|annotation| annotation.strings("value"))
        .unwrap_or_default()
}

fn logger_field(class: &str) -> FieldRef {
    FieldRef {
        owner: class_name(class),
        name: UnqualifiedName::LOGGER_FIELD,
        descriptor: FieldType::object(BinaryName::LOGGER),
    }
}

fn process_exception(with_this: bool) -> Instruction {
    let signature = if with_this {
        "(Ljava/lang/Throwable;Ljava/lang/String;Ljava/lang/String;Ljava/lang/Object;)V"
    } else {
        "(Ljava/lang/Throwable;Ljava/lang/String;Ljava/lang/String;)V"
    };
    Instruction::Invoke(
        InvokeType::Static,
        MethodRef::new(
            BinaryName::FFDC_FILTER,
            UnqualifiedName::PROCESSEXCEPTION,
            descriptor(signature),
        ),
    )
}

fn login_class() -> ClassNode {
    let sensitive = Annotation::new(BinaryName::SENSITIVE, false);
    class(
        "com/acme/Login",
        Version::JAVA8,
        vec![method(
            MethodAccessFlags::PUBLIC,
            "login",
            "(Ljava/lang/String;I)V",
            vec![
                MethodEvent::ParameterAnnotation {
                    parameter: 0,
                    annotation: sensitive,
                },
                MethodEvent::Code,
                label(0),
                branch(BranchInstruction::Return),
                MethodEvent::Maxs {
                    max_stack: 0,
                    max_locals: 3,
                },
                MethodEvent::End,
            ],
        )],
    )
}

/// `static int twice(int x) { return x * 2; }`
fn twice_class(version: Version) -> ClassNode {
    class(
        "com/acme/Numbers",
        version,
        vec![method(
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            "twice",
            "(I)I",
            vec![
                MethodEvent::Code,
                label(0),
                insn(Instruction::ILoad(0)),
                insn(Instruction::IConst2),
                insn(Instruction::IMul),
                branch(BranchInstruction::IReturn),
                label(1),
                MethodEvent::LocalVariable(LocalVariable {
                    name: String::from("x"),
                    descriptor: FieldType::int(),
                    start: SynLabel::new(0),
                    end: SynLabel::new(1),
                    index: 0,
                }),
                MethodEvent::Maxs {
                    max_stack: 2,
                    max_locals: 1,
                },
                MethodEvent::End,
            ],
        )],
    )
}

/// `run()` with one `catch` storing the exception and one discarding it
fn worker_class(annotations: Vec<MethodEvent>) -> ClassNode {
    let worker = class_name("com/acme/Worker");
    let mut events = annotations;
    events.extend(vec![
        MethodEvent::Code,
        catch(2, "java/io/IOException"),
        catch(3, "java/lang/IllegalStateException"),
        label(0),
        MethodEvent::LineNumber {
            line: 10,
            start: SynLabel::new(0),
        },
        insn(Instruction::ALoad(0)),
        insn(Instruction::Invoke(
            InvokeType::Virtual,
            MethodRef::new(worker, member_name("work"), descriptor("()V")),
        )),
        label(1),
        branch(BranchInstruction::Goto(SynLabel::new(4))),
        label(2),
        MethodEvent::LineNumber {
            line: 12,
            start: SynLabel::new(2),
        },
        insn(Instruction::AStore(1)),
        branch(BranchInstruction::Goto(SynLabel::new(4))),
        label(3),
        MethodEvent::LineNumber {
            line: 14,
            start: SynLabel::new(3),
        },
        insn(Instruction::Pop),
        label(4),
        branch(BranchInstruction::Return),
        MethodEvent::Maxs {
            max_stack: 1,
            max_locals: 2,
        },
        MethodEvent::End,
    ]);
    class(
        "com/acme/Worker",
        Version::JAVA8,
        vec![method(MethodAccessFlags::PUBLIC, "run", "()V", events)],
    )
}

#[test]
fn sensitive_argument_is_redacted_on_entry() {
    let out = instrument(ProbeKind::Jsr47, &login_class()).unwrap();
    assert!(out.modified);

    let login = output_method(&out.class, "login", "(Ljava/lang/String;I)V");
    let insns = instructions(login);
    let array = insns
        .iter()
        .position(|insn| insn == &Instruction::ANewArray(FieldType::object(BinaryName::OBJECT)))
        .unwrap();
    assert_eq!(insns[array - 1], Instruction::IConst2);
    assert_eq!(
        insns[array + 1..array + 11].to_vec(),
        vec![
            Instruction::Dup,
            Instruction::IConst0,
            Instruction::Ldc(Constant::String(String::from(
                "<sensitive java.lang.String>"
            ))),
            Instruction::AAStore,
            Instruction::Dup,
            Instruction::IConst1,
            Instruction::ILoad(2),
            Instruction::Invoke(
                InvokeType::Static,
                MethodRef::new(
                    BinaryName::INTEGER,
                    UnqualifiedName::VALUEOF,
                    descriptor("(I)Ljava/lang/Integer;"),
                ),
            ),
            Instruction::AAStore,
            Instruction::Invoke(
                InvokeType::Virtual,
                MethodRef::new(
                    BinaryName::LOGGER,
                    UnqualifiedName::ENTERING,
                    descriptor("(Ljava/lang/String;Ljava/lang/String;[Ljava/lang/Object;)V"),
                ),
            ),
        ]
    );

    // The sensitive argument is never loaded
    assert!(!insns.contains(&Instruction::ALoad(1)));
    assert_eq!(calls(login, "exiting").len(), 1);
}

#[test]
fn trace_holder_declared_and_initialized() {
    let out = instrument(ProbeKind::Jsr47, &login_class()).unwrap();

    assert_eq!(
        out.class.fields,
        vec![FieldDecl {
            access_flags: FieldAccessFlags::TRACE_HOLDER,
            name: UnqualifiedName::LOGGER_FIELD,
            descriptor: FieldType::object(BinaryName::LOGGER),
        }]
    );
    assert_eq!(marker(&out.class), vec![String::from("jsr47")]);

    let clinit = output_method(&out.class, "<clinit>", "()V");
    assert_eq!(
        instructions(clinit),
        vec![
            Instruction::Ldc(Constant::String(String::from("com.acme.Login"))),
            Instruction::Invoke(
                InvokeType::Static,
                MethodRef::new(
                    BinaryName::LOGGER,
                    UnqualifiedName::GETLOGGER,
                    descriptor("(Ljava/lang/String;)Ljava/util/logging/Logger;"),
                ),
            ),
            Instruction::PutStatic(logger_field("com/acme/Login")),
        ]
    );
}

#[test]
fn second_pass_is_a_no_op() {
    let first = instrument(ProbeKind::Jsr47, &login_class()).unwrap();
    let second = instrument(ProbeKind::Jsr47, &first.class).unwrap();

    assert!(!second.modified);
    assert_eq!(second.class, first.class);
    let login = output_method(&second.class, "login", "(Ljava/lang/String;I)V");
    assert_eq!(calls(login, "entering").len(), 1);
}

#[test]
fn constructor_entry_waits_for_own_super_call() {
    let node = class_name("com/acme/Node");
    let input = class(
        "com/acme/Node",
        Version::JAVA8,
        vec![method(
            MethodAccessFlags::PUBLIC,
            "<init>",
            "(Lcom/acme/Node;)V",
            vec![
                MethodEvent::Code,
                label(0),
                // new Node(null)
                insn(Instruction::New(node.clone())),
                insn(Instruction::Dup),
                insn(Instruction::AConstNull),
                insn(Instruction::Invoke(
                    InvokeType::Special,
                    MethodRef::new(
                        node,
                        UnqualifiedName::INIT,
                        descriptor("(Lcom/acme/Node;)V"),
                    ),
                )),
                insn(Instruction::AStore(2)),
                // super()
                insn(Instruction::ALoad(0)),
                insn(Instruction::Invoke(
                    InvokeType::Special,
                    MethodRef::new(BinaryName::OBJECT, UnqualifiedName::INIT, descriptor("()V")),
                )),
                branch(BranchInstruction::Return),
                MethodEvent::Maxs {
                    max_stack: 3,
                    max_locals: 3,
                },
                MethodEvent::End,
            ],
        )],
    );
    let out = instrument(ProbeKind::Jsr47, &input).unwrap();

    let init = output_method(&out.class, "<init>", "(Lcom/acme/Node;)V");
    let insns = instructions(init);
    let super_call = insns
        .iter()
        .position(|insn| {
            matches!(insn, Instruction::Invoke(InvokeType::Special, method) if method.owner == BinaryName::OBJECT)
        })
        .unwrap();
    let entering = insns
        .iter()
        .position(|insn| {
            matches!(insn, Instruction::Invoke(_, method) if method.name == UnqualifiedName::ENTERING)
        })
        .unwrap();

    assert_eq!(insns[super_call + 1], Instruction::GetStatic(logger_field("com/acme/Node")));
    assert!(entering > super_call);
    assert_eq!(calls(init, "entering").len(), 1);
}

#[test]
fn handler_entry_fires_once_per_catch_clause() {
    let out = instrument(ProbeKind::Ffdc, &worker_class(vec![])).unwrap();
    assert!(out.modified);

    // No trace holder for failure capture
    assert!(out.class.fields.is_empty());
    assert_eq!(out.class.methods.len(), 1);
    assert_eq!(marker(&out.class), vec![String::from("ffdc")]);

    let run = output_method(&out.class, "run", "()V");
    assert_eq!(calls(run, "processException").len(), 2);

    let source_id = Instruction::Ldc(Constant::String(String::from("com.acme.Worker")));
    let insns = instructions(run);

    // Stored exception: the probe follows the store and reads the local
    let stored = insns
        .iter()
        .position(|insn| insn == &Instruction::AStore(1))
        .unwrap();
    assert_eq!(
        insns[stored + 1..stored + 6].to_vec(),
        vec![
            Instruction::ALoad(1),
            source_id.clone(),
            Instruction::Ldc(Constant::String(String::from("12"))),
            Instruction::ALoad(0),
            process_exception(true),
        ]
    );

    // Discarded exception: the probe copies it off the stack first
    let popped = insns
        .iter()
        .position(|insn| insn == &Instruction::Pop)
        .unwrap();
    assert_eq!(
        insns[popped - 5..popped].to_vec(),
        vec![
            Instruction::Dup,
            source_id,
            Instruction::Ldc(Constant::String(String::from("14"))),
            Instruction::ALoad(0),
            process_exception(true),
        ]
    );

    // Unguarded probes need no frames
    assert!(!run
        .events
        .iter()
        .any(|event| matches!(event, MethodEvent::Frame(_))));
}

#[test]
fn ignored_exception_with_matching_handler() {
    let input = worker_class(vec![ffdc_ignore(&["java/io/IOException"])]);
    let out = instrument(ProbeKind::Ffdc, &input).unwrap();

    let run = output_method(&out.class, "run", "()V");
    assert_eq!(calls(run, "processException").len(), 1);

    // Only the `IllegalStateException` handler, which leaves the exception on the stack
    assert!(!instructions(run).contains(&Instruction::ALoad(1)));
}

#[test]
fn stale_ignore_directive_is_rejected() {
    let input = worker_class(vec![ffdc_ignore(&["java/sql/SQLException"])]);
    match instrument(ProbeKind::Ffdc, &input) {
        Err(Error::StaleIgnoreDirective {
            class,
            method,
            exception,
        }) => {
            assert_eq!(class, class_name("com/acme/Worker"));
            assert_eq!(method, "run()V");
            assert_eq!(exception, class_name("java/sql/SQLException"));
        }
        other => panic!("expected a stale ignore directive, got {:?}", other),
    }
}

#[test]
fn compile_error_stub_is_reported_as_such() {
    let error = class_name("java/lang/Error");
    let input = class(
        "com/acme/Broken",
        Version::JAVA8,
        vec![method(
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            "broken",
            "()V",
            vec![
                ffdc_ignore(&["java/io/IOException"]),
                MethodEvent::Code,
                label(0),
                insn(Instruction::New(error.clone())),
                insn(Instruction::Dup),
                insn(Instruction::Ldc(Constant::String(String::from(
                    "Unresolved compilation problem: \n\tFoo cannot be resolved to a type\n",
                )))),
                insn(Instruction::Invoke(
                    InvokeType::Special,
                    MethodRef::new(
                        error,
                        UnqualifiedName::INIT,
                        descriptor("(Ljava/lang/String;)V"),
                    ),
                )),
                branch(BranchInstruction::AThrow),
                MethodEvent::Maxs {
                    max_stack: 3,
                    max_locals: 0,
                },
                MethodEvent::End,
            ],
        )],
    );
    match instrument(ProbeKind::Ffdc, &input) {
        Err(Error::SourceCompileError { class, method }) => {
            assert_eq!(class, class_name("com/acme/Broken"));
            assert_eq!(method, "broken()V");
        }
        other => panic!("expected a source compile error, got {:?}", other),
    }
}

#[test]
fn existing_static_initializer_gets_registration() {
    let widget = class_name("com/acme/Widget");
    let count = FieldRef {
        owner: widget.clone(),
        name: member_name("count"),
        descriptor: FieldType::int(),
    };
    let mut input = class(
        "com/acme/Widget",
        Version::JAVA8,
        vec![method(
            MethodAccessFlags::STATIC,
            "<clinit>",
            "()V",
            vec![
                MethodEvent::Code,
                label(0),
                insn(Instruction::IConst0),
                insn(Instruction::PutStatic(count.clone())),
                branch(BranchInstruction::Return),
                MethodEvent::Maxs {
                    max_stack: 1,
                    max_locals: 0,
                },
                MethodEvent::End,
            ],
        )],
    );
    input.annotations.push(
        Annotation::new(BinaryName::TRACE_OPTIONS, false)
            .with("traceGroup", AnnotationValue::String(String::from("widgets"))),
    );
    input.fields.push(FieldDecl {
        access_flags: FieldAccessFlags::PRIVATE | FieldAccessFlags::STATIC,
        name: member_name("count"),
        descriptor: FieldType::int(),
    });

    let out = instrument(ProbeKind::LibertyTr, &input).unwrap();
    assert_eq!(marker(&out.class), vec![String::from("liberty-tr")]);

    let tc = FieldType::object(BinaryName::LIBERTY_TRACE_COMPONENT);
    assert_eq!(out.class.fields.len(), 2);
    assert_eq!(out.class.fields[1].name, UnqualifiedName::TRACE_COMPONENT_FIELD);
    assert_eq!(out.class.fields[1].descriptor, tc);

    assert_eq!(out.class.methods.len(), 1);
    let clinit = output_method(&out.class, "<clinit>", "()V");
    assert_eq!(
        instructions(clinit),
        vec![
            Instruction::Ldc(Constant::Class(FieldType::object(widget.clone()))),
            Instruction::Ldc(Constant::String(String::from("widgets"))),
            Instruction::AConstNull,
            Instruction::Invoke(
                InvokeType::Static,
                MethodRef::new(
                    BinaryName::LIBERTY_TR,
                    UnqualifiedName::REGISTER,
                    descriptor(
                        "(Ljava/lang/Class;Ljava/lang/String;Ljava/lang/String;)Lcom/ibm/websphere/ras/TraceComponent;"
                    ),
                ),
            ),
            Instruction::PutStatic(FieldRef {
                owner: widget,
                name: UnqualifiedName::TRACE_COMPONENT_FIELD,
                descriptor: tc,
            }),
            Instruction::IConst0,
            Instruction::PutStatic(count),
        ]
    );
    assert_eq!(
        clinit.events.iter().rev().nth(1),
        Some(&MethodEvent::Maxs {
            max_stack: 4,
            max_locals: 0,
        })
    );
}

#[test]
fn existing_logger_field_is_reused() {
    let mut input = twice_class(Version::JAVA8);
    input.fields.push(FieldDecl {
        access_flags: FieldAccessFlags::PRIVATE | FieldAccessFlags::STATIC | FieldAccessFlags::FINAL,
        name: member_name("log"),
        descriptor: FieldType::object(BinaryName::LOGGER),
    });

    let out = instrument(ProbeKind::Jsr47, &input).unwrap();
    assert_eq!(out.class.fields, input.fields);
    assert_eq!(out.class.methods.len(), 1);

    let twice = output_method(&out.class, "twice", "(I)I");
    assert_eq!(
        instructions(twice)[0],
        Instruction::GetStatic(FieldRef {
            owner: class_name("com/acme/Numbers"),
            name: member_name("log"),
            descriptor: FieldType::object(BinaryName::LOGGER),
        })
    );
}

#[test]
fn parameter_locals_start_at_method_start() {
    let out = instrument(ProbeKind::Jsr47, &twice_class(Version::JAVA8)).unwrap();
    let twice = output_method(&out.class, "twice", "(I)I");

    let method_start = match &twice.events[1] {
        MethodEvent::Label(label) => *label,
        other => panic!("expected the method start label, got {:?}", other),
    };
    assert!(method_start.is_injected());

    let variable = twice
        .events
        .iter()
        .find_map(|event| match event {
            MethodEvent::LocalVariable(variable) => Some(variable),
            _ => None,
        })
        .unwrap();
    assert_eq!(variable.start, method_start);
    assert_eq!(variable.end, SynLabel::new(1));

    // Entry needs 8 extra slots, exit 6
    assert!(twice.events.contains(&MethodEvent::Maxs {
        max_stack: 10,
        max_locals: 1,
    }));
}

#[test]
fn frames_follow_guarded_probes() {
    let frames_for = |version: Version| -> Vec<Frame> {
        let out = instrument(ProbeKind::Jsr47, &twice_class(version)).unwrap();
        frames(output_method(&out.class, "twice", "(I)I"))
    };

    assert_eq!(
        frames_for(Version::JAVA8),
        vec![
            Frame::Same,
            Frame::Same1 {
                stack_value: FrameValue::Integer
            },
        ]
    );
    assert_eq!(frames_for(Version::JAVA5), vec![]);
}

#[test]
fn explicit_throw_traced_when_enabled() {
    init_logging();
    let exception = class_name("java/lang/IllegalStateException");
    let input = class(
        "com/acme/Fail",
        Version::JAVA8,
        vec![method(
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            "fail",
            "()V",
            vec![
                MethodEvent::Code,
                label(0),
                insn(Instruction::New(exception.clone())),
                insn(Instruction::Dup),
                insn(Instruction::Invoke(
                    InvokeType::Special,
                    MethodRef::new(exception, UnqualifiedName::INIT, descriptor("()V")),
                )),
                branch(BranchInstruction::AThrow),
                MethodEvent::Maxs {
                    max_stack: 2,
                    max_locals: 0,
                },
                MethodEvent::End,
            ],
        )],
    );

    let cache = MetadataCache::new();
    let mut settings = Settings::new(ProbeKind::WebSphereTr);
    let quiet = Instrumenter::with_cache(settings.clone(), &cache)
        .instrument(&input, None)
        .unwrap();
    let fail = output_method(&quiet.class, "fail", "()V");
    assert_eq!(calls(fail, "entry").len(), 1);
    assert!(calls(fail, "exit").is_empty());

    settings.trace_exception_throw = true;
    let out = Instrumenter::with_cache(settings, &cache)
        .instrument(&input, None)
        .unwrap();
    let fail = output_method(&out.class, "fail", "()V");
    assert_eq!(
        calls(fail, "exit"),
        vec![&MethodRef::new(
            BinaryName::WEBSPHERE_TR,
            UnqualifiedName::EXIT,
            descriptor("(Lcom/ibm/ejs/ras/TraceComponent;Ljava/lang/String;Ljava/lang/Object;)V"),
        )]
    );
    assert_eq!(
        calls(fail, "entry"),
        vec![&MethodRef::new(
            BinaryName::WEBSPHERE_TR,
            UnqualifiedName::ENTRY,
            descriptor("(Lcom/ibm/ejs/ras/TraceComponent;Ljava/lang/String;[Ljava/lang/Object;)V"),
        )]
    );
    assert!(out.class.method(&UnqualifiedName::CLINIT, "()V").is_some());
}

#[test]
fn interfaces_pass_through() {
    let mut input = twice_class(Version::JAVA8);
    input.header.access_flags = ClassAccessFlags::PUBLIC
        | ClassAccessFlags::INTERFACE
        | ClassAccessFlags::ABSTRACT;

    let out = instrument(ProbeKind::Jsr47, &input).unwrap();
    assert!(!out.modified);
    assert_eq!(out.class, input);
}

#[test]
fn trivial_methods_are_not_traced() {
    let mut input = twice_class(Version::JAVA8);
    input.methods[0].events.insert(
        0,
        MethodEvent::Annotation(Annotation::new(BinaryName::TRIVIAL, false)),
    );

    let out = instrument(ProbeKind::Jsr47, &input).unwrap();
    let twice = output_method(&out.class, "twice", "(I)I");
    assert!(calls(twice, "entering").is_empty());
    assert!(calls(twice, "exiting").is_empty());
}

#[test]
fn preprocessed_only_waits_for_the_preprocess_marker() {
    let input = twice_class(Version::JAVA8);
    let cache = MetadataCache::new();
    init_logging();

    let mut settings = Settings::new(ProbeKind::Jsr47);
    settings.instrument_preprocessed_only = true;
    let instrumenter = Instrumenter::with_cache(settings, &cache);

    let skipped = instrumenter.instrument(&input, None).unwrap();
    assert!(!skipped.modified);
    assert!(marker(&skipped.class).is_empty());

    let preprocessed = Instrumenter::with_cache(Settings::new(ProbeKind::Preprocess), &cache)
        .instrument(&input, None)
        .unwrap();
    assert!(!preprocessed.modified);
    assert_eq!(marker(&preprocessed.class), vec![String::from("preprocess")]);

    let out = instrumenter.instrument(&preprocessed.class, None).unwrap();
    assert!(out.modified);
    assert_eq!(
        marker(&out.class),
        vec![String::from("preprocess"), String::from("jsr47")]
    );
}

#[test]
fn cached_metadata_drives_instrumentation() {
    init_logging();
    let cache = MetadataCache::new();
    let instrumenter = Instrumenter::with_cache(Settings::new(ProbeKind::Ffdc), &cache);
    let input = worker_class(vec![ffdc_ignore(&["java/io/IOException"])]);
    let identity = ClassIdentity::new(input.header.name.clone());

    for _ in 0..2 {
        let out = instrumenter.instrument_cached(&identity, &input).unwrap();
        let run = output_method(&out.class, "run", "()V");
        assert_eq!(calls(run, "processException").len(), 1);
    }
    assert_eq!(cache.len(), 1);

    drop(identity);
    assert_eq!(cache.purge(), 1);
    assert!(cache.is_empty());
}

#[test]
fn broken_constructor_abandons_the_class() {
    let input = class(
        "com/acme/Broken",
        Version::JAVA8,
        vec![method(
            MethodAccessFlags::PUBLIC,
            "<init>",
            "()V",
            vec![
                MethodEvent::Code,
                label(0),
                insn(Instruction::Pop),
                branch(BranchInstruction::Return),
                MethodEvent::Maxs {
                    max_stack: 1,
                    max_locals: 1,
                },
                MethodEvent::End,
            ],
        )],
    );
    match instrument(ProbeKind::Jsr47, &input) {
        Err(Error::StackSimulation { method, kind, .. }) => {
            assert_eq!(method, "com.acme.Broken.<init>()V");
            assert_eq!(kind, SimulationErrorKind::EmptyStack);
        }
        other => panic!("expected a stack simulation failure, got {:?}", other),
    }
}

#[test]
fn constructor_frames_see_an_initialized_receiver() {
    let widget = class_name("com/acme/Widget");
    let input = class(
        "com/acme/Widget",
        Version::JAVA8,
        vec![method(
            MethodAccessFlags::PUBLIC,
            "<init>",
            "()V",
            vec![
                MethodEvent::Code,
                label(0),
                insn(Instruction::ALoad(0)),
                insn(Instruction::Invoke(
                    InvokeType::Special,
                    MethodRef::new(BinaryName::OBJECT, UnqualifiedName::INIT, descriptor("()V")),
                )),
                branch(BranchInstruction::Return),
                MethodEvent::Maxs {
                    max_stack: 1,
                    max_locals: 1,
                },
                MethodEvent::End,
            ],
        )],
    );
    let out = instrument(ProbeKind::LibertyTr, &input).unwrap();
    let init = output_method(&out.class, "<init>", "()V");

    assert_eq!(
        frames(init),
        vec![
            Frame::Full {
                locals: vec![FrameValue::Object(FieldType::object(widget))],
                stack: vec![],
            },
            Frame::Same,
        ]
    );
    let last = init.events.len() - 3;
    assert_eq!(init.events[last - 1], MethodEvent::Frame(Frame::Same));
    assert_eq!(init.events[last], branch(BranchInstruction::Return));
}

#[test]
fn handler_frames_include_the_stored_exception() {
    init_logging();
    let loader = class_name("com/acme/Loader");
    let io_exception = FrameValue::Object(FieldType::object(class_name("java/io/IOException")));
    let input = class(
        "com/acme/Loader",
        Version::JAVA8,
        vec![method(
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            "load",
            "()V",
            vec![
                MethodEvent::Code,
                catch(2, "java/io/IOException"),
                label(0),
                insn(Instruction::Invoke(
                    InvokeType::Static,
                    MethodRef::new(loader, member_name("read"), descriptor("()V")),
                )),
                label(1),
                branch(BranchInstruction::Goto(SynLabel::new(3))),
                label(2),
                MethodEvent::Frame(Frame::Same1 {
                    stack_value: io_exception.clone(),
                }),
                insn(Instruction::AStore(0)),
                insn(Instruction::ALoad(0)),
                branch(BranchInstruction::AThrow),
                label(3),
                MethodEvent::Frame(Frame::Same),
                branch(BranchInstruction::Return),
                MethodEvent::Maxs {
                    max_stack: 1,
                    max_locals: 1,
                },
                MethodEvent::End,
            ],
        )],
    );
    let mut settings = Settings::new(ProbeKind::Jsr47);
    settings.trace_exception_handling = true;
    let cache = MetadataCache::new();
    let out = Instrumenter::with_cache(settings, &cache)
        .instrument(&input, None)
        .unwrap();
    let load = output_method(&out.class, "load", "()V");

    assert_eq!(calls(load, "logp").len(), 1);
    assert_eq!(
        frames(load),
        vec![
            Frame::Same,
            Frame::Same1 {
                stack_value: io_exception.clone(),
            },
            Frame::Append {
                locals: vec![io_exception],
            },
            Frame::Chop { num_locals: 1 },
            Frame::Same,
        ]
    );

    // The frame after the handler probe covers the reload of the exception
    let reload = load
        .events
        .iter()
        .rposition(|event| event == &insn(Instruction::ALoad(0)))
        .unwrap();
    assert!(matches!(
        load.events[reload - 1],
        MethodEvent::Frame(Frame::Append { .. })
    ));
}

#[test]
fn entry_frame_yields_to_a_loop_header() {
    // `static void spin(int x) { while (x != 0) {} }`
    let input = class(
        "com/acme/Spinner",
        Version::JAVA8,
        vec![method(
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            "spin",
            "(I)V",
            vec![
                MethodEvent::Code,
                label(0),
                MethodEvent::Frame(Frame::Same),
                insn(Instruction::ILoad(0)),
                branch(BranchInstruction::If(OrdComparison::EQ, SynLabel::new(1))),
                branch(BranchInstruction::Goto(SynLabel::new(0))),
                label(1),
                MethodEvent::Frame(Frame::Same),
                branch(BranchInstruction::Return),
                MethodEvent::Maxs {
                    max_stack: 1,
                    max_locals: 1,
                },
                MethodEvent::End,
            ],
        )],
    );
    let out = instrument(ProbeKind::Jsr47, &input).unwrap();
    let spin = output_method(&out.class, "spin", "(I)V");

    assert!(!has_stacked_frames(spin));
    assert_eq!(frames(spin), vec![Frame::Same, Frame::Same, Frame::Same]);
    assert_eq!(calls(spin, "entering").len(), 1);
}
