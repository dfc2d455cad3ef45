//! Per-class and per-method facts that steer instrumentation
//!
//! Callers may hand these in already parsed. Otherwise they are recovered from the annotations
//! seen while visiting the class.

use crate::jvm::code::MethodEvent;
use crate::jvm::{Annotation, BinaryName, ClassNode, MethodDecl, MethodDescriptor, UnqualifiedName};

/// Options from `@TraceOptions`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraceOptions {
    /// Trace groups the class registers under
    pub trace_groups: Vec<String>,

    /// Resource bundle for translated trace messages
    pub message_bundle: Option<String>,

    /// Trace explicit throws
    pub trace_exception_throw: bool,

    /// Trace entry into `catch` blocks
    pub trace_exception_handling: bool,
}

impl TraceOptions {
    fn observe(&mut self, annotation: &Annotation) {
        for group in annotation
            .strings("traceGroups")
            .into_iter()
            .chain(annotation.strings("traceGroup"))
        {
            if !group.is_empty() && !self.trace_groups.contains(&group) {
                self.trace_groups.push(group);
            }
        }
        if let Some(bundle) = annotation.strings("messageBundle").into_iter().next() {
            if !bundle.is_empty() {
                self.message_bundle = Some(bundle);
            }
        }
        if let Some(throw) = annotation.boolean("traceExceptionThrow") {
            self.trace_exception_throw = throw;
        }
        if let Some(handling) = annotation.boolean("traceExceptionHandling") {
            self.trace_exception_handling = handling;
        }
    }

    /// Group the class registers under, when it names any
    pub fn trace_group(&self) -> Option<&str> {
        self.trace_groups.first().map(String::as_str)
    }
}

/// What is known about a class
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: BinaryName,
    pub trace_options: TraceOptions,

    /// `@Trivial`: no method of the class is traced
    pub trivial: bool,

    /// `@Sensitive`: no argument or result of the class's methods is ever traced
    pub sensitive: bool,

    /// Probe families already applied, from the persisted marker annotation
    pub instrumented_by: Vec<String>,

    pub methods: Vec<MethodInfo>,
}

/// What is known about a method
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodInfo {
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor,

    /// `@Trivial`: not traced
    pub trivial: bool,

    /// `@Sensitive` on the method: the result is replaced by a placeholder in trace
    pub sensitive_result: bool,

    /// `@Sensitive` on each parameter
    pub sensitive_parameters: Vec<bool>,

    /// `@ManualTrace`: the method traces itself
    pub manual_trace: bool,

    /// `@FFDCIgnore`: caught exceptions of these types are not reported
    pub ignored_exceptions: Vec<BinaryName>,
}

impl ClassInfo {
    pub fn new(name: BinaryName) -> ClassInfo {
        ClassInfo {
            name,
            trace_options: TraceOptions::default(),
            trivial: false,
            sensitive: false,
            instrumented_by: vec![],
            methods: vec![],
        }
    }

    /// Recover metadata from the annotations of a recorded class
    pub fn collect(class: &ClassNode) -> ClassInfo {
        let mut info = ClassInfo::new(class.header.name.clone());
        for annotation in &class.annotations {
            info.observe_annotation(annotation);
        }
        for method in &class.methods {
            let mut method_info = MethodInfo::new(&method.decl);
            for event in &method.events {
                match event {
                    MethodEvent::Annotation(annotation) => {
                        method_info.observe_annotation(annotation)
                    }
                    MethodEvent::ParameterAnnotation {
                        parameter,
                        annotation,
                    } => method_info.observe_parameter_annotation(*parameter, annotation),
                    _ => break,
                }
            }
            info.methods.push(method_info);
        }
        info
    }

    pub fn observe_annotation(&mut self, annotation: &Annotation) {
        let type_name = &annotation.type_name;
        if type_name == &BinaryName::TRIVIAL {
            self.trivial = true;
        } else if type_name == &BinaryName::SENSITIVE {
            self.sensitive = true;
        } else if type_name == &BinaryName::TRACE_OPTIONS {
            self.trace_options.observe(annotation);
        } else if type_name == &BinaryName::INJECTED_TRACE {
            for strategy in annotation.strings("value") {
                if !self.instrumented_by.contains(&strategy) {
                    self.instrumented_by.push(strategy);
                }
            }
        }
    }

    pub fn is_instrumented_by(&self, strategy: &str) -> bool {
        self.instrumented_by.iter().any(|applied| applied == strategy)
    }

    pub fn method(
        &self,
        name: &UnqualifiedName,
        descriptor: &MethodDescriptor,
    ) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|method| &method.name == name && &method.descriptor == descriptor)
    }
}

impl MethodInfo {
    pub fn new(decl: &MethodDecl) -> MethodInfo {
        MethodInfo {
            name: decl.name.clone(),
            descriptor: decl.descriptor.clone(),
            trivial: false,
            sensitive_result: false,
            sensitive_parameters: vec![false; decl.descriptor.parameters.len()],
            manual_trace: false,
            ignored_exceptions: vec![],
        }
    }

    pub fn observe_annotation(&mut self, annotation: &Annotation) {
        let type_name = &annotation.type_name;
        if type_name == &BinaryName::TRIVIAL {
            self.trivial = true;
        } else if type_name == &BinaryName::SENSITIVE {
            self.sensitive_result = true;
        } else if type_name == &BinaryName::MANUAL_TRACE {
            self.manual_trace = true;
        } else if type_name == &BinaryName::FFDC_IGNORE {
            for exception in annotation.classes("value") {
                if !self.ignored_exceptions.contains(&exception) {
                    self.ignored_exceptions.push(exception);
                }
            }
        }
    }

    pub fn observe_parameter_annotation(&mut self, parameter: u8, annotation: &Annotation) {
        if annotation.type_name == BinaryName::SENSITIVE {
            if let Some(flag) = self.sensitive_parameters.get_mut(parameter as usize) {
                *flag = true;
            }
        }
    }

    pub fn is_parameter_sensitive(&self, parameter: usize) -> bool {
        self.sensitive_parameters
            .get(parameter)
            .copied()
            .unwrap_or(false)
    }

    /// Is an exception of this type on the ignore list?
    pub fn ignores(&self, exception: &BinaryName) -> bool {
        self.ignored_exceptions.contains(exception)
    }
}
