use super::filter::{is_instrumentable_class, is_instrumentable_method};
use super::metadata::{ClassInfo, MethodInfo};
use super::method_adapter::MethodAdapter;
use super::probes::{ClassContext, ProbeStrategy, TraceHolder};
use super::settings::Settings;
use crate::instrument::probes::PreprocessProbe;
use crate::jvm::code::{BranchInstruction, MethodEvent};
use crate::jvm::{
    Annotation, AnnotationValue, BinaryName, ClassHeader, ClassVisitor, FieldAccessFlags,
    FieldDecl, MethodAccessFlags, MethodDecl, MethodDescriptor, MethodVisitor, UnqualifiedName,
};
use crate::Error;
use std::sync::Arc;

/// How far the class has been visited
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Header,
    Annotations,
    Fields,
    Methods,
    Done,
}

/// Rewrites one class, delegating each method body to a [`MethodAdapter`]
///
/// The class is passed through untouched when it cannot be instrumented, when its marker
/// annotation shows this probe family already ran, or when only preprocessed classes are wanted
/// and it was not preprocessed.
pub struct ClassAdapter<'a> {
    next: Box<dyn ClassVisitor + 'a>,
    probe: &'a dyn ProbeStrategy,
    settings: &'a Settings,

    /// Metadata supplied by the caller
    metadata: Option<Arc<ClassInfo>>,
    phase: Phase,
    header: Option<ClassHeader>,

    /// Metadata recovered from class annotations when none was supplied
    observed: Option<ClassInfo>,

    /// Families named by the input's marker annotation
    instrumented_by: Vec<String>,
    fields: Vec<FieldDecl>,
    instrument: bool,
    context: Option<ClassContext>,
    holder_needs_init: bool,
    saw_static_initializer: bool,
    modified: bool,
}

impl<'a> ClassAdapter<'a> {
    pub fn new(
        next: Box<dyn ClassVisitor + 'a>,
        probe: &'a dyn ProbeStrategy,
        settings: &'a Settings,
        metadata: Option<Arc<ClassInfo>>,
    ) -> ClassAdapter<'a> {
        ClassAdapter {
            next,
            probe,
            settings,
            metadata,
            phase: Phase::Header,
            header: None,
            observed: None,
            instrumented_by: vec![],
            fields: vec![],
            instrument: false,
            context: None,
            holder_needs_init: false,
            saw_static_initializer: false,
            modified: false,
        }
    }

    /// Did any method end up with injected code?
    pub fn modified(&self) -> bool {
        self.modified
    }

    fn unexpected(&self, event: &str) -> Error {
        let class = match &self.header {
            Some(header) => header.name.java_name(),
            None => String::from("<unknown class>"),
        };
        Error::UnexpectedEvent {
            method: class,
            event: format!("{} in phase {:?}", event, self.phase),
        }
    }

    fn class_name(&self) -> Result<&BinaryName, Error> {
        match &self.header {
            Some(header) => Ok(&header.name),
            None => Err(self.unexpected("class event before the header")),
        }
    }

    /// Class annotations are done: settle whether to instrument, and emit the marker
    fn finish_annotations(&mut self) -> Result<(), Error> {
        if self.phase != Phase::Annotations {
            return Ok(());
        }
        self.phase = Phase::Fields;
        let header = match &self.header {
            Some(header) => header,
            None => return Err(self.unexpected("annotations without a header")),
        };

        let mut applied = self.instrumented_by.clone();
        if let Some(metadata) = &self.metadata {
            for strategy in &metadata.instrumented_by {
                if !applied.contains(strategy) {
                    applied.push(strategy.clone());
                }
            }
        }
        let name = self.probe.name();
        let preprocessed = applied.iter().any(|applied| applied == PreprocessProbe.name());

        self.instrument = if !is_instrumentable_class(header.access_flags, &header.name) {
            log::debug!("{}: not instrumentable", header.name.java_name());
            false
        } else if applied.iter().any(|applied| applied == name) {
            log::debug!("{}: already instrumented by {}", header.name.java_name(), name);
            false
        } else if self.settings.instrument_preprocessed_only && !preprocessed {
            log::debug!("{}: not preprocessed, skipping", header.name.java_name());
            false
        } else {
            log::debug!("{}: instrumenting with {}", header.name.java_name(), name);
            true
        };

        if self.instrument {
            applied.push(String::from(name));
        }
        if !applied.is_empty() {
            let values = applied.into_iter().map(AnnotationValue::String).collect();
            let marker = Annotation::new(BinaryName::INJECTED_TRACE, false)
                .with("value", AnnotationValue::Array(values));
            self.next.visit_annotation(marker)?;
        }
        Ok(())
    }

    /// Fields are done: settle the trace holder and build the class context
    fn finish_fields(&mut self) -> Result<(), Error> {
        self.finish_annotations()?;
        if self.phase != Phase::Fields {
            return Ok(());
        }
        self.phase = Phase::Methods;
        if !self.instrument {
            return Ok(());
        }
        let header = match &self.header {
            Some(header) => header.clone(),
            None => return Err(self.unexpected("fields without a header")),
        };

        let trace_holder = match self.probe.trace_holder() {
            None => None,
            Some(wanted) => Some(self.settle_trace_holder(wanted)?),
        };

        let info = match (self.metadata.take(), self.observed.take()) {
            (Some(metadata), _) => metadata,
            (None, Some(observed)) => Arc::new(observed),
            (None, None) => Arc::new(ClassInfo::new(header.name.clone())),
        };
        let trace_exception_throw =
            self.settings.trace_exception_throw || info.trace_options.trace_exception_throw;
        let trace_exception_handling =
            self.settings.trace_exception_handling || info.trace_options.trace_exception_handling;
        self.context = Some(ClassContext {
            name: header.name,
            super_name: header.super_name,
            version: header.version,
            info,
            trace_holder,
            trace_exception_throw,
            trace_exception_handling,
            emit_frames: self.settings.regenerate_frames && header.version.requires_stack_maps(),
        });
        Ok(())
    }

    /// Reuse a static field of the holder's type, or declare one
    fn settle_trace_holder(&mut self, wanted: TraceHolder) -> Result<TraceHolder, Error> {
        let existing = self.fields.iter().find(|field| {
            field.access_flags.contains(FieldAccessFlags::STATIC)
                && field.descriptor == wanted.descriptor
        });
        if let Some(field) = existing {
            log::debug!(
                "{}: reusing {} as trace holder",
                self.class_name()?.java_name(),
                field.name
            );
            return Ok(TraceHolder {
                name: field.name.clone(),
                descriptor: field.descriptor.clone(),
            });
        }

        self.next.visit_field(FieldDecl {
            access_flags: FieldAccessFlags::TRACE_HOLDER,
            name: wanted.name.clone(),
            descriptor: wanted.descriptor.clone(),
        })?;
        self.holder_needs_init = true;
        Ok(wanted)
    }

    /// Empty static initializer for classes that need the holder initialized but have none
    fn synthesize_static_initializer(&mut self) -> Result<(), Error> {
        let decl = MethodDecl {
            access_flags: MethodAccessFlags::STATIC,
            name: UnqualifiedName::CLINIT,
            descriptor: MethodDescriptor {
                parameters: vec![],
                return_type: None,
            },
            exceptions: vec![],
        };
        let mut method = self.visit_method(decl)?;
        method.visit(MethodEvent::Code)?;
        method.visit(MethodEvent::Branch(BranchInstruction::Return))?;
        method.visit(MethodEvent::Maxs {
            max_stack: 0,
            max_locals: 0,
        })?;
        method.visit(MethodEvent::End)
    }
}

impl<'a> ClassVisitor for ClassAdapter<'a> {
    fn visit_header(&mut self, header: ClassHeader) -> Result<(), Error> {
        if self.phase != Phase::Header {
            return Err(self.unexpected("second header"));
        }
        self.phase = Phase::Annotations;
        if self.metadata.is_none() {
            self.observed = Some(ClassInfo::new(header.name.clone()));
        }
        self.header = Some(header.clone());
        self.next.visit_header(header)
    }

    fn visit_annotation(&mut self, annotation: Annotation) -> Result<(), Error> {
        if self.phase != Phase::Annotations {
            return Err(self.unexpected("annotation"));
        }
        if let Some(observed) = &mut self.observed {
            observed.observe_annotation(&annotation);
        }
        if annotation.type_name == BinaryName::INJECTED_TRACE {
            for strategy in annotation.strings("value") {
                if !self.instrumented_by.contains(&strategy) {
                    self.instrumented_by.push(strategy);
                }
            }
            return Ok(());
        }
        self.next.visit_annotation(annotation)
    }

    fn visit_field(&mut self, field: FieldDecl) -> Result<(), Error> {
        self.finish_annotations()?;
        if self.phase != Phase::Fields {
            return Err(self.unexpected("field"));
        }
        self.fields.push(field.clone());
        self.next.visit_field(field)
    }

    fn visit_method<'s>(
        &'s mut self,
        method: MethodDecl,
    ) -> Result<Box<dyn MethodVisitor + 's>, Error> {
        self.finish_fields()?;
        if self.phase != Phase::Methods {
            return Err(self.unexpected("method"));
        }
        if method.is_static_initializer() {
            self.saw_static_initializer = true;
        }

        let context = match &self.context {
            Some(context)
                if is_instrumentable_method(
                    method.access_flags,
                    &method.name,
                    &method.descriptor,
                ) =>
            {
                context
            }
            _ => return self.next.visit_method(method),
        };

        let (info, info_from_metadata) = match context.info.method(&method.name, &method.descriptor)
        {
            Some(info) => (info.clone(), true),
            None => (MethodInfo::new(&method), false),
        };
        let initialize_holder = method.is_static_initializer() && self.holder_needs_init;
        let downstream = self.next.visit_method(method.clone())?;
        Ok(Box::new(MethodAdapter::new(
            downstream,
            self.probe,
            &mut self.modified,
            context,
            method,
            info,
            info_from_metadata,
            initialize_holder,
        )))
    }

    fn visit_end(&mut self) -> Result<(), Error> {
        self.finish_fields()?;
        if self.phase != Phase::Methods {
            return Err(self.unexpected("end"));
        }
        if self.instrument && self.holder_needs_init && !self.saw_static_initializer {
            log::debug!(
                "{}: adding a static initializer for the trace holder",
                self.class_name()?.java_name()
            );
            self.synthesize_static_initializer()?;
        }
        self.phase = Phase::Done;
        self.next.visit_end()
    }
}
