use super::cache::{ClassIdentity, MetadataCache};
use super::class_adapter::ClassAdapter;
use super::metadata::ClassInfo;
use super::probes::{probe_strategy, ProbeStrategy};
use super::settings::Settings;
use crate::jvm::ClassNode;
use crate::Error;
use std::sync::Arc;

/// Result of instrumenting one class
#[derive(Debug)]
pub struct Instrumented {
    pub class: ClassNode,

    /// Was any probe code injected?
    ///
    /// When this is `false` the caller can keep the original class.
    pub modified: bool,
}

/// Instruments classes with one probe family
pub struct Instrumenter<'c> {
    settings: Settings,
    probe: Box<dyn ProbeStrategy>,
    cache: &'c MetadataCache,
}

impl Instrumenter<'static> {
    /// Instrumenter backed by the process-wide metadata cache
    pub fn new(settings: Settings) -> Instrumenter<'static> {
        Instrumenter::with_cache(settings, MetadataCache::global())
    }
}

impl<'c> Instrumenter<'c> {
    pub fn with_cache(settings: Settings, cache: &'c MetadataCache) -> Instrumenter<'c> {
        let probe = probe_strategy(&settings);
        Instrumenter {
            settings,
            probe,
            cache,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Rewrite a class
    ///
    /// Without `metadata`, everything about the class is recovered from its annotations. On
    /// error nothing is returned: the class must be used as it was.
    pub fn instrument(
        &self,
        class: &ClassNode,
        metadata: Option<&ClassInfo>,
    ) -> Result<Instrumented, Error> {
        self.rewrite(class, metadata.map(|info| Arc::new(info.clone())))
    }

    /// Rewrite a class, with metadata looked up in (or recorded into) the cache
    pub fn instrument_cached(
        &self,
        identity: &ClassIdentity,
        class: &ClassNode,
    ) -> Result<Instrumented, Error> {
        let info = self
            .cache
            .get_or_insert_with(identity, || ClassInfo::collect(class));
        self.rewrite(class, Some(info))
    }

    fn rewrite(
        &self,
        class: &ClassNode,
        metadata: Option<Arc<ClassInfo>>,
    ) -> Result<Instrumented, Error> {
        let mut output = ClassNode::new(class.header.clone());
        let modified = {
            let mut adapter = ClassAdapter::new(
                Box::new(&mut output),
                self.probe.as_ref(),
                &self.settings,
                metadata,
            );
            class.accept(&mut adapter)?;
            adapter.modified()
        };
        log::debug!(
            "{} instrumented with {} (modified: {})",
            class.header.name.java_name(),
            self.probe.name(),
            modified
        );
        Ok(Instrumented {
            class: output,
            modified,
        })
    }
}
