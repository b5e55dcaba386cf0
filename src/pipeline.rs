//! Snapshot → document build pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::PreviewCache;
use crate::config::BuildConfig;
use crate::document::{render_document, render_error_document};
use crate::error::BuildError;
use crate::resolver::{resolve_graph, select_entry, ModuleGraph};
use crate::vfs::Snapshot;

/// A successfully assembled preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub html: String,
}

pub type BuildOutcome = Result<Preview, BuildError>;

/// Resolves the module graph without assembling a document.
pub fn build_graph(
    snapshot: &Snapshot,
    entry: Option<&str>,
    config: &BuildConfig,
) -> Result<ModuleGraph, BuildError> {
    let entry = select_entry(snapshot, entry)?;
    resolve_graph(snapshot, &entry, config)
}

/// Builds one preview document from a snapshot.
pub fn build_preview(
    snapshot: &Snapshot,
    entry: Option<&str>,
    config: &BuildConfig,
) -> BuildOutcome {
    let graph = build_graph(snapshot, entry, config)?;
    info!(
        entry = %graph.entry,
        modules = graph.modules.len(),
        unresolved = graph.unresolved.len(),
        "preview built"
    );
    Ok(Preview {
        html: render_document(&graph, config),
    })
}

/// The document to show for any outcome.
pub fn render_outcome(outcome: &BuildOutcome, config: &BuildConfig) -> String {
    match outcome {
        Ok(preview) => preview.html.clone(),
        Err(err) => render_error_document(err, config),
    }
}

/// Wire form: `{ "html": ... }` or the tagged error.
pub fn outcome_to_json(outcome: &BuildOutcome) -> serde_json::Value {
    let value = match outcome {
        Ok(preview) => serde_json::to_value(preview),
        Err(err) => serde_json::to_value(err),
    };
    value.unwrap_or(serde_json::Value::Null)
}

/// Last-write-wins ordering for builds triggered in quick succession.
#[derive(Debug, Default)]
pub struct BuildSequencer {
    latest: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BuildTicket(u64);

impl BuildSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a ticket newer than every ticket issued before it.
    pub fn next_ticket(&self) -> BuildTicket {
        BuildTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// `true` while no newer ticket has been issued.
    pub fn is_current(&self, ticket: BuildTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

/// Builds previews with a fixed configuration, an optional cache and a
/// sequencer for discarding superseded results.
pub struct PreviewBuilder {
    config: BuildConfig,
    cache: Option<PreviewCache>,
    sequencer: BuildSequencer,
}

impl PreviewBuilder {
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            cache: None,
            sequencer: BuildSequencer::new(),
        }
    }

    pub fn with_cache(mut self, capacity: usize) -> Self {
        self.cache = Some(PreviewCache::new(capacity));
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn sequencer(&self) -> &BuildSequencer {
        &self.sequencer
    }

    pub fn build(&self, snapshot: &Snapshot, entry: Option<&str>) -> Arc<BuildOutcome> {
        let Some(cache) = &self.cache else {
            return Arc::new(build_preview(snapshot, entry, &self.config));
        };
        let key = PreviewCache::key(snapshot, entry, &self.config);
        if let Some(hit) = cache.get(&key) {
            return hit;
        }
        debug!(files = snapshot.file_count(), "building preview");
        cache.insert(key, build_preview(snapshot, entry, &self.config))
    }

    /// Builds and pairs the result with a ticket; callers drop results whose
    /// ticket is no longer current.
    pub fn build_sequenced(
        &self,
        snapshot: &Snapshot,
        entry: Option<&str>,
    ) -> (BuildTicket, Arc<BuildOutcome>) {
        let ticket = self.sequencer.next_ticket();
        (ticket, self.build(snapshot, entry))
    }

    /// HTML for the build outcome, whatever it is.
    pub fn render(&self, snapshot: &Snapshot, entry: Option<&str>) -> String {
        render_outcome(&self.build(snapshot, entry), &self.config)
    }
}

#[cfg(feature = "napi")]
mod native {
    use std::collections::HashMap;

    use napi_derive::napi;

    use super::{build_preview, outcome_to_json};
    use crate::config::BuildConfig;
    use crate::path::normalize_path;
    use crate::vfs::Snapshot;

    #[napi]
    pub fn build_preview_native(
        files: HashMap<String, String>,
        entry: Option<String>,
        config_json: Option<String>,
    ) -> napi::Result<serde_json::Value> {
        crate::logging::init_logging();
        let config = match config_json {
            Some(json) => BuildConfig::from_json(&json)
                .map_err(|e| napi::Error::from_reason(e.to_string()))?,
            None => BuildConfig::default(),
        };
        let snapshot =
            Snapshot::from_files(files).map_err(|e| napi::Error::from_reason(e.to_string()))?;
        let outcome = build_preview(&snapshot, entry.as_deref(), &config);
        Ok(outcome_to_json(&outcome))
    }

    #[napi]
    pub fn normalize_path_native(path: String) -> String {
        normalize_path(&path)
    }
}
