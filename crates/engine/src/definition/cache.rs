//! Process-wide cache of deployed process definitions

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use super::process::ProcessDefinition;

/// Read-mostly registry of deployed process definitions
///
/// Definitions are immutable once deployed and handed out as
/// `Arc<ProcessDefinition>`, so every instance of a version shares the same
/// copy. The cache itself may be shared across partitions; only deployment
/// takes the write lock.
#[derive(Default)]
pub struct ProcessCache {
    inner: RwLock<CacheState>,
}

#[derive(Default)]
struct CacheState {
    versions: HashMap<(String, u32), Arc<ProcessDefinition>>,
    latest: HashMap<String, u32>,
}

impl ProcessCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a definition
    ///
    /// Re-deploying an existing `(process_id, version)` replaces it. The latest
    /// version only moves forward.
    pub fn deploy(&self, definition: ProcessDefinition) -> Arc<ProcessDefinition> {
        let definition = Arc::new(definition);
        let process_id = definition.process_id().to_string();
        let version = definition.version();

        let mut inner = self.inner.write();
        inner
            .versions
            .insert((process_id.clone(), version), Arc::clone(&definition));
        let latest = inner.latest.entry(process_id.clone()).or_insert(version);
        if *latest < version {
            *latest = version;
        }

        info!(%process_id, version, "deployed process definition");
        definition
    }

    /// Latest deployed version of a process
    pub fn latest(&self, process_id: &str) -> Option<Arc<ProcessDefinition>> {
        let inner = self.inner.read();
        let version = *inner.latest.get(process_id)?;
        inner
            .versions
            .get(&(process_id.to_string(), version))
            .cloned()
    }

    /// A specific deployed version
    pub fn get(&self, process_id: &str, version: u32) -> Option<Arc<ProcessDefinition>> {
        self.inner
            .read()
            .versions
            .get(&(process_id.to_string(), version))
            .cloned()
    }

    /// Number of deployed (process, version) pairs
    pub fn len(&self) -> usize {
        self.inner.read().versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().versions.is_empty()
    }
}

impl std::fmt::Debug for ProcessCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("ProcessCache")
            .field("latest", &inner.latest)
            .finish()
    }
}
