use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{Embedder, Embedding, ModelConfig};
use crate::error::{EvalError, Result};

/// Model namespace key -> exact text -> vector.
type Store = BTreeMap<String, BTreeMap<String, Embedding>>;

/// Write-through, file-backed cache of embeddings in front of a provider.
///
/// Every miss calls the provider once, records the vector, and rewrites the
/// whole file before returning. `get` takes `&mut self`, so lookups and file
/// writes are serialized by the borrow checker.
pub struct EmbeddingCache {
    path: PathBuf,
    store: Store,
    provider: Box<dyn Embedder>,
    misses: usize,
}

pub struct CacheStats {
    pub path: PathBuf,
    /// (namespace, entry count), ordered by namespace.
    pub namespaces: Vec<(String, usize)>,
    pub entries: usize,
}

impl EmbeddingCache {
    /// Open the cache at `path`. A missing, empty, or unparseable file yields
    /// an empty store; the latter two log a diagnostic.
    pub fn load(path: impl Into<PathBuf>, provider: Box<dyn Embedder>) -> Self {
        let path = path.into();
        let store = read_store(&path);
        Self {
            path,
            store,
            provider,
            misses: 0,
        }
    }

    /// Return the vector for `text` under `model`, embedding and persisting it on a miss.
    pub fn get(&mut self, model: &ModelConfig, text: &str) -> Result<Embedding> {
        let key = model.key();
        if let Some(embedding) = self.store.get(&key).and_then(|ns| ns.get(text)) {
            debug!(model = %key, "cache hit");
            return Ok(embedding.clone());
        }

        debug!(model = %key, provider = self.provider.name(), "cache miss");
        let embedding = self.provider.embed(text, model)?;
        self.misses += 1;
        self.store
            .entry(key)
            .or_default()
            .insert(text.to_string(), embedding.clone());
        self.save()?;
        Ok(embedding)
    }

    /// Look up without ever calling the provider.
    pub fn peek(&self, model: &ModelConfig, text: &str) -> Option<&Embedding> {
        self.store.get(&model.key()).and_then(|ns| ns.get(text))
    }

    /// Rewrite the whole store to disk.
    pub fn save(&self) -> Result<()> {
        let io_err = |source: std::io::Error| EvalError::CacheIo {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents = serde_json::to_string_pretty(&self.store)
            .map_err(|e| io_err(std::io::Error::other(e)))?;

        // Write beside the target then rename, so a crash mid-write leaves the
        // previous file intact.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(io_err)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(e));
        }
        Ok(())
    }

    /// Number of provider calls made since this cache was loaded.
    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn stats(&self) -> CacheStats {
        let namespaces: Vec<(String, usize)> = self
            .store
            .iter()
            .map(|(k, v)| (k.clone(), v.len()))
            .collect();
        CacheStats {
            path: self.path.clone(),
            entries: namespaces.iter().map(|(_, n)| n).sum(),
            namespaces,
        }
    }
}

fn read_store(path: &Path) -> Store {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no embedding cache yet, starting empty");
            return Store::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable embedding cache, starting empty");
            return Store::new();
        }
    };
    if contents.trim().is_empty() {
        info!(path = %path.display(), "embedding cache is empty");
        return Store::new();
    }
    match serde_json::from_str::<Store>(&contents) {
        Ok(store) => {
            let entries: usize = store.values().map(|ns| ns.len()).sum();
            info!(path = %path.display(), entries, "loaded embedding cache");
            store
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt embedding cache, starting empty");
            Store::new()
        }
    }
}
