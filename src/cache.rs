//! Compiled-contract caching to avoid re-parsing identical documentation blocks
//!
//! Keyed by a SHA-256 digest of the documentation style and text. Only touched
//! at wrap time.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::ConfigError;
use crate::parser::contracts::{extract_contracts, DocContract};
use crate::parser::docstring::Style;

/// Cache of compiled documentation contracts
#[derive(Debug, Default)]
pub struct ClauseCache {
    entries: Mutex<HashMap<String, Arc<DocContract>>>,
}

impl ClauseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get cache key for a documentation block (based on content hash)
    pub fn cache_key(style: Style, doc: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(style.name().as_bytes());
        hasher.update([0u8]);
        hasher.update(doc.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Load a cached contract if available
    pub fn load(&self, key: &str) -> Option<Arc<DocContract>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    /// Save a compiled contract
    pub fn save(&self, key: String, contract: Arc<DocContract>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, contract);
    }

    /// Cached contract for `doc`, compiling and storing it on a miss.
    /// Compile errors are not cached.
    pub fn get_or_compile(&self, style: Style, doc: &str) -> Result<Arc<DocContract>, ConfigError> {
        let key = Self::cache_key(style, doc);
        if let Some(hit) = self.load(&key) {
            tracing::debug!(key = %&key[..12], "clause cache hit");
            return Ok(hit);
        }
        let contract = Arc::new(extract_contracts(doc, style.reader())?);
        self.save(key, Arc::clone(&contract));
        Ok(contract)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
