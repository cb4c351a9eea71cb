//! In-memory package catalog.
//!
//! Maps package name to its record. Records are inserted once by the package
//! source loader and shared read-only afterwards.

use dashmap::DashMap;
use spn_core::error::SpnError;
use spn_core::types::PackageRecord;
use std::sync::Arc;

use crate::ResolverResult;

/// Package name -> record
#[derive(Debug, Default)]
pub struct Catalog {
    packages: DashMap<String, Arc<PackageRecord>>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record, replacing any earlier record with the same name
    pub fn insert(&self, record: PackageRecord) -> Arc<PackageRecord> {
        let record = Arc::new(record);
        self.packages.insert(record.name.clone(), record.clone());
        record
    }

    pub fn get(&self, name: &str) -> Option<Arc<PackageRecord>> {
        self.packages.get(name).map(|entry| entry.value().clone())
    }

    /// Look up a record, failing if no source provides it
    pub fn require(&self, name: &str) -> ResolverResult<Arc<PackageRecord>> {
        self.get(name).ok_or_else(|| SpnError::PackageNotFound {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// All package names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.packages.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl FromIterator<PackageRecord> for Catalog {
    fn from_iter<I: IntoIterator<Item = PackageRecord>>(iter: I) -> Self {
        let catalog = Catalog::new();
        for record in iter {
            catalog.insert(record);
        }
        catalog
    }
}
