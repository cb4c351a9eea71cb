//! Resolution from a durable lock.
//!
//! A lock is trusted verbatim: no catalog lookups and no range solving.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use spn_core::error::SpnError;
use spn_core::types::LockEntry;

use crate::{Resolution, ResolvedPackage, Resolver, ResolverResult};

/// Whether a lock can stand in for solving the given direct dependencies
pub fn lock_covers(entries: &[LockEntry], dep_names: &[String]) -> bool {
    let locked: HashSet<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();
    !entries.is_empty() && dep_names.iter().all(|name| locked.contains(name.as_str()))
}

impl Resolution {
    /// Rebuild a resolution from lock entries without consulting the catalog
    pub fn from_lock(
        root: impl Into<String>,
        root_deps: Vec<String>,
        entries: &[LockEntry],
    ) -> ResolverResult<Self> {
        let by_name: HashMap<&str, &LockEntry> =
            entries.iter().map(|entry| (entry.name.as_str(), entry)).collect();

        for dep in &root_deps {
            if !by_name.contains_key(dep.as_str()) {
                return Err(SpnError::LockMismatch {
                    reason: format!("{} is declared but not locked", dep),
                });
            }
        }

        // Entries no longer reachable from the manifest are dropped
        let mut reachable: HashSet<&str> = HashSet::new();
        let mut pending: Vec<&str> = root_deps.iter().map(String::as_str).collect();
        while let Some(name) = pending.pop() {
            let Some(entry) = by_name.get(name) else {
                continue;
            };
            if !reachable.insert(name) {
                continue;
            }
            for dep in &entry.deps {
                if !by_name.contains_key(dep.as_str()) {
                    return Err(SpnError::LockMismatch {
                        reason: format!("{} depends on {}, which is not locked", entry.name, dep),
                    });
                }
                pending.push(dep.as_str());
            }
        }

        let mut resolution = Resolution::new(root, root_deps.clone());
        for entry in entries.iter().filter(|entry| reachable.contains(entry.name.as_str())) {
            resolution.insert(ResolvedPackage {
                name: entry.name.clone(),
                version: entry.version,
                commit: entry.commit.clone(),
                deps: entry.deps.clone(),
            });
        }

        debug!("Loaded {} packages from lock", resolution.len());
        Ok(resolution)
    }
}

impl<'a> Resolver<'a> {
    /// Pin every locked package except `updating` to its locked version
    pub fn pin_locked(self, entries: &[LockEntry], updating: &str) -> Self {
        entries
            .iter()
            .filter(|entry| entry.name != updating)
            .fold(self, |resolver, entry| resolver.pin(entry.name.clone(), entry.version))
    }
}
