//! Version range solver.
//!
//! Walks the declared dependency graph depth-first from the root, records
//! every requester's range as a pair of indices into the candidate's sorted
//! version list, then intersects the pairs per package and picks the newest
//! version inside the intersection. A choice is never revisited: a conflict
//! fails the run instead of backtracking.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use spn_core::error::SpnError;
use spn_core::types::{DependencyRequest, PackageRecord, Requirement, Version, VersionRange};

use crate::{Catalog, ResolverResult};

/// Requester name used for constraints carried over from spn.lock
pub const LOCK_REQUESTER: &str = "spn.lock";

/// One resolved package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub name: String,
    pub version: Version,
    pub commit: String,
    /// Direct dependency names, in declaration order
    pub deps: Vec<String>,
}

/// One chosen version per package name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub root: String,
    /// The root's direct dependency names
    pub root_deps: Vec<String>,
    packages: IndexMap<String, ResolvedPackage>,
}

/// Dependency resolver over a loaded catalog
#[derive(Debug)]
pub struct Resolver<'a> {
    catalog: &'a Catalog,
    /// Extra `==` constraints applied on top of the manifest (partial update)
    pins: IndexMap<String, Version>,
}

/// A requester's range, as half-open indices into the sorted version list
#[derive(Debug, Clone)]
struct RangeContribution {
    /// First index admitted by the low bound
    low: usize,
    /// One past the last index admitted by the high bound
    high: usize,
    requester: String,
    text: String,
}

/// Working state of one resolution run
#[derive(Debug, Default)]
struct ResolutionState {
    ranges: IndexMap<String, Vec<RangeContribution>>,
    records: HashMap<String, Arc<PackageRecord>>,
    chosen: IndexMap<String, Version>,
    /// Packages on the current traversal path
    visiting: HashSet<String>,
    /// Packages whose own requests were already walked
    expanded: HashSet<String>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over the given catalog
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            pins: IndexMap::new(),
        }
    }

    /// Hold `name` at exactly `version` while solving everything else
    pub fn pin(mut self, name: impl Into<String>, version: Version) -> Self {
        self.pins.insert(name.into(), version);
        self
    }

    /// Solve the graph rooted at `root` with the given direct requests
    pub fn resolve(&self, root: &str, requests: &[DependencyRequest]) -> ResolverResult<Resolution> {
        let mut state = ResolutionState::default();

        state.visiting.insert(root.to_string());
        self.visit(root, requests, &mut state)?;
        state.visiting.remove(root);

        self.apply_pins(&mut state);
        self.choose(&mut state)?;

        let mut resolution = Resolution::new(root, unique_names(requests));
        for (name, version) in &state.chosen {
            let record = &state.records[name];
            resolution.insert(ResolvedPackage {
                name: name.clone(),
                version: *version,
                commit: record.commit_for(version).unwrap_or_default().to_string(),
                deps: unique_names(&record.dependencies),
            });
        }

        debug!("Resolved {} packages for {}", resolution.len(), root);
        Ok(resolution)
    }

    fn visit(
        &self,
        requester: &str,
        requests: &[DependencyRequest],
        state: &mut ResolutionState,
    ) -> ResolverResult<()> {
        for request in requests {
            let name = &request.name;
            if state.visiting.contains(name) {
                return Err(SpnError::CircularDependency {
                    package: name.clone(),
                });
            }

            let record = self.catalog.require(name)?;
            let contribution = contribute(&record, request, requester);
            debug!(
                "{} requests {} {} -> indices [{}, {})",
                requester, name, contribution.text, contribution.low, contribution.high
            );
            state.ranges.entry(name.clone()).or_default().push(contribution);
            state.records.insert(name.clone(), record.clone());

            if !state.expanded.insert(name.clone()) {
                continue;
            }
            state.visiting.insert(name.clone());
            self.visit(name, &record.dependencies, state)?;
            state.visiting.remove(name);
        }
        Ok(())
    }

    fn apply_pins(&self, state: &mut ResolutionState) {
        for (name, version) in &self.pins {
            let (Some(record), Some(ranges)) = (state.records.get(name), state.ranges.get_mut(name))
            else {
                continue;
            };
            let range = VersionRange::exact(*version);
            ranges.push(index_range(record.versions(), &range, LOCK_REQUESTER));
        }
    }

    fn choose(&self, state: &mut ResolutionState) -> ResolverResult<()> {
        for (name, contributions) in &state.ranges {
            let Some(first) = contributions.first() else {
                continue;
            };

            // Ties go to the contribution seen last, for attribution only.
            let mut lower = first;
            let mut upper = first;
            for contribution in contributions {
                if contribution.low >= lower.low {
                    lower = contribution;
                }
                if contribution.high <= upper.high {
                    upper = contribution;
                }
            }

            if lower.low >= upper.high {
                if std::ptr::eq(lower, upper) {
                    return Err(SpnError::NoMatchingVersion {
                        package: name.clone(),
                        range: lower.text.clone(),
                        requester: lower.requester.clone(),
                    });
                }
                return Err(SpnError::VersionConflict {
                    package: name.clone(),
                    requester: lower.requester.clone(),
                    range: lower.text.clone(),
                    conflicting_requester: upper.requester.clone(),
                    conflicting_range: upper.text.clone(),
                });
            }

            let version = state.records[name].versions()[upper.high - 1];
            debug!("Chose {} {}", name, version);
            state.chosen.insert(name.clone(), version);
        }
        Ok(())
    }
}

fn contribute(record: &PackageRecord, request: &DependencyRequest, requester: &str) -> RangeContribution {
    match &request.requirement {
        Requirement::Range(range) => index_range(record.versions(), range, requester),
        Requirement::Path(_) => RangeContribution {
            low: 0,
            high: record.versions().len(),
            requester: requester.to_string(),
            text: request.requirement_text(),
        },
    }
}

/// Low bounds admit a suffix of the sorted list and high bounds a prefix, so
/// the admitted set is the index interval between the two.
fn index_range(versions: &[Version], range: &VersionRange, requester: &str) -> RangeContribution {
    let low = versions
        .iter()
        .position(|v| range.low.admits(v))
        .unwrap_or(versions.len());
    let high = versions
        .iter()
        .rposition(|v| range.high.admits(v))
        .map_or(0, |index| index + 1);

    RangeContribution {
        low,
        high,
        requester: requester.to_string(),
        text: range.text().to_string(),
    }
}

fn unique_names(requests: &[DependencyRequest]) -> Vec<String> {
    let mut seen = HashSet::new();
    requests
        .iter()
        .filter(|request| seen.insert(request.name.as_str()))
        .map(|request| request.name.clone())
        .collect()
}

impl Resolution {
    pub fn new(root: impl Into<String>, root_deps: Vec<String>) -> Self {
        Self {
            root: root.into(),
            root_deps,
            packages: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, package: ResolvedPackage) {
        self.packages.insert(package.name.clone(), package);
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedPackage> {
        self.packages.get(name)
    }

    pub fn version_of(&self, name: &str) -> Option<Version> {
        self.packages.get(name).map(|package| package.version)
    }

    /// Resolved packages in first-encounter order
    pub fn packages(&self) -> impl Iterator<Item = &ResolvedPackage> {
        self.packages.values()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use spn_core::types::PackageSource;

    fn range_text() -> impl Strategy<Value = String> {
        (
            prop::sample::select(vec!["^", "~", ">=", ">", "<=", "<", "=="]),
            0u64..3,
            0u64..4,
        )
            .prop_map(|(op, major, minor)| format!("{}{}.{}.0", op, major, minor))
    }

    fn remote(name: &str) -> PackageRecord {
        PackageRecord::new(
            name,
            PackageSource::Remote {
                url: format!("https://example.com/{}.git", name),
            },
        )
    }

    proptest! {
        #[test]
        fn prop_choice_is_newest_version_admitted_by_every_requester(
            releases in prop::collection::btree_set((0u64..3, 0u64..4), 1..8),
            direct in range_text(),
            transitive in range_text(),
        ) {
            let mut zlib = remote("zlib");
            for (major, minor) in &releases {
                zlib.add_version(Version::new(*major, *minor, 0), format!("z{}{}", major, minor));
            }
            let direct_range = VersionRange::parse(&direct).unwrap();
            let transitive_range = VersionRange::parse(&transitive).unwrap();
            let png = remote("png")
                .with_version(Version::new(1, 6, 0), "p160")
                .with_dependency(DependencyRequest::package("zlib", transitive_range.clone()));

            let expected = zlib
                .versions()
                .iter()
                .rev()
                .find(|v| direct_range.contains(v) && transitive_range.contains(v))
                .copied();

            let catalog: Catalog = vec![zlib, png].into_iter().collect();
            let requests = [
                DependencyRequest::package("png", VersionRange::any()),
                DependencyRequest::package("zlib", direct_range),
            ];

            match Resolver::new(&catalog).resolve("app", &requests) {
                Ok(resolution) => prop_assert_eq!(resolution.version_of("zlib"), expected),
                Err(err) => {
                    prop_assert!(expected.is_none());
                    let is_unsatisfiable = matches!(
                        err,
                        SpnError::VersionConflict { .. } | SpnError::NoMatchingVersion { .. }
                    );
                    prop_assert!(is_unsatisfiable);
                },
            }
        }
    }
}
