//! Build plans: one context per resolved dependency.

use std::collections::HashMap;
use tracing::debug;

use spn_config::CacheLayout;
use spn_core::types::{DependencyRequest, LibraryConfig};
use spn_resolver::{Catalog, Resolution};

use crate::context::DependencyBuildContext;
use crate::hooks::ScriptHooks;
use crate::BuildResult;

/// Build contexts for a resolution, plus what consumers need to link them
pub struct BuildPlan {
    contexts: Vec<DependencyBuildContext>,
    libraries: HashMap<String, LibraryConfig>,
}

impl BuildPlan {
    /// Create a context per resolved package.
    ///
    /// Build kind and options come from the package's defaults overridden by
    /// the root manifest's request, or else by the first resolved package that
    /// requests it.
    pub fn new(
        resolution: &Resolution,
        catalog: &Catalog,
        root_requests: &[DependencyRequest],
        cache: &CacheLayout,
    ) -> BuildResult<Self> {
        let mut contexts = Vec::with_capacity(resolution.len());
        let mut libraries = HashMap::new();

        for package in resolution.packages() {
            let record = catalog.require(&package.name)?;
            let request = find_request(resolution, catalog, root_requests, &package.name);
            let (kind, options) = record.effective_build(request.as_ref());

            let ctx = DependencyBuildContext::new(
                cache,
                package.name.clone(),
                package.version,
                package.commit.clone(),
                record.source.clone(),
                kind,
                options,
                ScriptHooks::for_record(&record),
            );
            debug!("Planned {} {} as {}", ctx.name, ctx.version, ctx.build_id);

            libraries.insert(package.name.clone(), record.lib.clone());
            contexts.push(ctx);
        }

        Ok(Self {
            contexts,
            libraries,
        })
    }

    pub fn contexts(&self) -> &[DependencyBuildContext] {
        &self.contexts
    }

    pub fn into_contexts(self) -> Vec<DependencyBuildContext> {
        self.contexts
    }

    pub fn get(&self, name: &str) -> Option<&DependencyBuildContext> {
        self.contexts.iter().find(|ctx| ctx.name == name)
    }

    /// Consumer compiler and linker flags; `link_order` lists dependents first
    pub fn compiler_flags(&self, link_order: &[String]) -> Vec<String> {
        let mut flags = Vec::new();

        for ctx in &self.contexts {
            flags.push(format!("-I{}", ctx.paths.include));
            if let Some(lib) = self.libraries.get(&ctx.name) {
                for extra in &lib.include {
                    flags.push(format!("-I{}", ctx.paths.include.join(extra)));
                }
            }
        }

        for name in link_order {
            let (Some(ctx), Some(lib)) = (self.get(name), self.libraries.get(name)) else {
                continue;
            };
            if !ctx.kind.links() {
                continue;
            }
            flags.push(format!("-L{}", ctx.paths.lib));
            flags.extend(lib.libs.iter().map(|lib| format!("-l{}", lib)));
        }

        flags
    }
}

fn find_request(
    resolution: &Resolution,
    catalog: &Catalog,
    root_requests: &[DependencyRequest],
    name: &str,
) -> Option<DependencyRequest> {
    if let Some(request) = root_requests.iter().find(|request| request.name == name) {
        return Some(request.clone());
    }
    resolution
        .packages()
        .filter_map(|package| catalog.get(&package.name))
        .find_map(|record| {
            record
                .dependencies
                .iter()
                .find(|request| request.name == name)
                .cloned()
        })
}
