//! The loaded project every dependency command works against.

use camino::Utf8PathBuf;
use tracing::{debug, info};

use spn_build::{BuildPlan, LockTarget};
use spn_config::{
    load_catalog, ConfigLayering, ConfigLoader, LockFile, LockHeader, SpnConfig, SpnToml, LOCK_FILE,
};
use spn_core::error::{SpnError, SpnResult};
use spn_core::types::DependencyRequest;
use spn_resolver::{lock_covers, Catalog, DependencyGraph, Resolution, Resolver};

use super::{suggest_similar, CommandContext};

/// How to arrive at a resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveMode {
    /// Use spn.lock when it covers every declared dependency
    Locked,
    /// Ignore spn.lock entirely
    Fresh,
    /// Ignore spn.lock for one package, pin everything else
    Update(String),
}

/// Manifest, settings and catalog for the enclosing project
pub struct Project {
    pub manifest: SpnToml,
    pub dir: Utf8PathBuf,
    pub config: SpnConfig,
    pub requests: Vec<DependencyRequest>,
    pub catalog: Catalog,
}

impl Project {
    /// Find spn.toml from the context's directory upwards and load everything
    pub async fn load(ctx: &CommandContext) -> SpnResult<Self> {
        let loader = ConfigLoader::new(ctx.cwd.clone());
        let (manifest, dir) = loader.load_project().await?;
        let sources = manifest.package.sources.iter().map(|source| dir.join(source)).collect();
        let config = load_settings(ctx, sources).await?;
        let requests = manifest.requests()?;
        let catalog = load_catalog(&config.sources, &dir, &requests).await?;

        debug!("Loaded {} with {} catalog packages", manifest.package.name, catalog.len());
        Ok(Self {
            manifest,
            dir,
            config,
            requests,
            catalog,
        })
    }

    pub fn name(&self) -> &str {
        &self.manifest.package.name
    }

    pub fn lock_path(&self) -> Utf8PathBuf {
        self.dir.join(LOCK_FILE)
    }

    pub fn read_lock(&self) -> SpnResult<Option<LockFile>> {
        LockFile::read(&self.lock_path())
    }

    /// Resolve the manifest's dependencies
    pub fn resolve(&self, mode: &ResolveMode) -> SpnResult<Resolution> {
        let lock = match mode {
            ResolveMode::Fresh => None,
            ResolveMode::Locked | ResolveMode::Update(_) => self.read_lock()?,
        };
        let names = self.manifest.dependency_names();

        match (mode, lock) {
            (ResolveMode::Locked, Some(lock)) if lock_covers(&lock.packages, &names) => {
                info!("Using {}", LOCK_FILE);
                Resolution::from_lock(self.name(), names, &lock.packages)
            },
            (ResolveMode::Update(package), lock) => {
                self.require(package)?;
                let resolver = match lock {
                    Some(lock) => Resolver::new(&self.catalog).pin_locked(&lock.packages, package),
                    None => Resolver::new(&self.catalog),
                };
                resolver.resolve(self.name(), &self.requests)
            },
            _ => Resolver::new(&self.catalog).resolve(self.name(), &self.requests),
        }
    }

    /// Build contexts for a resolution, rooted in the configured cache
    pub fn plan(&self, resolution: &Resolution) -> SpnResult<BuildPlan> {
        BuildPlan::new(resolution, &self.catalog, &self.requests, &self.config.cache())
    }

    /// What the coordinator persists after a fully successful build
    pub fn lock_target(&self, graph: &DependencyGraph) -> LockTarget {
        LockTarget {
            path: self.lock_path(),
            header: lock_header(),
            entries: graph.lock_entries(),
        }
    }

    /// Catalog lookup that suggests a close name on a miss
    pub fn require(&self, package: &str) -> SpnResult<()> {
        if self.catalog.contains(package) {
            return Ok(());
        }
        let names = self.catalog.names();
        if let Some(similar) = suggest_similar(package, names.iter().map(String::as_str)) {
            info!("'{}' is not in any package source; did you mean '{}'?", package, similar);
        }
        Err(SpnError::PackageNotFound {
            name: package.to_string(),
        })
    }
}

/// Layered settings: global file, environment, then flags; project sources first
pub async fn load_settings(ctx: &CommandContext, project_sources: Vec<Utf8PathBuf>) -> SpnResult<SpnConfig> {
    let global = ConfigLoader::load_global_config(&ConfigLoader::global_config_path()?).await?;
    ConfigLayering::merge_configs(
        &ctx.cwd,
        global,
        project_sources,
        &ConfigLayering::collect_env_overrides(),
        &ctx.overrides,
    )
}

/// Header identifying the tool build that wrote a lock
pub fn lock_header() -> LockHeader {
    LockHeader {
        spn_version: env!("CARGO_PKG_VERSION").to_string(),
        spn_build: env!("SPN_BUILD").to_string(),
    }
}
