//! Build and package hooks.
//!
//! A package may ship a shell recipe defining `build` and/or `package`
//! functions. `ScriptHooks` sources the recipe in `sh` and calls the entry
//! point with the dependency's paths and options exported as `SPN_*`
//! variables; output goes to the dependency's log. Packages without a recipe
//! get `NoHooks`, and both phases are skipped.

use std::fs::File;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::debug;

use spn_core::error::SpnError;
use spn_core::types::{BuildKind, OptionSet, PackageRecord, Version};

use crate::context::DependencyPaths;
use crate::BuildResult;

/// File the recipe is written to inside the work directory
const RECIPE_COPY: &str = "recipe.sh";

/// What a hook gets to see of the dependency it runs for
pub struct HookContext<'a> {
    pub name: &'a str,
    pub version: Version,
    pub kind: BuildKind,
    pub options: &'a OptionSet,
    pub paths: &'a DependencyPaths,
    /// Open log stream; hook output is appended here
    pub log: &'a File,
}

/// Capability interface over however a package's hooks are executed
pub trait BuildHooks: Send + Sync {
    fn has_build(&self) -> bool;
    fn run_build(&self, ctx: &HookContext<'_>) -> BuildResult<()>;
    fn has_package(&self) -> bool;
    fn run_package(&self, ctx: &HookContext<'_>) -> BuildResult<()>;
}

/// Hooks for packages without a recipe
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl BuildHooks for NoHooks {
    fn has_build(&self) -> bool {
        false
    }

    fn run_build(&self, _ctx: &HookContext<'_>) -> BuildResult<()> {
        Ok(())
    }

    fn has_package(&self) -> bool {
        false
    }

    fn run_package(&self, _ctx: &HookContext<'_>) -> BuildResult<()> {
        Ok(())
    }
}

/// Hooks backed by a shell recipe
#[derive(Debug, Clone)]
pub struct ScriptHooks {
    recipe: String,
    has_build: bool,
    has_package: bool,
}

impl ScriptHooks {
    pub fn new(recipe: impl Into<String>) -> Self {
        let recipe = recipe.into();
        Self {
            has_build: defines_function(&recipe, "build"),
            has_package: defines_function(&recipe, "package"),
            recipe,
        }
    }

    /// Hooks for a catalog record: its recipe if it has one, otherwise none
    pub fn for_record(record: &PackageRecord) -> Arc<dyn BuildHooks> {
        match &record.recipe {
            Some(recipe) => Arc::new(ScriptHooks::new(recipe.clone())),
            None => Arc::new(NoHooks),
        }
    }

    fn invoke(&self, entry: &str, ctx: &HookContext<'_>) -> BuildResult<()> {
        let paths = ctx.paths;
        let recipe_path = paths.work.join(RECIPE_COPY);
        std::fs::write(&recipe_path, &self.recipe)
            .map_err(|e| SpnError::hook(entry, ctx.name, format!("cannot write recipe: {}", e)))?;

        let stdout = ctx.log.try_clone();
        let stderr = ctx.log.try_clone();
        let (stdout, stderr) = match (stdout, stderr) {
            (Ok(out), Ok(err)) => (out, err),
            (Err(e), _) | (_, Err(e)) => {
                return Err(SpnError::hook(entry, ctx.name, format!("cannot redirect output: {}", e)))
            },
        };

        let mut command = Command::new("sh");
        command
            .args(["-c", ". \"$1\" && \"$2\"", "spn-recipe", recipe_path.as_str(), entry])
            .current_dir(&paths.source)
            .env("SPN_NAME", ctx.name)
            .env("SPN_VERSION", ctx.version.to_string())
            .env("SPN_KIND", ctx.kind.to_string())
            .env("SPN_SOURCE_DIR", &paths.source)
            .env("SPN_WORK_DIR", &paths.work)
            .env("SPN_STORE_DIR", &paths.store)
            .env("SPN_INCLUDE_DIR", &paths.include)
            .env("SPN_LIB_DIR", &paths.lib)
            .env("SPN_VENDOR_DIR", &paths.vendor)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);
        for (name, value) in ctx.options {
            command.env(option_variable(name), value.to_string());
        }

        debug!("Running {} hook for {}", entry, ctx.name);
        let status = command
            .status()
            .map_err(|e| SpnError::hook(entry, ctx.name, format!("could not start sh: {}", e)))?;
        if !status.success() {
            return Err(SpnError::hook(
                entry,
                ctx.name,
                format!("{}; see {}", status, paths.log),
            ));
        }
        Ok(())
    }
}

impl BuildHooks for ScriptHooks {
    fn has_build(&self) -> bool {
        self.has_build
    }

    fn run_build(&self, ctx: &HookContext<'_>) -> BuildResult<()> {
        self.invoke("build", ctx)
    }

    fn has_package(&self) -> bool {
        self.has_package
    }

    fn run_package(&self, ctx: &HookContext<'_>) -> BuildResult<()> {
        self.invoke("package", ctx)
    }
}

/// `SPN_OPT_<NAME>` with non-alphanumerics mapped to `_`
fn option_variable(name: &str) -> String {
    let suffix: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("SPN_OPT_{}", suffix)
}

/// Whether the recipe defines `name` as a shell function
fn defines_function(recipe: &str, name: &str) -> bool {
    recipe.lines().any(|line| {
        let line = line.trim_start();
        let (keyword, line) = match line.strip_prefix("function ") {
            Some(rest) => (true, rest.trim_start()),
            None => (false, line),
        };
        match line.strip_prefix(name).map(str::trim_start) {
            Some(rest) => rest.starts_with("()") || (keyword && rest.starts_with('{')),
            None => false,
        }
    })
}
