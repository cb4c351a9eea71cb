//! Package source indexes.
//!
//! A package source is a directory holding one `<name>/spn.toml` per package,
//! optionally next to a `<name>/build.sh` recipe. Local (path) packages use
//! the same file with a single version and are built in place.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, warn};

use spn_core::error::SpnError;
use spn_core::types::{
    DependencyRequest, LibraryConfig, PackageRecord, PackageSource, Requirement, Version,
};
use spn_resolver::Catalog;

use crate::manifest::{DependencySpec, MANIFEST_FILE};
use crate::ConfigResult;

/// File name of a package's build recipe
pub const RECIPE_FILE: &str = "build.sh";

/// A package description file as found in a package source
#[derive(Debug, Clone, Deserialize)]
pub struct IndexPackage {
    pub package: IndexPackageSection,

    #[serde(default)]
    pub versions: Vec<IndexVersion>,

    #[serde(default)]
    pub dependencies: IndexMap<String, DependencySpec>,

    #[serde(default)]
    pub lib: LibraryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexPackageSection {
    pub name: String,

    /// Remote repository; absent for local packages
    #[serde(default)]
    pub repo: Option<String>,

    /// Single version of a local package
    #[serde(default)]
    pub version: Option<Version>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexVersion {
    pub version: Version,
    #[serde(default)]
    pub commit: String,
}

impl IndexPackage {
    /// Parse a package description
    pub fn parse(content: &str, file: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| SpnError::TomlParse {
            file: file.to_string(),
            message: e.to_string(),
        })
    }

    /// Convert into a catalog record rooted at `dir`
    pub fn into_record(self, dir: &Utf8Path, local: bool) -> ConfigResult<PackageRecord> {
        let name = self.package.name;
        let invalid = |reason: &str| SpnError::ConfigValidation {
            field: format!("{}/{}", name, MANIFEST_FILE),
            reason: reason.to_string(),
        };

        let source = if local {
            PackageSource::Local {
                dir: dir.to_string(),
            }
        } else {
            let url = self
                .package
                .repo
                .clone()
                .ok_or_else(|| invalid("`package.repo` is required in a package source"))?;
            PackageSource::Remote { url }
        };

        let mut record = PackageRecord::new(name.clone(), source);

        if local {
            let version = match (self.package.version, self.versions.as_slice()) {
                (Some(version), _) => version,
                (None, [only]) => only.version,
                _ => return Err(invalid("a local package declares exactly one version")),
            };
            record.add_version(version, "");
        } else {
            if self.versions.is_empty() {
                return Err(invalid("at least one [[versions]] entry is required"));
            }
            for entry in self.versions {
                if entry.commit.is_empty() {
                    return Err(invalid(&format!("version {} has no commit", entry.version)));
                }
                record.add_version(entry.version, entry.commit);
            }
        }

        for (dep_name, spec) in &self.dependencies {
            let mut request = spec.to_request(dep_name)?;
            if let Requirement::Path(locator) = &request.requirement {
                if !local {
                    return Err(invalid(&format!(
                        "path dependency {} is only allowed in local packages",
                        dep_name
                    )));
                }
                request.requirement = Requirement::Path(dir.join(locator).to_string());
            }
            record.dependencies.push(request);
        }

        record.lib = self.lib;
        Ok(record)
    }
}

/// Load `<dir>/spn.toml` and its optional recipe as a catalog record
pub async fn load_package_file(dir: &Utf8Path, local: bool) -> ConfigResult<PackageRecord> {
    let path = dir.join(MANIFEST_FILE);
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| SpnError::io(format!("Failed to read {}", path), e))?;

    let mut record = IndexPackage::parse(&content, path.as_str())?.into_record(dir, local)?;

    let recipe = dir.join(RECIPE_FILE);
    if tokio::fs::try_exists(&recipe).await.unwrap_or(false) {
        let script = tokio::fs::read_to_string(&recipe)
            .await
            .map_err(|e| SpnError::io(format!("Failed to read {}", recipe), e))?;
        record.recipe = Some(script);
    }

    Ok(record)
}

/// Scan package sources, then load every path package reachable from `requests`.
///
/// Earlier sources take precedence over later ones for the same name; a path
/// package always replaces a source entry of the same name.
pub async fn load_catalog(
    sources: &[Utf8PathBuf],
    project_dir: &Utf8Path,
    requests: &[DependencyRequest],
) -> ConfigResult<Catalog> {
    let catalog = Catalog::new();

    for source in sources {
        let mut entries = match tokio::fs::read_dir(source).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping package source {}: {}", source, e);
                continue;
            },
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SpnError::io(format!("Failed to scan {}", source), e))?
        {
            let Ok(dir) = Utf8PathBuf::try_from(entry.path()) else {
                continue;
            };
            if !tokio::fs::try_exists(dir.join(MANIFEST_FILE)).await.unwrap_or(false) {
                continue;
            }

            let record = load_package_file(&dir, false).await?;
            if catalog.contains(&record.name) {
                debug!("{} already provided by an earlier source, ignoring {}", record.name, dir);
                continue;
            }
            catalog.insert(record);
        }
    }

    let mut pending: Vec<(String, Utf8PathBuf)> = path_requests(requests, project_dir);
    let mut loaded = std::collections::HashSet::new();
    while let Some((name, dir)) = pending.pop() {
        if !loaded.insert(name.clone()) {
            continue;
        }
        let record = load_package_file(&dir, true).await?;
        if record.name != name {
            return Err(SpnError::ConfigValidation {
                field: format!("dependencies.{}", name),
                reason: format!("{} contains package '{}'", dir, record.name),
            });
        }
        pending.extend(path_requests(&record.dependencies, &dir));
        catalog.insert(record);
    }

    debug!("Catalog holds {} packages", catalog.len());
    Ok(catalog)
}

fn path_requests(requests: &[DependencyRequest], base: &Utf8Path) -> Vec<(String, Utf8PathBuf)> {
    requests
        .iter()
        .filter_map(|request| match &request.requirement {
            Requirement::Path(locator) => Some((request.name.clone(), base.join(locator))),
            Requirement::Range(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use spn_core::types::{BuildKind, VersionRange};
    use tempfile::TempDir;

    const ZLIB: &str = r#"
[package]
name = "zlib"
repo = "https://github.com/madler/zlib.git"

[[versions]]
version = "1.2.13"
commit = "04f42ceca40f73e2978b50e93806c2a18c1281fc"

[[versions]]
version = "1.3.1"
commit = "51b7f2abdade71cd9bb0e7a373ef2610ec6f9daf"

[lib]
kind = "static"
libs = ["z"]
"#;

    const PNG: &str = r#"
[package]
name = "png"
repo = "https://github.com/glennrp/libpng.git"

[[versions]]
version = "1.6.43"
commit = "ed217e3e601d8e462f7fd1e04bed43ac42212429"

[dependencies]
zlib = "^1.2"

[lib]
libs = ["png16"]
options = { simd = false }
"#;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap()
    }

    async fn write_package(root: &Utf8Path, name: &str, manifest: &str, recipe: Option<&str>) {
        let dir = root.join(name);
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join(MANIFEST_FILE), manifest).await.unwrap();
        if let Some(recipe) = recipe {
            tokio::fs::write(dir.join(RECIPE_FILE), recipe).await.unwrap();
        }
    }

    #[test]
    fn test_parse_remote_package() {
        let record = IndexPackage::parse(ZLIB, "zlib/spn.toml")
            .unwrap()
            .into_record(Utf8Path::new("/index/zlib"), false)
            .unwrap();

        assert_eq!(record.versions().len(), 2);
        assert_eq!(record.latest(), Some(&Version::new(1, 3, 1)));
        assert_eq!(
            record.commit_for(&Version::new(1, 2, 13)),
            Some("04f42ceca40f73e2978b50e93806c2a18c1281fc")
        );
        assert_eq!(record.lib.kind, BuildKind::Static);
        assert_eq!(record.lib.libs, vec!["z".to_string()]);
        assert_eq!(record.source.locator(), "https://github.com/madler/zlib.git");
    }

    #[test]
    fn test_remote_package_requires_repo() {
        let text = "[package]\nname = \"x\"\n[[versions]]\nversion = \"1.0.0\"\ncommit = \"abc\"\n";
        let err = IndexPackage::parse(text, "x/spn.toml")
            .unwrap()
            .into_record(Utf8Path::new("/index/x"), false)
            .unwrap_err();
        assert!(matches!(err, SpnError::ConfigValidation { .. }));
    }

    #[test]
    fn test_bad_version_text_is_parse_error() {
        let text = "[package]\nname = \"x\"\nrepo = \"r\"\n[[versions]]\nversion = \"1.x\"\ncommit = \"abc\"\n";
        assert!(matches!(
            IndexPackage::parse(text, "x/spn.toml"),
            Err(SpnError::TomlParse { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_catalog_from_source() {
        let index = TempDir::new().unwrap();
        let root = utf8(&index);
        write_package(&root, "zlib", ZLIB, None).await;
        write_package(&root, "png", PNG, Some("build() { make; }\n")).await;

        let requests = [DependencyRequest::package("png", VersionRange::parse("^1").unwrap())];
        let catalog = load_catalog(&[root.clone()], &root, &requests).await.unwrap();

        assert_eq!(catalog.names(), vec!["png".to_string(), "zlib".to_string()]);
        let png = catalog.get("png").unwrap();
        assert_eq!(png.dependencies[0].name, "zlib");
        assert!(png.recipe.as_deref().unwrap().contains("make"));
        assert!(catalog.get("zlib").unwrap().recipe.is_none());
    }

    #[tokio::test]
    async fn test_first_source_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write_package(&utf8(&first), "zlib", ZLIB, None).await;
        let newer = ZLIB.replace("1.3.1", "1.4.0");
        write_package(&utf8(&second), "zlib", &newer, None).await;

        let catalog = load_catalog(&[utf8(&first), utf8(&second)], &utf8(&first), &[])
            .await
            .unwrap();
        assert_eq!(catalog.get("zlib").unwrap().latest(), Some(&Version::new(1, 3, 1)));
    }

    #[tokio::test]
    async fn test_missing_source_is_skipped() {
        let project = TempDir::new().unwrap();
        let catalog = load_catalog(&[utf8(&project).join("nope")], &utf8(&project), &[])
            .await
            .unwrap();
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_path_packages_load_transitively() {
        let project = TempDir::new().unwrap();
        let root = utf8(&project);
        write_package(
            &root,
            "mylib",
            "[package]\nname = \"mylib\"\nversion = \"0.3.0\"\n[dependencies]\nhelper = { path = \"../helper\" }\n",
            None,
        )
        .await;
        write_package(&root, "helper", "[package]\nname = \"helper\"\nversion = \"0.1.0\"\n", None).await;

        let requests = [DependencyRequest::path("mylib", "mylib")];
        let catalog = load_catalog(&[], &root, &requests).await.unwrap();

        let mylib = catalog.get("mylib").unwrap();
        assert!(mylib.is_local());
        assert_eq!(mylib.versions(), &[Version::new(0, 3, 0)]);
        assert_eq!(catalog.get("helper").unwrap().versions(), &[Version::new(0, 1, 0)]);
    }

    #[tokio::test]
    async fn test_path_package_name_mismatch() {
        let project = TempDir::new().unwrap();
        let root = utf8(&project);
        write_package(&root, "mylib", "[package]\nname = \"other\"\nversion = \"0.3.0\"\n", None).await;

        let requests = [DependencyRequest::path("mylib", "mylib")];
        assert!(matches!(
            load_catalog(&[], &root, &requests).await,
            Err(SpnError::ConfigValidation { .. })
        ));
    }
}
