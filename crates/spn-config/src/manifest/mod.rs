//! spn.toml project manifest parsing and editing

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use spn_core::error::SpnError;
use spn_core::types::{BuildKind, DependencyRequest, OptionSet, Version, VersionRange};
use toml_edit::{value, DocumentMut, Item, Table};

use crate::ConfigResult;

/// File name of the project manifest
pub const MANIFEST_FILE: &str = "spn.toml";

/// Complete spn.toml configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpnToml {
    /// Package metadata section
    pub package: PackageSection,

    /// Direct dependencies, in declaration order
    #[serde(default)]
    pub dependencies: IndexMap<String, DependencySpec>,
}

/// Package metadata section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSection {
    /// Package name (required)
    pub name: String,

    /// Package version (required)
    pub version: Version,

    /// Extra package source directories, relative to the manifest
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

/// Dependency specification (range string or detailed table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Range text such as `^1.2`
    Simple(String),

    /// Detailed dependency specification
    Detailed {
        /// Range text
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,

        /// Local package directory
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,

        /// Build kind override
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<BuildKind>,

        /// Option overrides
        #[serde(default, skip_serializing_if = "OptionSet::is_empty")]
        options: OptionSet,
    },
}

impl DependencySpec {
    /// Convert to a dependency request, parsing the range text
    pub fn to_request(&self, name: &str) -> ConfigResult<DependencyRequest> {
        match self {
            DependencySpec::Simple(range) => {
                Ok(DependencyRequest::package(name, VersionRange::parse(range)?))
            },
            DependencySpec::Detailed {
                version,
                path,
                kind,
                options,
            } => {
                let mut request = match (version, path) {
                    (Some(range), None) => DependencyRequest::package(name, VersionRange::parse(range)?),
                    (None, Some(path)) => DependencyRequest::path(name, path.clone()),
                    (None, None) => {
                        return Err(SpnError::ConfigValidation {
                            field: format!("dependencies.{}", name),
                            reason: "must specify either `version` or `path`".to_string(),
                        })
                    },
                    (Some(_), Some(_)) => {
                        return Err(SpnError::ConfigValidation {
                            field: format!("dependencies.{}", name),
                            reason: "cannot specify both `version` and `path`".to_string(),
                        })
                    },
                };
                request.build_kind = *kind;
                request.options = options.clone();
                Ok(request)
            },
        }
    }

    /// Check if this is a path dependency
    pub fn is_path(&self) -> bool {
        matches!(self, DependencySpec::Detailed { path: Some(_), .. })
    }
}

impl SpnToml {
    /// A fresh manifest for `spn init`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            package: PackageSection {
                name: name.into(),
                version: Version::new(0, 1, 0),
                sources: Vec::new(),
            },
            dependencies: IndexMap::new(),
        }
    }

    /// Direct dependency requests in declaration order
    pub fn requests(&self) -> ConfigResult<Vec<DependencyRequest>> {
        self.dependencies
            .iter()
            .map(|(name, spec)| spec.to_request(name))
            .collect()
    }

    pub fn dependency_names(&self) -> Vec<String> {
        self.dependencies.keys().cloned().collect()
    }
}

/// Parse TOML text into a validated manifest; `file` names the source in errors
pub fn parse_spn_toml(content: &str, file: &str) -> ConfigResult<SpnToml> {
    // toml_edit first for syntax errors with locations
    content
        .parse::<DocumentMut>()
        .map_err(|e| SpnError::TomlParse {
            file: file.to_string(),
            message: e.to_string(),
        })?;

    let config: SpnToml = toml::from_str(content).map_err(|e| SpnError::TomlParse {
        file: file.to_string(),
        message: e.to_string(),
    })?;

    validate_config(&config)?;
    Ok(config)
}

/// Serialize a manifest to TOML text
pub fn serialize_spn_toml(config: &SpnToml) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| SpnError::TomlParse {
        file: MANIFEST_FILE.to_string(),
        message: e.to_string(),
    })
}

/// Validate names and every dependency specification
pub fn validate_config(config: &SpnToml) -> ConfigResult<()> {
    if !is_valid_package_name(&config.package.name) {
        return Err(SpnError::ConfigValidation {
            field: "package.name".to_string(),
            reason: format!(
                "'{}' must start with a letter or digit and contain only letters, digits, '-', '_' or '.'",
                config.package.name
            ),
        });
    }

    for (name, spec) in &config.dependencies {
        if !is_valid_package_name(name) {
            return Err(SpnError::ConfigValidation {
                field: format!("dependencies.{}", name),
                reason: "invalid package name".to_string(),
            });
        }
        if name == &config.package.name {
            return Err(SpnError::CircularDependency { package: name.clone() });
        }
        spec.to_request(name)?;
    }

    Ok(())
}

/// Load and parse spn.toml from a file path
pub async fn load_from_file(path: &camino::Utf8Path) -> ConfigResult<SpnToml> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SpnError::io(format!("Failed to read {}", path), e))?;

    parse_spn_toml(&content, path.as_str())
}

/// Add or replace a dependency in manifest text, keeping its formatting
pub fn add_dependency(content: &str, name: &str, range_text: &str) -> ConfigResult<String> {
    if !is_valid_package_name(name) {
        return Err(SpnError::ConfigValidation {
            field: format!("dependencies.{}", name),
            reason: "invalid package name".to_string(),
        });
    }
    VersionRange::parse(range_text)?;

    let mut document = content.parse::<DocumentMut>().map_err(|e| SpnError::TomlParse {
        file: MANIFEST_FILE.to_string(),
        message: e.to_string(),
    })?;

    let dependencies = document
        .entry("dependencies")
        .or_insert(Item::Table(Table::new()))
        .as_table_mut()
        .ok_or_else(|| SpnError::ConfigValidation {
            field: "dependencies".to_string(),
            reason: "must be a table".to_string(),
        })?;
    dependencies.insert(name, value(range_text));

    Ok(document.to_string())
}

/// Package names: ASCII letters, digits, '-', '_' and '.', starting alphanumeric
fn is_valid_package_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {},
        _ => return false,
    }
    name.len() <= 128 && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spn_core::types::{DependencyKind, OptionValue};

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
[package]
name = "app"
version = "0.1.0"
"#;

        let config = parse_spn_toml(toml, "spn.toml").unwrap();
        assert_eq!(config.package.name, "app");
        assert_eq!(config.package.version, Version::new(0, 1, 0));
        assert!(config.dependencies.is_empty());
        assert!(config.package.sources.is_empty());
    }

    #[test]
    fn test_parse_with_dependencies_keeps_order() {
        let toml = r#"
[package]
name = "app"
version = "1.0.0"
sources = ["./index"]

[dependencies]
zlib = "^1.2"
png = { version = "~1.6", kind = "shared", options = { simd = true, level = 3 } }
mylib = { path = "../mylib" }
"#;

        let config = parse_spn_toml(toml, "spn.toml").unwrap();
        assert_eq!(config.dependency_names(), vec!["zlib", "png", "mylib"]);
        assert_eq!(config.package.sources, vec!["./index".to_string()]);

        let requests = config.requests().unwrap();
        assert_eq!(requests[0].requirement_text(), "^1.2");

        assert_eq!(requests[1].build_kind, Some(BuildKind::Shared));
        assert_eq!(requests[1].options.get("simd"), Some(&OptionValue::Bool(true)));
        assert_eq!(requests[1].options.get("level"), Some(&OptionValue::Int(3)));

        assert_eq!(requests[2].kind(), DependencyKind::Path);
        assert!(config.dependencies["mylib"].is_path());
    }

    #[test]
    fn test_bad_range_is_fatal() {
        let toml = r#"
[package]
name = "app"
version = "1.0.0"

[dependencies]
zlib = "latest"
"#;
        let err = parse_spn_toml(toml, "spn.toml").unwrap_err();
        assert!(matches!(err, SpnError::RangeParse { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_package_version() {
        let toml = r#"
[package]
name = "app"
version = "one"
"#;
        assert!(matches!(
            parse_spn_toml(toml, "spn.toml"),
            Err(SpnError::TomlParse { .. })
        ));
    }

    #[test]
    fn test_detailed_needs_one_source() {
        let toml = r#"
[package]
name = "app"
version = "1.0.0"

[dependencies]
zlib = { kind = "static" }
"#;
        assert!(matches!(
            parse_spn_toml(toml, "spn.toml"),
            Err(SpnError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_self_dependency_rejected() {
        let toml = r#"
[package]
name = "app"
version = "1.0.0"

[dependencies]
app = "*"
"#;
        assert!(matches!(
            parse_spn_toml(toml, "spn.toml"),
            Err(SpnError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_new_manifest_serializes() {
        let text = serialize_spn_toml(&SpnToml::new("hello")).unwrap();
        let reparsed = parse_spn_toml(&text, "spn.toml").unwrap();
        assert_eq!(reparsed, SpnToml::new("hello"));
    }

    #[test]
    fn test_add_dependency_preserves_comments() {
        let original = r#"# my project
[package]
name = "app"
version = "1.0.0"
"#;
        let updated = add_dependency(original, "zlib", "^1.3").unwrap();
        assert!(updated.starts_with("# my project"));

        let config = parse_spn_toml(&updated, "spn.toml").unwrap();
        assert_eq!(
            config.dependencies.get("zlib"),
            Some(&DependencySpec::Simple("^1.3".to_string()))
        );

        assert!(add_dependency(original, "zlib", "newest").is_err());
    }

    #[test]
    fn test_valid_package_names() {
        assert!(is_valid_package_name("zlib"));
        assert!(is_valid_package_name("lib-png_1.6"));
        assert!(!is_valid_package_name(""));
        assert!(!is_valid_package_name("-zlib"));
        assert!(!is_valid_package_name("has space"));
    }
}
