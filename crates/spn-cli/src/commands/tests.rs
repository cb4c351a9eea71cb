//! Unit tests for CLI commands.

use super::project::{Project, ResolveMode};
use super::*;
use crate::output::OutputHandler;
use spn_config::{LockFile, LOCK_FILE, MANIFEST_FILE};
use spn_core::types::{LockEntry, Version};
use tempfile::TempDir;

const ZLIB: &str = r#"
[package]
name = "zlib"
repo = "https://github.com/madler/zlib.git"

[[versions]]
version = "1.2.13"
commit = "04f42ceca40f73e2978b50e93806c2a18c1281fc"

[[versions]]
version = "1.3.0"
commit = "09155eaa2f9270dc4ed1fa13e2b4b2613e6e4851"

[[versions]]
version = "1.3.1"
commit = "51b7f2abdade71cd9bb0e7a373ef2610ec6f9daf"

[lib]
libs = ["z"]
"#;

const PNG: &str = r#"
[package]
name = "png"
repo = "https://github.com/glennrp/libpng.git"

[[versions]]
version = "1.6.40"
commit = "f135775ad4e5d4408d2e12ffcc71bb36e6b48551"

[[versions]]
version = "1.6.43"
commit = "ed217e3e601d8e462f7fd1e04bed43ac42212429"

[dependencies]
zlib = "~1.3"

[lib]
libs = ["png16"]
"#;

const APP_HEADER: &str = "[package]\nname = \"app\"\nversion = \"0.1.0\"\nsources = [\"index\"]\n";

/// A project directory `app/` with a package source `app/index/`
struct TestProject {
    _temp: TempDir,
    dir: Utf8PathBuf,
    ctx: CommandContext,
}

impl TestProject {
    fn new(dependencies: &str) -> Self {
        let temp = tempfile::tempdir().expect("Failed to create temp directory");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        let dir = root.join("app");

        for (name, manifest) in [("zlib", ZLIB), ("png", PNG)] {
            let package = dir.join("index").join(name);
            std::fs::create_dir_all(&package).unwrap();
            std::fs::write(package.join(MANIFEST_FILE), manifest).unwrap();
        }
        let manifest = format!("{}\n[dependencies]\n{}", APP_HEADER, dependencies);
        std::fs::write(dir.join(MANIFEST_FILE), manifest).unwrap();

        let ctx = create_test_context(dir.clone(), root.join("cache"));
        Self {
            _temp: temp,
            dir,
            ctx,
        }
    }

    fn manifest(&self) -> String {
        std::fs::read_to_string(self.dir.join(MANIFEST_FILE)).unwrap()
    }

    /// A local package under `app/<name>` with an optional recipe
    fn local_package(&self, name: &str, recipe: Option<&str>) {
        let package = self.dir.join(name);
        std::fs::create_dir_all(&package).unwrap();
        std::fs::write(
            package.join(MANIFEST_FILE),
            format!("[package]\nname = \"{}\"\nversion = \"0.2.0\"\n\n[lib]\nkind = \"none\"\n", name),
        )
        .unwrap();
        if let Some(recipe) = recipe {
            std::fs::write(package.join(spn_config::RECIPE_FILE), recipe).unwrap();
        }
    }

    fn write_lock(&self, entries: Vec<LockEntry>) {
        LockFile::new(project::lock_header(), entries)
            .write(&self.dir.join(LOCK_FILE))
            .unwrap();
    }
}

/// Create a test command context with a private cache
fn create_test_context(cwd: Utf8PathBuf, cache: Utf8PathBuf) -> CommandContext {
    let mut overrides = HashMap::new();
    overrides.insert("cache_dir".to_string(), cache.to_string());
    CommandContext {
        cwd,
        output: OutputHandler::plain(),
        overrides,
        cancel: CancellationToken::new(),
    }
}

fn v(text: &str) -> Version {
    Version::parse(text).unwrap()
}

#[test]
fn test_suggest_similar() {
    let names = ["zlib", "png", "freetype"];
    assert_eq!(suggest_similar("zlbi", names), Some("zlib".to_string()));
    assert_eq!(suggest_similar("pgn", names), Some("png".to_string()));
    assert_eq!(suggest_similar("freetyp", names), Some("freetype".to_string()));
    assert_eq!(suggest_similar("harfbuzz", names), None);
}

#[test]
fn test_edit_distance() {
    assert_eq!(edit_distance("", ""), 0);
    assert_eq!(edit_distance("", "abc"), 3);
    assert_eq!(edit_distance("abc", ""), 3);
    assert_eq!(edit_distance("abc", "abc"), 0);
    assert_eq!(edit_distance("abc", "ab"), 1);
    assert_eq!(edit_distance("build", "buld"), 1);
}

#[test]
fn test_human_size() {
    assert_eq!(cache::human_size(0), "0 B");
    assert_eq!(cache::human_size(1023), "1023 B");
    assert_eq!(cache::human_size(1536), "1.5 KiB");
    assert_eq!(cache::human_size(3 * 1024 * 1024), "3.0 MiB");
}

#[tokio::test]
async fn test_init_creates_manifest_once() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
    let cwd = root.join("demo-app");
    std::fs::create_dir_all(&cwd).unwrap();
    let ctx = create_test_context(cwd.clone(), root.join("cache"));

    init::execute(None, &ctx).await.unwrap();
    let path = cwd.join(MANIFEST_FILE);
    let content = std::fs::read_to_string(&path).unwrap();
    let manifest = spn_config::manifest::parse_spn_toml(&content, path.as_str()).unwrap();
    assert_eq!(manifest.package.name, "demo-app");
    assert!(manifest.dependencies.is_empty());

    std::fs::write(&path, "# edited\n").unwrap();
    init::execute(Some("other".to_string()), &ctx).await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "# edited\n");
}

#[tokio::test]
async fn test_init_rejects_invalid_name() {
    let temp = tempfile::tempdir().unwrap();
    let cwd = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
    let ctx = create_test_context(cwd.clone(), cwd.join("cache"));

    let err = init::execute(Some("bad name".to_string()), &ctx).await.unwrap_err();
    assert!(matches!(err, SpnError::ConfigValidation { .. }));
    assert!(!cwd.join(MANIFEST_FILE).exists());
}

#[tokio::test]
async fn test_add_defaults_to_caret_on_newest() {
    let project = TestProject::new("");
    add::execute("zlib".to_string(), None, &project.ctx).await.unwrap();
    assert!(project.manifest().contains("zlib = \"^1.3.1\""));
}

#[tokio::test]
async fn test_add_keeps_explicit_range_and_formatting() {
    let project = TestProject::new("# image stack\n");
    add::execute("png".to_string(), Some("~1.6.40".to_string()), &project.ctx)
        .await
        .unwrap();
    let manifest = project.manifest();
    assert!(manifest.contains("# image stack"));
    assert!(manifest.contains("png = \"~1.6.40\""));
}

#[tokio::test]
async fn test_add_unknown_package_leaves_manifest() {
    let project = TestProject::new("");
    let before = project.manifest();

    let err = add::execute("zlbi".to_string(), None, &project.ctx).await.unwrap_err();
    assert!(matches!(err, SpnError::PackageNotFound { ref name } if name == "zlbi"));
    assert_eq!(project.manifest(), before);
}

#[tokio::test]
async fn test_add_unsatisfiable_range_leaves_manifest() {
    let project = TestProject::new("");
    let before = project.manifest();

    let err = add::execute("zlib".to_string(), Some(">=2.0.0".to_string()), &project.ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, SpnError::NoMatchingVersion { .. }));
    assert_eq!(project.manifest(), before);
}

#[tokio::test]
async fn test_add_conflicting_range_names_both_requesters() {
    let project = TestProject::new("png = \"*\"\n");

    let err = add::execute("zlib".to_string(), Some("~1.2".to_string()), &project.ctx)
        .await
        .unwrap_err();
    match err {
        SpnError::VersionConflict {
            package,
            requester,
            conflicting_requester,
            ..
        } => {
            assert_eq!(package, "zlib");
            let mut requesters = vec![requester, conflicting_requester];
            requesters.sort();
            assert_eq!(requesters, vec!["app".to_string(), "png".to_string()]);
        },
        other => panic!("expected a version conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn test_resolve_modes() {
    let project = TestProject::new("zlib = \"^1.2\"\n");
    project.write_lock(vec![LockEntry::new(
        "zlib",
        v("1.2.13"),
        "04f42ceca40f73e2978b50e93806c2a18c1281fc",
    )]);
    let loaded = Project::load(&project.ctx).await.unwrap();

    let locked = loaded.resolve(&ResolveMode::Locked).unwrap();
    assert_eq!(locked.version_of("zlib"), Some(v("1.2.13")));

    let fresh = loaded.resolve(&ResolveMode::Fresh).unwrap();
    assert_eq!(fresh.version_of("zlib"), Some(v("1.3.1")));
}

#[tokio::test]
async fn test_lock_not_covering_manifest_is_ignored() {
    let project = TestProject::new("zlib = \"^1.2\"\npng = \"*\"\n");
    project.write_lock(vec![LockEntry::new("zlib", v("1.2.13"), "04f42cec")]);
    let loaded = Project::load(&project.ctx).await.unwrap();

    let resolution = loaded.resolve(&ResolveMode::Locked).unwrap();
    assert_eq!(resolution.version_of("zlib"), Some(v("1.3.1")));
    assert_eq!(resolution.version_of("png"), Some(v("1.6.43")));
}

#[tokio::test]
async fn test_update_one_package_keeps_others_pinned() {
    let project = TestProject::new("png = \"*\"\n");
    let mut png = LockEntry::new("png", v("1.6.40"), "f135775a");
    png.deps = vec!["zlib".to_string()];
    project.write_lock(vec![png, LockEntry::new("zlib", v("1.3.0"), "09155eaa")]);
    let loaded = Project::load(&project.ctx).await.unwrap();

    let resolution = loaded.resolve(&ResolveMode::Update("png".to_string())).unwrap();
    assert_eq!(resolution.version_of("png"), Some(v("1.6.43")));
    assert_eq!(resolution.version_of("zlib"), Some(v("1.3.0")));

    let fresh = loaded.resolve(&ResolveMode::Fresh).unwrap();
    assert_eq!(fresh.version_of("zlib"), Some(v("1.3.1")));

    let err = loaded.resolve(&ResolveMode::Update("pgn".to_string())).unwrap_err();
    assert!(matches!(err, SpnError::PackageNotFound { .. }));
}

#[tokio::test]
async fn test_build_local_package_writes_lock() {
    let project = TestProject::new("hdr = { path = \"hdr\" }\n");
    project.local_package(
        "hdr",
        Some("package() {\n  echo '#define HDR 1' > \"$SPN_INCLUDE_DIR/hdr.h\"\n}\n"),
    );

    build::execute(false, &project.ctx).await.unwrap();

    let lock = LockFile::read(&project.dir.join(LOCK_FILE)).unwrap().unwrap();
    let hdr = lock.get("hdr").unwrap();
    assert_eq!(hdr.version, v("0.2.0"));
    assert_eq!(hdr.dependents, vec!["app".to_string()]);

    let loaded = Project::load(&project.ctx).await.unwrap();
    let resolution = loaded.resolve(&ResolveMode::Locked).unwrap();
    let plan = loaded.plan(&resolution).unwrap();
    let dep = plan.get("hdr").unwrap();
    assert!(dep.paths.include.join("hdr.h").exists());
    assert!(dep.paths.stamp.exists());

    let flags = plan.compiler_flags(&["hdr".to_string()]);
    assert_eq!(flags, vec![format!("-I{}", dep.paths.include)]);
}

#[tokio::test]
async fn test_failed_build_reports_and_keeps_lock_absent() {
    let project = TestProject::new("broken = { path = \"broken\" }\n");
    project.local_package(
        "broken",
        Some("build() {\n  echo 'cc: error: missing zconf.h' >&2\n  exit 1\n}\n"),
    );

    let err = build::execute(false, &project.ctx).await.unwrap_err();
    assert!(err.to_string().contains("1 of 1 dependencies failed"));
    assert!(!project.dir.join(LOCK_FILE).exists());
}

#[tokio::test]
async fn test_which_unknown_package() {
    let project = TestProject::new("zlib = \"^1.2\"\n");
    let err = dirs::which("zlbi".to_string(), &project.ctx).await.unwrap_err();
    assert!(matches!(err, SpnError::PackageNotFound { .. }));
}
