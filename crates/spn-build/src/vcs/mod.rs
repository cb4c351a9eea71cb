//! Source-control collaborator.
//!
//! The build machine only needs success/failure, text and counts back from
//! source control; `GitCli` provides them by shelling out to `git`.

use camino::Utf8Path;
use std::process::{Command, Stdio};
use tracing::debug;

use spn_core::error::SpnError;

use crate::BuildResult;

/// Operations the build machine needs from source control
pub trait SourceControl: Send + Sync {
    /// Clone `url` into `dest`
    fn clone_repo(&self, url: &str, dest: &Utf8Path) -> BuildResult<()>;

    /// Fetch updates into an existing working copy
    fn fetch(&self, repo: &Utf8Path) -> BuildResult<()>;

    /// Check out `commit` in the working copy
    fn checkout(&self, repo: &Utf8Path, commit: &str) -> BuildResult<()>;

    /// First line of the commit's message
    fn commit_message(&self, repo: &Utf8Path, commit: &str) -> BuildResult<String>;

    /// Currently checked-out commit id
    fn head_commit(&self, repo: &Utf8Path) -> BuildResult<String>;

    fn remote_url(&self, repo: &Utf8Path) -> BuildResult<String>;

    /// Number of commits reachable from `to` but not from `from`
    fn count_commits_between(&self, repo: &Utf8Path, from: &str, to: &str) -> BuildResult<u64>;
}

/// `SourceControl` backed by the `git` executable
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, operation: &str, repo: &str, args: &[&str]) -> BuildResult<String> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| SpnError::vcs(operation, repo, format!("could not run git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or_default().trim().to_string();
            return Err(SpnError::vcs(
                operation,
                repo,
                format!("{} ({})", detail, output.status),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl SourceControl for GitCli {
    fn clone_repo(&self, url: &str, dest: &Utf8Path) -> BuildResult<()> {
        self.run("clone", url, &["clone", "--quiet", url, dest.as_str()])
            .map(|_| ())
    }

    fn fetch(&self, repo: &Utf8Path) -> BuildResult<()> {
        self.run(
            "fetch",
            repo.as_str(),
            &["-C", repo.as_str(), "fetch", "--quiet", "--tags", "origin"],
        )
        .map(|_| ())
    }

    fn checkout(&self, repo: &Utf8Path, commit: &str) -> BuildResult<()> {
        self.run(
            "checkout",
            repo.as_str(),
            &["-C", repo.as_str(), "checkout", "--quiet", "--force", commit],
        )
        .map(|_| ())
    }

    fn commit_message(&self, repo: &Utf8Path, commit: &str) -> BuildResult<String> {
        self.run(
            "log",
            repo.as_str(),
            &["-C", repo.as_str(), "log", "-1", "--format=%s", commit],
        )
    }

    fn head_commit(&self, repo: &Utf8Path) -> BuildResult<String> {
        self.run("rev-parse", repo.as_str(), &["-C", repo.as_str(), "rev-parse", "HEAD"])
    }

    fn remote_url(&self, repo: &Utf8Path) -> BuildResult<String> {
        self.run(
            "remote",
            repo.as_str(),
            &["-C", repo.as_str(), "remote", "get-url", "origin"],
        )
    }

    fn count_commits_between(&self, repo: &Utf8Path, from: &str, to: &str) -> BuildResult<u64> {
        let range = format!("{}..{}", from, to);
        let count = self.run(
            "rev-list",
            repo.as_str(),
            &["-C", repo.as_str(), "rev-list", "--count", &range],
        )?;
        count
            .parse()
            .map_err(|_| SpnError::vcs("rev-list", repo, format!("unexpected output '{}'", count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_repo_is_vcs_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let repo = camino::Utf8PathBuf::try_from(dir.path().join("nope")).unwrap();

        let err = GitCli::new().fetch(&repo).unwrap_err();
        assert!(matches!(err, SpnError::Vcs { ref operation, .. } if operation == "fetch"));
        assert!(!err.is_fatal());
    }
}
