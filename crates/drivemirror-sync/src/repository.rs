//! `git` command line adapter
//!
//! Implements [`IRepositoryManager`] by running the `git` executable through
//! `tokio::process`. Terminal prompts are disabled so a repository that
//! needs credentials fails instead of blocking a download worker.

use std::path::Path;

use anyhow::{bail, Context, Result};
use drivemirror_core::ports::{IRepositoryManager, RepoRemote};
use tokio::process::Command;
use tracing::{debug, instrument};

/// Repository manager backed by the `git` executable
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    /// Uses `git` from `PATH`
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// Uses the given executable instead of `git`
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runs `git <args>` in `dir` and returns stdout
    async fn run(&self, dir: &Path, args: &[&str]) -> Result<String> {
        debug!(dir = %dir.display(), ?args, "running git");
        let output = Command::new(&self.program)
            .current_dir(dir)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| {
                format!("Failed to execute {}. Is git installed?", self.program)
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "git {} failed ({}): {}",
                args.first().copied().unwrap_or_default(),
                output.status,
                stderr.trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parses `git remote -v` output
///
/// Each remote appears once per direction:
/// `origin\thttps://example.com/repo.git (fetch)`.
pub fn parse_remotes(output: &str) -> Vec<RepoRemote> {
    let mut remotes: Vec<RepoRemote> = Vec::new();
    for line in output.lines() {
        let mut parts = line.split_whitespace();
        let (Some(name), Some(url)) = (parts.next(), parts.next()) else {
            continue;
        };
        let is_fetch = parts.next() == Some("(fetch)");

        let index = match remotes.iter().position(|r| r.name == name) {
            Some(i) => i,
            None => {
                remotes.push(RepoRemote {
                    name: name.to_string(),
                    fetch_url: None,
                });
                remotes.len() - 1
            }
        };
        if is_fetch {
            remotes[index].fetch_url = Some(url.to_string());
        }
    }
    remotes
}

#[async_trait::async_trait]
impl IRepositoryManager for GitCli {
    async fn is_repo(&self, dir: &Path) -> Result<bool> {
        if !tokio::fs::metadata(dir).await.is_ok_and(|m| m.is_dir()) {
            return Ok(false);
        }
        match self.run(dir, &["rev-parse", "--is-inside-work-tree"]).await {
            Ok(out) => Ok(out.trim() == "true"),
            Err(_) => Ok(false),
        }
    }

    async fn get_remotes(&self, dir: &Path) -> Result<Vec<RepoRemote>> {
        Ok(parse_remotes(&self.run(dir, &["remote", "-v"]).await?))
    }

    #[instrument(skip(self), fields(parent = %parent_dir.display()))]
    async fn clone_repo(&self, url: &str, dest_name: &str, parent_dir: &Path) -> Result<()> {
        self.run(parent_dir, &["clone", "--quiet", url, dest_name])
            .await?;
        Ok(())
    }

    async fn add_remote(&self, dir: &Path, name: &str, url: &str) -> Result<()> {
        self.run(dir, &["remote", "add", name, url]).await?;
        Ok(())
    }

    async fn remove_remote(&self, dir: &Path, name: &str) -> Result<()> {
        self.run(dir, &["remote", "remove", name]).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(dir = %dir.display()))]
    async fn pull(&self, dir: &Path) -> Result<()> {
        self.run(dir, &["pull", "--quiet"]).await?;
        Ok(())
    }
}
