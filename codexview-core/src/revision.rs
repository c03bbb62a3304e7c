//! Synthetic revision history for captured uploads.
//!
//! Each snapshot becomes one commit in a throwaway git repository; the
//! rendered `git show` output of every commit is the diff against the previous
//! upload. The repository lives in a [`tempfile::TempDir`] that is removed when
//! the build returns, successfully or not.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tempfile::TempDir;
use thiserror::Error;
use tracing::debug;

use crate::model::{DiffEntry, UploadSnapshot};

const CODE_FILE: &str = "code.c";
const FLAGS_FILE: &str = "flags.txt";
const AUTHOR_NAME: &str = "RunCodeLogger";
const AUTHOR_EMAIL: &str = "run-code@example.com";
// 2024-01-01T00:00:00Z; commit N is dated N seconds later.
const BASE_COMMIT_EPOCH: u64 = 1_704_067_200;

#[derive(Debug, Error)]
pub enum RevisionBuildError {
    #[error("failed to prepare working area {path}: {source}")]
    WorkingArea {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("history has {commits} commits for {snapshots} uploads")]
    HistoryMismatch { commits: usize, snapshots: usize },
}

/// Turns ordered upload snapshots into one labelled diff per snapshot.
pub trait HistoryBuilder: Send + Sync {
    fn build_history(
        &self,
        snapshots: &[UploadSnapshot],
    ) -> Result<Vec<DiffEntry>, RevisionBuildError>;
}

#[derive(Debug, Clone)]
pub struct GitHistoryBuilder {
    program: PathBuf,
}

impl GitHistoryBuilder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GitHistoryBuilder {
    fn default() -> Self {
        Self::new("git")
    }
}

impl HistoryBuilder for GitHistoryBuilder {
    fn build_history(
        &self,
        snapshots: &[UploadSnapshot],
    ) -> Result<Vec<DiffEntry>, RevisionBuildError> {
        if snapshots.is_empty() {
            return Ok(Vec::new());
        }

        let scratch = TempDir::new().map_err(|source| RevisionBuildError::WorkingArea {
            path: std::env::temp_dir(),
            source,
        })?;
        let repo = GitRepo::create(&self.program, scratch.path())?;

        repo.run(&["init", "-q"])?;
        for snapshot in snapshots {
            repo.write_file(CODE_FILE, &snapshot.code)?;
            repo.write_file(FLAGS_FILE, &snapshot.flags)?;
            repo.run(&["add", CODE_FILE, FLAGS_FILE])?;
            repo.commit(snapshot)?;
        }

        let revs = repo.run(&["rev-list", "--reverse", "HEAD"])?;
        let revs = revs
            .lines()
            .map(str::trim)
            .filter(|rev| !rev.is_empty())
            .collect::<Vec<_>>();
        if revs.len() != snapshots.len() {
            return Err(RevisionBuildError::HistoryMismatch {
                commits: revs.len(),
                snapshots: snapshots.len(),
            });
        }

        let mut diffs = Vec::with_capacity(snapshots.len());
        for (rev, snapshot) in revs.into_iter().zip(snapshots) {
            let short = repo.run(&["rev-parse", "--short", rev])?;
            let diff = repo.run(&["show", "--no-color", "--stat", "--patch", rev])?;
            diffs.push(DiffEntry {
                label: format!("{} · upload {}", short.trim(), snapshot.index),
                diff,
            });
        }

        debug!(uploads = snapshots.len(), "built upload history");
        Ok(diffs)
    }
}

struct GitRepo<'a> {
    program: &'a Path,
    home: PathBuf,
    worktree: PathBuf,
}

impl<'a> GitRepo<'a> {
    fn create(program: &'a Path, scratch: &Path) -> Result<Self, RevisionBuildError> {
        let home = scratch.join("home");
        let worktree = scratch.join("repo");
        for dir in [&home, &worktree] {
            fs::create_dir_all(dir).map_err(|source| RevisionBuildError::WorkingArea {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(Self {
            program,
            home,
            worktree,
        })
    }

    fn write_file(&self, name: &str, contents: &str) -> Result<(), RevisionBuildError> {
        let path = self.worktree.join(name);
        fs::write(&path, contents).map_err(|source| RevisionBuildError::WorkingArea { path, source })
    }

    fn commit(&self, snapshot: &UploadSnapshot) -> Result<(), RevisionBuildError> {
        let message = format!("upload {}", snapshot.index);
        let date = format!("{} +0000", BASE_COMMIT_EPOCH + snapshot.index as u64);
        self.command(&["commit", "-q", "--allow-empty", "-m", &message])
            .env("GIT_AUTHOR_DATE", &date)
            .env("GIT_COMMITTER_DATE", &date)
            .output()
            .map_err(|source| RevisionBuildError::Spawn {
                command: "git commit".to_string(),
                source,
            })
            .and_then(|output| check_output("git commit", output))
            .map(drop)
    }

    fn run(&self, args: &[&str]) -> Result<String, RevisionBuildError> {
        let command = format!("git {}", args.first().copied().unwrap_or_default());
        debug!(args = ?args, "running git");
        let output = self
            .command(args)
            .output()
            .map_err(|source| RevisionBuildError::Spawn {
                command: command.clone(),
                source,
            })?;
        check_output(&command, output)
    }

    /// A git invocation isolated from the user's and the system's config.
    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(self.program);
        command
            .args(args)
            .current_dir(&self.worktree)
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .env_remove("GIT_INDEX_FILE")
            .env_remove("GIT_CONFIG_GLOBAL")
            .env("HOME", &self.home)
            .env("XDG_CONFIG_HOME", &self.home)
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("GIT_AUTHOR_NAME", AUTHOR_NAME)
            .env("GIT_AUTHOR_EMAIL", AUTHOR_EMAIL)
            .env("GIT_COMMITTER_NAME", AUTHOR_NAME)
            .env("GIT_COMMITTER_EMAIL", AUTHOR_EMAIL);
        command
    }
}

fn check_output(
    command: &str,
    output: std::process::Output,
) -> Result<String, RevisionBuildError> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(RevisionBuildError::CommandFailed {
            command: command.to_string(),
            status: output.status,
            stderr: if stderr.is_empty() {
                "git command failed".to_string()
            } else {
                stderr
            },
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
