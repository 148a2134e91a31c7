//! Thin wrappers over the `git` command line: clone, log, blame.
//!
//! Everything degrades: a missing git binary or a non-zero exit yields
//! `None` or an empty vector, never an error.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;
use uuid::Uuid;

pub struct GitIntegration {
    git_cmd: String,
    repos_dir: PathBuf,
}

/// One commit parsed from `git log` delimited output.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommitInfo {
    pub hash: String,
    pub author: String,
    pub date: String,
    pub message: String,
}

/// One line attribution parsed from `git blame --line-porcelain`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BlameLine {
    pub commit: String,
    pub author: String,
    pub time: String,
    pub content: String,
}

impl Default for GitIntegration {
    fn default() -> Self {
        Self::new("git", std::env::temp_dir().join("bugtrackd_repos"))
    }
}

impl GitIntegration {
    pub fn new(git_cmd: impl Into<String>, repos_dir: PathBuf) -> Self {
        if let Err(e) = std::fs::create_dir_all(&repos_dir) {
            tracing::warn!(error = %e, "Could not create clone scratch directory");
        }
        Self {
            git_cmd: git_cmd.into(),
            repos_dir,
        }
    }

    /// Clone a repository into a fresh scratch directory, returning its path.
    /// The directory is removed again when the clone fails.
    pub fn clone_repository(&self, repo_url: &str) -> Option<PathBuf> {
        let repo_dir = self.repos_dir.join(Uuid::new_v4().to_string());

        let output = Command::new(&self.git_cmd)
            .arg("clone")
            .arg(repo_url)
            .arg(&repo_dir)
            .output();

        match output {
            Ok(out) if out.status.success() => Some(repo_dir),
            Ok(out) => {
                tracing::warn!(
                    url = repo_url,
                    stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                    "Error cloning repository"
                );
                let _ = std::fs::remove_dir_all(&repo_dir);
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Git command not found");
                let _ = std::fs::remove_dir_all(&repo_dir);
                None
            }
        }
    }

    /// Commit history for a repository, optionally restricted to one file.
    pub fn commit_history(&self, repo_path: &Path, file_path: Option<&Path>) -> Vec<CommitInfo> {
        let mut command = Command::new(&self.git_cmd);
        command
            .current_dir(repo_path)
            .args(["log", "--pretty=format:%H|%an|%ad|%s", "--date=iso"]);
        if let Some(file_path) = file_path {
            command.arg(file_path);
        }

        match command.output() {
            Ok(out) if out.status.success() => {
                parse_commit_log(&String::from_utf8_lossy(&out.stdout))
            }
            _ => Vec::new(),
        }
    }

    /// Per-line blame for a file in a repository.
    pub fn file_blame(&self, repo_path: &Path, file_path: &Path) -> Vec<BlameLine> {
        let output = Command::new(&self.git_cmd)
            .current_dir(repo_path)
            .args(["blame", "--line-porcelain"])
            .arg(file_path)
            .output();

        match output {
            Ok(out) if out.status.success() => {
                parse_blame_porcelain(&String::from_utf8_lossy(&out.stdout))
            }
            _ => Vec::new(),
        }
    }
}

fn parse_commit_log(output: &str) -> Vec<CommitInfo> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.splitn(4, '|').collect();
            if parts.len() != 4 {
                return None;
            }
            Some(CommitInfo {
                hash: parts[0].to_string(),
                author: parts[1].to_string(),
                date: parts[2].to_string(),
                message: parts[3].to_string(),
            })
        })
        .collect()
}

fn parse_blame_porcelain(output: &str) -> Vec<BlameLine> {
    let mut blame = Vec::new();
    let mut current_commit: Option<String> = None;
    let mut author = String::new();
    let mut author_time = String::new();

    for line in output.lines() {
        if let Some(rest) = line.strip_prefix("author ") {
            author = rest.to_string();
        } else if let Some(rest) = line.strip_prefix("author-time ") {
            author_time = rest.to_string();
        } else if let Some(content) = line.strip_prefix('\t') {
            if let Some(commit) = &current_commit {
                blame.push(BlameLine {
                    commit: commit.clone(),
                    author: author.clone(),
                    time: author_time.clone(),
                    content: content.to_string(),
                });
            }
        } else if line.contains(' ') {
            let commit = line.split(' ').next().unwrap_or("");
            current_commit = Some(commit.to_string());
        }
    }
    blame
}
