//! Git repository initialisation for freshly created projects

use crate::runtime::check::check_git;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::process::Command as TokioCommand;
use tracing::debug;

/// What `init_repository` ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitInit {
    Initialized,
    AlreadyRepository,
    GitUnavailable,
}

/// Initialise a repository and record an initial commit.
///
/// Existing repositories are left alone, and a missing git binary is not an
/// error: the project is still usable without version control.
pub async fn init_repository(dir: &Path, message: &str) -> Result<GitInit> {
    if dir.join(".git").exists() {
        return Ok(GitInit::AlreadyRepository);
    }
    if !check_git().available {
        return Ok(GitInit::GitUnavailable);
    }

    run_git(dir, &["init"]).await?;
    run_git(dir, &["add", "."]).await?;
    run_git(dir, &["commit", "-m", message]).await?;

    Ok(GitInit::Initialized)
}

async fn run_git(dir: &Path, args: &[&str]) -> Result<()> {
    debug!(dir = %dir.display(), "git {}", args.join(" "));

    let output = TokioCommand::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .with_context(|| format!("Failed to run git {}", args.join(" ")))?;

    if !output.status.success() {
        anyhow::bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(())
}
