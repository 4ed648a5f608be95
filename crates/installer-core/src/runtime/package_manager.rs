//! Package manager commands and dependency installation
//!
//! Installs are shelled out to the project's package manager with a
//! wall-clock timeout and a small fixed number of retries. Output is scraped
//! for the names of installed packages; that report is best effort only.

use crate::runtime::check::{check_tool, RuntimeInfo};
use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Timeout for a single install attempt
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Attempts made before an install is reported as failed
pub const INSTALL_ATTEMPTS: u32 = 2;

/// Delay between install attempts
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Supported package managers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Pnpm,
    Yarn,
    Bun,
    Cargo,
    Pip,
    Go,
}

impl PackageManager {
    pub fn binary(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Yarn => "yarn",
            PackageManager::Bun => "bun",
            PackageManager::Cargo => "cargo",
            PackageManager::Pip => "pip",
            PackageManager::Go => "go",
        }
    }

    pub fn parse(s: &str) -> Option<PackageManager> {
        match s.to_lowercase().as_str() {
            "npm" => Some(PackageManager::Npm),
            "pnpm" => Some(PackageManager::Pnpm),
            "yarn" => Some(PackageManager::Yarn),
            "bun" => Some(PackageManager::Bun),
            "cargo" => Some(PackageManager::Cargo),
            "pip" | "pip3" => Some(PackageManager::Pip),
            "go" => Some(PackageManager::Go),
            _ => None,
        }
    }

    /// Installation instructions shown when the tool is missing
    pub fn docs_url(&self) -> &'static str {
        match self {
            PackageManager::Npm => {
                "https://docs.npmjs.com/downloading-and-installing-node-js-and-npm"
            }
            PackageManager::Pnpm => "https://pnpm.io/installation",
            PackageManager::Yarn => "https://yarnpkg.com/getting-started/install",
            PackageManager::Bun => "https://bun.sh/docs/installation",
            PackageManager::Cargo => "https://rustup.rs",
            PackageManager::Pip => "https://pip.pypa.io/en/stable/installation/",
            PackageManager::Go => "https://go.dev/doc/install",
        }
    }

    /// Arguments (excluding the binary) that add `packages` to a project
    pub fn add_args(&self, packages: &[String], dev: bool) -> Vec<String> {
        let mut args: Vec<String> = match self {
            PackageManager::Npm => vec!["install".into()],
            PackageManager::Pnpm | PackageManager::Yarn | PackageManager::Bun => {
                vec!["add".into()]
            }
            PackageManager::Cargo => vec!["add".into()],
            PackageManager::Pip => vec!["install".into()],
            PackageManager::Go => vec!["get".into()],
        };

        if dev {
            match self {
                PackageManager::Npm | PackageManager::Pnpm | PackageManager::Yarn => {
                    args.push("-D".into())
                }
                PackageManager::Bun => args.push("-d".into()),
                PackageManager::Cargo => args.push("--dev".into()),
                // No dev/runtime split for pip or go modules
                PackageManager::Pip | PackageManager::Go => {}
            }
        }

        args.extend(packages.iter().cloned());
        args
    }

    /// Arguments that install everything the project manifest declares
    pub fn install_all_args(&self) -> Vec<String> {
        match self {
            PackageManager::Cargo => vec!["fetch".into()],
            PackageManager::Pip => vec!["install".into(), "-r".into(), "requirements.txt".into()],
            PackageManager::Go => vec!["mod".into(), "tidy".into()],
            _ => vec!["install".into()],
        }
    }

    /// Full command line, for manual fallback instructions
    pub fn add_command(&self, packages: &[String], dev: bool) -> String {
        let mut parts = vec![self.binary().to_string()];
        parts.extend(self.add_args(packages, dev));
        parts.join(" ")
    }

    pub fn check(&self) -> RuntimeInfo {
        check_tool(self.binary(), self.binary())
    }

    /// Pull package names out of install output
    pub fn scrape_installed(&self, output: &str) -> Vec<String> {
        if *self == PackageManager::Pip {
            return output
                .lines()
                .filter_map(|l| l.trim().strip_prefix("Successfully installed "))
                .flat_map(|rest| rest.split_whitespace())
                .map(|pkg| match pkg.rsplit_once('-') {
                    Some((name, _version)) => name.to_string(),
                    None => pkg.to_string(),
                })
                .collect();
        }

        match install_pattern(*self) {
            Some(re) => re
                .captures_iter(output)
                .map(|c| c[1].to_string())
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Line patterns naming each installed package, compiled once
fn install_pattern(manager: PackageManager) -> Option<&'static Regex> {
    static PATTERNS: OnceLock<Vec<(PackageManager, Regex)>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            [
                // pnpm and bun print "+ name 1.2.3" / "installed name@1.2.3"
                (PackageManager::Pnpm, r"(?m)^\+ (@?[\w./-]+) "),
                (PackageManager::Bun, r"(?m)installed (@?[\w./-]+)@"),
                (PackageManager::Npm, r"(?m)^\+ (@?[\w./-]+)@"),
                (PackageManager::Yarn, r"(?m)(?:└─|├─) (@?[\w./-]+)@"),
                (PackageManager::Cargo, r"(?m)Adding (\S+) v"),
                (PackageManager::Go, r"(?m)go: added (\S+) "),
            ]
            .into_iter()
            .map(|(manager, pattern)| {
                let re = Regex::new(pattern).expect("install output pattern is valid");
                (manager, re)
            })
            .collect()
        })
        .iter()
        .find(|(m, _)| *m == manager)
        .map(|(_, re)| re)
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binary())
    }
}

/// The seam between the `install` file action and the outside world
#[allow(async_fn_in_trait)]
pub trait DependencyInstaller {
    /// Install `packages`, returning the package names the tool reported
    async fn install(&self, packages: &[String], dev: bool) -> Result<Vec<String>>;

    /// Command the user can run by hand if `install` fails
    fn manual_command(&self, packages: &[String], dev: bool) -> String;
}

/// Installs packages by running the package manager in a project directory
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    manager: PackageManager,
    project_dir: PathBuf,
    timeout: Duration,
    attempts: u32,
    retry_delay: Duration,
}

impl CommandInstaller {
    pub fn new(manager: PackageManager, project_dir: &Path) -> Self {
        Self {
            manager,
            project_dir: project_dir.to_path_buf(),
            timeout: INSTALL_TIMEOUT,
            attempts: INSTALL_ATTEMPTS,
            retry_delay: RETRY_DELAY,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn manager(&self) -> PackageManager {
        self.manager
    }

    /// Install everything the project manifest already declares
    pub async fn install_all(&self) -> Result<String> {
        self.run_with_retries(&self.manager.install_all_args()).await
    }

    async fn run_with_retries(&self, args: &[String]) -> Result<String> {
        let mut last_error = None;

        for attempt in 1..=self.attempts {
            match self.run_once(args).await {
                Ok(stdout) => return Ok(stdout),
                Err(e) => {
                    warn!(
                        manager = %self.manager,
                        attempt,
                        "install attempt failed: {}",
                        e
                    );
                    last_error = Some(e);
                    if attempt < self.attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("install was never attempted")))
    }

    async fn run_once(&self, args: &[String]) -> Result<String> {
        debug!(
            dir = %self.project_dir.display(),
            "running {} {}",
            self.manager.binary(),
            args.join(" ")
        );

        let child = TokioCommand::new(self.manager.binary())
            .args(args)
            .current_dir(&self.project_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => anyhow::bail!(
                "{} timed out after {} seconds",
                self.manager.binary(),
                self.timeout.as_secs()
            ),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} exited with code {}: {}",
                self.manager.binary(),
                output.status.code().unwrap_or(-1),
                stderr.lines().last().unwrap_or_default()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl DependencyInstaller for CommandInstaller {
    async fn install(&self, packages: &[String], dev: bool) -> Result<Vec<String>> {
        if packages.is_empty() {
            return Ok(Vec::new());
        }
        let stdout = self
            .run_with_retries(&self.manager.add_args(packages, dev))
            .await?;
        Ok(self.manager.scrape_installed(&stdout))
    }

    fn manual_command(&self, packages: &[String], dev: bool) -> String {
        self.manager.add_command(packages, dev)
    }
}
