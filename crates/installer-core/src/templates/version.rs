//! Version comparison for CLI and template compatibility

use anyhow::Result;
use semver::Version;

/// Compare CLI version against the minimum a template declares.
/// Returns a warning message if the CLI is older than the template expects.
pub fn check_compatibility(
    cli_version: &str,
    min_cli_version: &str,
    upgrade_command: &str,
) -> Option<String> {
    // Unparseable versions can't be compared, skip the warning
    let cli_ver = parse_version(cli_version).ok()?;
    let required = parse_version(min_cli_version).ok()?;

    if cli_ver < required {
        Some(format!(
            "This template was designed for CLI version {} or newer.\n\
             You are running version {}.\n\
             Consider updating: {}",
            min_cli_version, cli_version, upgrade_command
        ))
    } else {
        None
    }
}

/// Parse version string, tolerating a leading `v`
pub fn parse_version(version_str: &str) -> Result<Version> {
    let cleaned = version_str.trim();
    let cleaned = cleaned.strip_prefix('v').unwrap_or(cleaned);
    Version::parse(cleaned).map_err(|e| anyhow::anyhow!("Invalid version '{}': {}", version_str, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPGRADE: &str = "npm install -g package-installer-cli@latest";

    #[test]
    fn test_cli_older_than_template() {
        let warning = check_compatibility("3.0.0", "3.2.0", UPGRADE);
        assert!(warning.is_some());
        assert!(warning.unwrap().contains("3.2.0"));
    }

    #[test]
    fn test_cli_same_or_newer() {
        assert!(check_compatibility("3.2.0", "3.2.0", UPGRADE).is_none());
        assert!(check_compatibility("3.10.0", "3.2.0", UPGRADE).is_none());
    }

    #[test]
    fn test_leading_v_is_accepted() {
        assert!(check_compatibility("v1.0.0", "v2.0.0", UPGRADE).is_some());
    }

    #[test]
    fn test_invalid_versions() {
        assert!(check_compatibility("invalid", "0.1.0", UPGRADE).is_none());
        assert!(check_compatibility("0.1.0", "latest", UPGRADE).is_none());
    }
}
