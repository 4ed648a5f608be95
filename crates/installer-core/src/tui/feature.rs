//! Prompts for adding a feature to an existing project

use crate::cache::CacheStore;
use crate::config::catalog::FeatureCatalog;
use crate::config::root::InstallRoot;
use crate::detect::{detect_project, ProjectInfo};
use crate::features::{
    apply_plan, list_features, plan_feature, ActionOutcome, FeatureReport, FeatureRequest,
};
use crate::runtime::check::Language;
use crate::runtime::package_manager::CommandInstaller;
use crate::tui::prompts::ensure_package_manager;
use anyhow::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// CLI arguments for the add command
#[derive(Debug, Clone, Default)]
pub struct AddArgs {
    /// Feature to add
    pub feature: Option<String>,

    /// Provider for features that offer several
    pub provider: Option<String>,

    /// Print the available features and exit
    pub list: bool,

    /// Override the detected framework
    pub framework: Option<String>,

    /// Override the detected language
    pub language: Option<String>,

    /// Project directory (defaults to the current directory)
    pub directory: Option<PathBuf>,

    /// Auto-confirm all prompts (non-interactive mode)
    pub yes: bool,
}

/// Run the add-feature wizard
pub async fn run_add(
    root: &InstallRoot,
    catalog: &FeatureCatalog,
    cache: Option<&CacheStore>,
    args: AddArgs,
) -> Result<()> {
    if args.list {
        print_feature_list(catalog);
        return Ok(());
    }

    cliclack::intro("Add a feature")?;

    let dir = match &args.directory {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    if !dir.is_dir() {
        anyhow::bail!("Project directory not found: {}", dir.display());
    }

    let info = project_info(&dir, cache, &args)?;
    let framework = match &info.framework {
        Some(framework) => framework.clone(),
        None => select_framework(catalog, &args)?,
    };
    let info = info.with_overrides(&dir, Some(&framework), None);
    cliclack::log::info(format!(
        "Project: {} ({}, {}, {})",
        info.project_name,
        framework,
        info.language.display_name(),
        info.package_manager
    ))?;

    let feature_name = select_feature(catalog, &args)?;
    let provider = select_provider(catalog, &feature_name, &args)?;

    let request = FeatureRequest {
        feature: &feature_name,
        provider: provider.as_deref(),
        framework: &framework,
        language: info.language,
        has_src_folder: info.has_src_folder,
        project_dir: &dir,
    };
    let features_dir = root.features_dir();
    let plan = plan_feature(catalog, &features_dir, &request)?;

    if plan.language_fallback {
        cliclack::log::warning(format!(
            "No JavaScript files are configured for {}; using the TypeScript templates",
            feature_name
        ))?;
    }

    let summary: Vec<String> = plan
        .files
        .iter()
        .map(|f| format!("{}: {}", f.action, display_target(&f.target, &dir)))
        .collect();
    cliclack::note(format!("{} files", plan.files.len()), summary.join("\n"))?;

    let confirm = args.yes
        || cliclack::confirm("Apply these changes?")
            .initial_value(true)
            .interact()?;
    if !confirm {
        cliclack::outro_cancel("No changes made")?;
        return Ok(());
    }

    let needs_install = plan
        .files
        .iter()
        .any(|f| f.action == crate::features::FileAction::Install);
    if needs_install {
        // Failure to run the manager is reported per file below; this only
        // offers the docs up front
        ensure_package_manager(info.package_manager, args.yes)?;
    }

    let installer = CommandInstaller::new(info.package_manager, &dir);
    let spinner = cliclack::spinner();
    spinner.start(format!("Adding {}...", feature_name));
    let report = match apply_plan(&plan, &installer).await {
        Ok(report) => report,
        Err(e) => {
            spinner.stop(format!("Failed to add {}", feature_name));
            return Err(e.into());
        }
    };
    spinner.stop(format!(
        "Added {} ({} file(s) changed)",
        feature_name,
        report.modified_count()
    ));

    render_report(&report, &dir)?;

    if let Some(cache) = cache {
        cache.record_project(&dir, &info);
        cache.record_feature(&dir, &feature_name);
        if let Err(e) = cache.save() {
            warn!("failed to save cache: {:#}", e);
        }
    }

    cliclack::outro(format!("{} is ready", feature_name))?;
    Ok(())
}

fn project_info(dir: &Path, cache: Option<&CacheStore>, args: &AddArgs) -> Result<ProjectInfo> {
    let language = match &args.language {
        Some(lang) => Some(
            Language::parse(lang).ok_or_else(|| anyhow::anyhow!("Unknown language: {}", lang))?,
        ),
        None => None,
    };

    let detected = cache
        .and_then(|c| c.project(dir))
        .unwrap_or_else(|| detect_project(dir));

    Ok(detected.with_overrides(
        dir,
        args.framework.as_deref(),
        language,
    ))
}

fn select_framework(catalog: &FeatureCatalog, args: &AddArgs) -> Result<String> {
    if args.yes {
        anyhow::bail!("Could not detect the project framework; pass --framework");
    }

    let mut frameworks: Vec<&str> = Vec::new();
    for feature in catalog.iter() {
        for framework in &feature.supported_frameworks {
            if !frameworks.contains(&framework.as_str()) {
                frameworks.push(framework);
            }
        }
    }
    if frameworks.is_empty() {
        anyhow::bail!("Could not detect the project framework");
    }

    cliclack::log::warning("Could not detect the project framework")?;
    let mut select = cliclack::select("Which framework does this project use?");
    for framework in frameworks {
        select = select.item(framework.to_string(), framework, "");
    }
    Ok(select.interact()?)
}

fn select_feature(catalog: &FeatureCatalog, args: &AddArgs) -> Result<String> {
    if let Some(feature) = &args.feature {
        return Ok(catalog.feature(feature)?.name.clone());
    }
    if args.yes {
        anyhow::bail!(
            "No feature given (available: {})",
            catalog.names().join(", ")
        );
    }

    let mut select = cliclack::select("Select a feature");
    for summary in list_features(catalog) {
        select = select.item(summary.name.clone(), &summary.name, &summary.description);
    }
    Ok(select.interact()?)
}

fn select_provider(
    catalog: &FeatureCatalog,
    feature_name: &str,
    args: &AddArgs,
) -> Result<Option<String>> {
    let feature = catalog.feature(feature_name)?;
    if args.provider.is_some() || !feature.requires_provider() || args.yes {
        // Validation of the given (or missing) provider happens while planning
        return Ok(args.provider.clone());
    }

    let mut select = cliclack::select(format!("Select a provider for {}", feature_name));
    for provider in feature.providers() {
        let frameworks = feature.frameworks_for_provider(&provider).join(", ");
        select = select.item(provider.clone(), &provider, frameworks);
    }
    Ok(Some(select.interact()?))
}

fn display_target(target: &Path, dir: &Path) -> String {
    target
        .strip_prefix(dir)
        .unwrap_or(target)
        .display()
        .to_string()
}

/// Show what happened to each file
pub fn render_report(report: &FeatureReport, dir: &Path) -> Result<()> {
    for file in &report.files {
        let line = format!(
            "{} {}",
            display_target(&file.target, dir),
            file.outcome.describe()
        );
        match &file.outcome {
            ActionOutcome::InstallFailed {
                manual_commands, ..
            } => {
                cliclack::log::warning(line)?;
                for command in manual_commands {
                    cliclack::log::remark(format!("Run manually: {}", command))?;
                }
            }
            outcome if outcome.is_warning() => cliclack::log::warning(line)?,
            outcome if outcome.modified_project() => cliclack::log::success(line)?,
            _ => cliclack::log::info(line)?,
        }
    }
    Ok(())
}

/// Print the catalog for `pi add --list`
pub fn print_feature_list(catalog: &FeatureCatalog) {
    println!("{}", "Available features".cyan().bold());
    println!();
    for summary in list_features(catalog) {
        println!("  {} {}", summary.name.green().bold(), summary.description);
        if !summary.providers.is_empty() {
            println!(
                "      {} {}",
                "providers:".dimmed(),
                summary.providers.join(", ")
            );
        }
        if !summary.frameworks.is_empty() {
            println!(
                "      {} {}",
                "frameworks:".dimmed(),
                summary.frameworks.join(", ")
            );
        }
    }
}
