//! Charm-style CLI prompts for project creation using cliclack

use crate::cache::{CacheStore, Preferences};
use crate::config::catalog::{FrameworkTemplates, TemplateCatalog};
use crate::config::root::InstallRoot;
use crate::detect::{detect_project, ProjectInfo};
use crate::product::ProductConfig;
use crate::runtime::check::Language;
use crate::runtime::git::{init_repository, GitInit};
use crate::runtime::package_manager::{CommandInstaller, PackageManager};
use crate::templates::fetcher::{TemplateFetcher, TemplateSource};
use crate::templates::{create_project, validate_project_name, version, ProjectRequest};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::warn;

/// CLI arguments for the create command
#[derive(Debug, Clone, Default)]
pub struct CreateArgs {
    /// Project name (also the directory name)
    pub name: Option<String>,

    /// Framework id from the template catalog
    pub framework: Option<String>,

    /// Template name within the framework
    pub template: Option<String>,

    /// Language to generate the project in
    pub language: Option<String>,

    /// Directory the project folder is created in
    pub directory: Option<PathBuf>,

    /// Skip dependency installation
    pub skip_install: bool,

    /// Skip git initialisation
    pub skip_git: bool,

    /// Auto-confirm all prompts (non-interactive mode)
    pub yes: bool,
}

/// Run the create wizard
pub async fn run_create<C: ProductConfig>(
    config: &C,
    root: &InstallRoot,
    catalog: &TemplateCatalog,
    cache: Option<&CacheStore>,
    args: CreateArgs,
    cli_version: &str,
) -> Result<()> {
    cliclack::intro(format!("{} - create a project", config.display_name()))?;

    if catalog.frameworks.is_empty() {
        anyhow::bail!(
            "No templates found in {}",
            root.template_catalog_path().display()
        );
    }

    let preferences = cache.map(CacheStore::preferences).unwrap_or_default();

    // Step 1: Project name
    let name = select_name(&args)?;

    // Step 2: Framework and template
    let (framework_id, framework) = select_framework(catalog, &args, &preferences)?;
    let template = select_template(framework_id, framework, &args)?;

    if let Some(min) = &framework.min_cli_version {
        if let Some(warning) =
            version::check_compatibility(cli_version, min, config.upgrade_command())
        {
            cliclack::log::warning(format!(
                "Version warning: {}",
                warning.lines().next().unwrap_or(&warning)
            ))?;
        }
    }

    // Step 3: Language
    let language = select_language(framework_id, framework, &args, &preferences)?;

    // Step 4: Create project
    let parent_dir = match &args.directory {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let mut fetcher = setup_fetcher(config, root)?;

    let spinner = cliclack::spinner();
    spinner.start("Creating project...");
    let created = match create_project(
        &mut fetcher,
        catalog,
        &ProjectRequest {
            name: &name,
            framework: framework_id,
            template: &template,
            language,
            parent_dir: &parent_dir,
        },
    )
    .await
    {
        Ok(created) => created,
        Err(e) => {
            spinner.stop("Failed to create project");
            return Err(e);
        }
    };
    spinner.stop(format!(
        "Created {} files in {}",
        created.files.len(),
        created.dir.display()
    ));

    let info = detect_project(&created.dir).with_overrides(
        &created.dir,
        Some(framework_id),
        Some(language),
    );
    let package_manager = preferences
        .package_manager
        .filter(|pm| language.is_node() == is_node_manager(*pm))
        .unwrap_or(info.package_manager);

    // Step 5: Dependencies
    if !args.skip_install {
        install_dependencies(&created.dir, package_manager, &args).await?;
    }

    // Step 6: Git
    if !args.skip_git {
        init_git(&created.dir, config, &args).await?;
    }

    if let Some(cache) = cache {
        cache.record_project(&created.dir, &info);
        cache.set_preferences(Preferences {
            framework: Some(framework_id.to_string()),
            language: Some(language),
            package_manager: Some(package_manager),
        });
        if let Err(e) = cache.save() {
            warn!("failed to save cache: {:#}", e);
        }
    }

    print_next_steps(config, &created.dir, &info)?;

    Ok(())
}

fn is_node_manager(manager: PackageManager) -> bool {
    matches!(
        manager,
        PackageManager::Npm | PackageManager::Pnpm | PackageManager::Yarn | PackageManager::Bun
    )
}

fn setup_fetcher<C: ProductConfig>(config: &C, root: &InstallRoot) -> Result<TemplateFetcher> {
    let fetcher = TemplateFetcher::from_config(config, root)?;
    match fetcher.source() {
        TemplateSource::Remote(url) => {
            cliclack::log::info(format!("Using remote templates from {}", url))?
        }
        TemplateSource::Local(path) => {
            cliclack::log::info(format!("Using local templates from {}", path.display()))?
        }
    }
    Ok(fetcher)
}

fn select_name(args: &CreateArgs) -> Result<String> {
    if let Some(name) = &args.name {
        validate_project_name(name)?;
        cliclack::log::info(format!("Project name: {}", name))?;
        return Ok(name.trim().to_string());
    }

    if args.yes {
        return Ok("my-app".to_string());
    }

    let name: String = cliclack::input("Project name")
        .placeholder("my-app")
        .default_input("my-app")
        .validate(|input: &String| validate_project_name(input).map_err(|e| e.to_string()))
        .interact()?;

    Ok(name.trim().to_string())
}

fn select_framework<'a>(
    catalog: &'a TemplateCatalog,
    args: &CreateArgs,
    preferences: &Preferences,
) -> Result<(&'a str, &'a FrameworkTemplates)> {
    let lookup = move |id: &str| -> Result<(&'a str, &'a FrameworkTemplates)> {
        let (id, framework) = catalog
            .frameworks
            .get_key_value(id)
            .ok_or_else(|| crate::error::InstallerError::UnknownFramework {
                name: id.to_string(),
                available: catalog.frameworks.keys().cloned().collect(),
            })?;
        Ok((id.as_str(), framework))
    };

    if let Some(framework) = &args.framework {
        return lookup(framework);
    }

    let remembered = preferences
        .framework
        .as_deref()
        .filter(|id| catalog.frameworks.contains_key(*id));

    if args.yes || catalog.frameworks.len() == 1 {
        let id = remembered
            .or_else(|| catalog.frameworks.keys().next().map(String::as_str))
            .unwrap_or_default();
        let (id, framework) = lookup(id)?;
        cliclack::log::info(format!("Using framework: {}", framework.label(id)))?;
        return Ok((id, framework));
    }

    let mut select = cliclack::select("Select a framework");
    for (id, framework) in &catalog.frameworks {
        select = select.item(id.as_str(), framework.label(id), &framework.description);
    }
    if let Some(id) = remembered {
        select = select.initial_value(id);
    }

    let selected: &str = select.interact()?;
    lookup(selected)
}

fn select_template(
    framework_id: &str,
    framework: &FrameworkTemplates,
    args: &CreateArgs,
) -> Result<String> {
    if let Some(template) = &args.template {
        return Ok(framework.template(template)?.to_string());
    }

    match framework.templates.as_slice() {
        [] => anyhow::bail!(
            "No templates available for {}",
            framework.label(framework_id)
        ),
        [only] => {
            cliclack::log::info(format!("Using template: {}", only))?;
            Ok(only.clone())
        }
        [first, ..] if args.yes => {
            cliclack::log::info(format!("Using template: {}", first))?;
            Ok(first.clone())
        }
        templates => {
            let mut select = cliclack::select("Select a template");
            for template in templates {
                select = select.item(template.clone(), template, "");
            }
            Ok(select.interact()?)
        }
    }
}

fn select_language(
    framework_id: &str,
    framework: &FrameworkTemplates,
    args: &CreateArgs,
    preferences: &Preferences,
) -> Result<Language> {
    let available: Vec<Language> = framework
        .languages
        .iter()
        .filter_map(|l| Language::parse(l))
        .collect();

    if let Some(lang) = &args.language {
        let language = Language::parse(lang)
            .ok_or_else(|| anyhow::anyhow!("Unknown language: {}", lang))?;
        if !available.is_empty() && !available.contains(&language) {
            anyhow::bail!(
                "{} templates are not available in {}",
                framework.label(framework_id),
                language.display_name()
            );
        }
        return Ok(language);
    }

    let remembered = preferences.language.filter(|l| available.contains(l));

    let language = match available.as_slice() {
        [] => Language::TypeScript,
        [only] => *only,
        [first, ..] if args.yes => remembered.unwrap_or(*first),
        languages => {
            let mut select = cliclack::select("Select a language");
            for lang in languages {
                select = select.item(*lang, lang.display_name(), "");
            }
            if let Some(lang) = remembered {
                select = select.initial_value(lang);
            }
            select.interact()?
        }
    };

    cliclack::log::success(format!("Project language: {}", language.display_name()))?;
    Ok(language)
}

async fn install_dependencies(
    dir: &Path,
    manager: PackageManager,
    args: &CreateArgs,
) -> Result<()> {
    let confirm = args.yes
        || cliclack::confirm(format!("Install dependencies with {}?", manager))
            .initial_value(true)
            .interact()?;
    if !confirm {
        return Ok(());
    }

    if !ensure_package_manager(manager, args.yes)? {
        return Ok(());
    }

    let spinner = cliclack::spinner();
    spinner.start(format!("Installing dependencies with {}...", manager));
    match CommandInstaller::new(manager, dir).install_all().await {
        Ok(_) => spinner.stop("Dependencies installed"),
        Err(e) => {
            spinner.stop("Dependency installation failed");
            cliclack::log::warning(format!("{:#}", e))?;
            cliclack::log::info(format!(
                "Run it yourself: cd {} && {} {}",
                dir.display(),
                manager.binary(),
                manager.install_all_args().join(" ")
            ))?;
        }
    }

    Ok(())
}

/// Make sure the package manager can be run; returns false to skip installing
pub(crate) fn ensure_package_manager(manager: PackageManager, yes: bool) -> Result<bool> {
    let info = manager.check();
    if info.available {
        return Ok(true);
    }

    cliclack::log::warning(format!("{} is not installed", manager))?;

    // In non-interactive mode, just skip
    if yes {
        cliclack::log::info(format!("Skipping installation ({} not found)", manager))?;
        return Ok(false);
    }

    let docs = format!("Open documentation ({})", manager.docs_url());
    let action: &str = cliclack::select("What would you like to do?")
        .item("docs", docs, "")
        .item("skip", "Skip installing dependencies", "")
        .interact()?;

    if action == "docs" {
        if let Err(e) = open::that(manager.docs_url()) {
            cliclack::log::warning(format!("Could not open browser: {}", e))?;
        }
    }
    Ok(false)
}

async fn init_git<C: ProductConfig>(dir: &Path, config: &C, args: &CreateArgs) -> Result<()> {
    let confirm = args.yes
        || cliclack::confirm("Initialize a git repository?")
            .initial_value(true)
            .interact()?;
    if !confirm {
        return Ok(());
    }

    let message = format!("Initial commit from {}", config.name());
    match init_repository(dir, &message).await {
        Ok(GitInit::Initialized) => cliclack::log::success("Initialized git repository")?,
        Ok(GitInit::AlreadyRepository) => cliclack::log::info("Already a git repository")?,
        Ok(GitInit::GitUnavailable) => {
            cliclack::log::warning("git is not installed, skipping repository setup")?
        }
        Err(e) => cliclack::log::warning(format!("Git setup failed: {:#}", e))?,
    }
    Ok(())
}

fn print_next_steps<C: ProductConfig>(config: &C, dir: &Path, info: &ProjectInfo) -> Result<()> {
    let steps = config.next_steps(dir, info);

    println!();
    println!("  Next steps");
    println!();

    for (i, step) in steps.iter().enumerate() {
        println!("  {}.  {}", i + 1, step);
    }

    cliclack::outro("Happy coding!")?;

    Ok(())
}
