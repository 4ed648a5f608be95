//! pi - create projects from templates and add features to existing ones

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use installer_core::tui::{AddArgs, CreateArgs};
use installer_core::{
    detect_project, CacheStore, Catalog, InstallRoot, Language, PackageManager, ProductConfig,
    ProjectInfo,
};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// CLI version
pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package installer product configuration
#[derive(Clone)]
pub struct PiConfig;

impl ProductConfig for PiConfig {
    fn name(&self) -> &'static str {
        "pi"
    }

    fn display_name(&self) -> &'static str {
        "Package Installer"
    }

    fn package_names(&self) -> &'static [&'static str] {
        &["@0xshariq/package-installer", "package-installer-cli"]
    }

    fn root_env(&self) -> &'static str {
        "PI_ROOT"
    }

    fn template_url_env(&self) -> &'static str {
        "PI_TEMPLATE_URL"
    }

    fn cache_dir_name(&self) -> &'static str {
        "package-installer-cli"
    }

    fn docs_url(&self) -> &'static str {
        "https://github.com/0xshariq/package-installer-cli#readme"
    }

    fn upgrade_command(&self) -> &'static str {
        "npm install -g @0xshariq/package-installer@latest"
    }

    fn next_steps(&self, dir: &Path, info: &ProjectInfo) -> Vec<String> {
        let mut steps = Vec::new();
        let current = std::env::current_dir().ok();

        // Step 1: cd to directory if not current
        if current.as_deref() != Some(dir) {
            steps.push(format!("cd {}", dir.display()));
        }

        // Step 2: Start the project
        let run = match info.language {
            Language::Python => "python main.py".to_string(),
            Language::Rust => "cargo run".to_string(),
            Language::Go => "go run .".to_string(),
            Language::TypeScript | Language::JavaScript => match info.package_manager {
                PackageManager::Npm => "npm run dev".to_string(),
                pm => format!("{} dev", pm.binary()),
            },
        };
        steps.push(run);

        // Step 3: Point at features
        steps.push("pi add --list".to_string());

        steps
    }
}

#[derive(Parser, Debug)]
#[command(name = "pi")]
#[command(about = "Create projects from templates and add features to existing ones")]
#[command(version)]
pub struct Args {
    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new project from a template
    Create(CliCreateArgs),
    /// Add a feature to an existing project
    Add(CliAddArgs),
    /// Show what was detected about a project
    Detect(DetectArgs),
    /// Inspect or clear the project cache
    Cache(CacheArgs),
    /// Build zip files for all templates (for publishing remote templates)
    PackTemplates(PackTemplatesArgs),
}

#[derive(Parser, Debug)]
pub struct CliCreateArgs {
    /// Project name
    pub name: Option<String>,

    /// Framework to use (see template.json)
    #[arg(short, long)]
    pub framework: Option<String>,

    /// Template name to use
    #[arg(short, long)]
    pub template: Option<String>,

    /// Language (typescript, javascript, python, rust, go)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Directory to create the project in
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Skip installing dependencies
    #[arg(long = "skip-install")]
    pub skip_install: bool,

    /// Skip git initialisation
    #[arg(long = "skip-git")]
    pub skip_git: bool,

    /// Auto-confirm all prompts (non-interactive mode)
    #[arg(short, long)]
    pub yes: bool,
}

impl From<CliCreateArgs> for CreateArgs {
    fn from(args: CliCreateArgs) -> Self {
        CreateArgs {
            name: args.name,
            framework: args.framework,
            template: args.template,
            language: args.language,
            directory: args.directory,
            skip_install: args.skip_install,
            skip_git: args.skip_git,
            yes: args.yes,
        }
    }
}

#[derive(Parser, Debug)]
pub struct CliAddArgs {
    /// Feature to add (e.g. auth, docker)
    pub feature: Option<String>,

    /// Provider for the feature (e.g. clerk, auth0)
    pub provider: Option<String>,

    /// List available features
    #[arg(long)]
    pub list: bool,

    /// Override the detected framework
    #[arg(long)]
    pub framework: Option<String>,

    /// Override the detected language
    #[arg(long)]
    pub language: Option<String>,

    /// Project directory
    #[arg(short, long = "dir")]
    pub dir: Option<PathBuf>,

    /// Auto-confirm all prompts (non-interactive mode)
    #[arg(short, long)]
    pub yes: bool,
}

impl From<CliAddArgs> for AddArgs {
    fn from(args: CliAddArgs) -> Self {
        AddArgs {
            feature: args.feature,
            provider: args.provider,
            list: args.list,
            framework: args.framework,
            language: args.language,
            directory: args.dir,
            yes: args.yes,
        }
    }
}

#[derive(Parser, Debug)]
pub struct DetectArgs {
    /// Project directory
    #[arg(short, long = "dir")]
    pub dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show cache location and size
    Stats,
    /// Delete all cached data
    Clear,
}

#[derive(Parser, Debug)]
pub struct PackTemplatesArgs {
    /// Directory containing `<framework>/<template>` folders
    #[arg(long = "template-dir")]
    pub template_dir: Option<PathBuf>,

    /// Where to write the zips (defaults to the template directory)
    #[arg(long = "out-dir")]
    pub out_dir: Option<PathBuf>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_cache(config: &PiConfig) -> Option<CacheStore> {
    CacheStore::open_default(config.cache_dir_name())
}

fn load_catalog(config: &PiConfig) -> Result<(InstallRoot, Catalog)> {
    let root = InstallRoot::discover(config)?;
    debug!(root = %root.path().display(), "using installation root");
    let catalog = Catalog::load(&root)?;
    debug!(
        features = catalog.features.len(),
        frameworks = catalog.templates.frameworks.len(),
        "catalog loaded"
    );
    Ok((root, catalog))
}

async fn run(args: Args, config: &PiConfig) -> Result<()> {
    match args.command {
        Some(Command::Create(create_args)) => create(config, create_args.into()).await,
        None => {
            // No subcommand provided, default to create behavior (interactive mode)
            create(config, CreateArgs::default()).await
        }
        Some(Command::Add(add_args)) => {
            let (root, catalog) = load_catalog(config)?;
            let cache = open_cache(config);
            installer_core::tui::run_add(&root, &catalog.features, cache.as_ref(), add_args.into())
                .await
        }
        Some(Command::Detect(detect_args)) => {
            let dir = match detect_args.dir {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            print_detection(&dir, &detect_project(&dir));
            Ok(())
        }
        Some(Command::Cache(cache_args)) => {
            let cache = open_cache(config)
                .ok_or_else(|| anyhow::anyhow!("No cache directory available on this system"))?;
            match cache_args.action {
                CacheAction::Stats => {
                    let stats = cache.stats();
                    println!("{} {}", "Cache:".cyan().bold(), stats.path.display());
                    println!("  projects: {}", stats.projects);
                    println!("  features recorded: {}", stats.features_recorded);
                    println!("  size: {} bytes", stats.size_bytes);
                }
                CacheAction::Clear => {
                    cache.clear()?;
                    println!("{} {}", "Cleared".green().bold(), cache.path().display());
                }
            }
            Ok(())
        }
        Some(Command::PackTemplates(pack_args)) => {
            let template_dir = match pack_args.template_dir {
                Some(dir) => dir,
                None => InstallRoot::discover(config)?.templates_dir(),
            };
            let out_dir = pack_args.out_dir.unwrap_or_else(|| template_dir.clone());
            pack(&template_dir, &out_dir)
        }
    }
}

async fn create(config: &PiConfig, args: CreateArgs) -> Result<()> {
    let (root, catalog) = load_catalog(config)?;
    let cache = open_cache(config);
    installer_core::tui::run_create(
        config,
        &root,
        &catalog.templates,
        cache.as_ref(),
        args,
        CLI_VERSION,
    )
    .await
}

fn pack(template_dir: &Path, out_dir: &Path) -> Result<()> {
    println!("{}", "Building template zips...".cyan().bold());
    println!();

    let packed = installer_core::pack_templates(template_dir, out_dir)?;
    for template in &packed {
        println!(
            "  {} {}/{} {} ({} bytes)",
            "->".blue(),
            template.framework,
            template.template,
            "done".green(),
            template.size
        );
    }

    println!();
    println!(
        "{} {} template zip(s) in {}",
        "Built".green().bold(),
        packed.len(),
        out_dir.display()
    );
    Ok(())
}

fn print_detection(dir: &Path, info: &ProjectInfo) {
    println!("{} {}", "Project:".cyan().bold(), dir.display());
    println!("  name: {}", info.project_name);
    println!(
        "  framework: {}",
        info.framework.as_deref().unwrap_or("unknown")
    );
    println!("  language: {}", info.language.display_name());
    println!("  package manager: {}", info.package_manager);
    println!(
        "  src folder: {}",
        if info.has_src_folder { "yes" } else { "no" }
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    // Handle Ctrl+C gracefully
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    let args = Args::parse();
    init_logging(args.verbose);
    let config = PiConfig;

    let result = run(args, &config).await;

    // Ensure cursor is visible on normal exit
    let _ = console::Term::stderr().show_cursor();

    result
}
