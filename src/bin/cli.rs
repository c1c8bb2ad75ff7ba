use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use vulnfix::challenge::Session;
use vulnfix::config::{Config, CONFIG_FILE};
use vulnfix::error::TrainerError;
use vulnfix::output::{self, OutputFormat};
use vulnfix::rules::RuleRegistry;

#[derive(Parser)]
#[command(
    name = "vulnfix",
    about = "Fix vulnerable code snippets and get your fix graded",
    version,
    author
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a solution for a challenge
    Check {
        /// Challenge identifier
        #[arg(long)]
        challenge: String,

        /// Vulnerability category (e.g. sql-injection, xss, auth, path-traversal)
        #[arg(long)]
        category: String,

        /// Files belonging to the attempt
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Challenge workspace root (defaults to the files' common parent)
        #[arg(long, short = 'w')]
        workspace: Option<PathBuf>,

        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output format (console, json)
        #[arg(long, short = 'f', default_value = "console")]
        format: String,

        /// Write output to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List the pattern rule sets
    Rules {
        /// Output format (table, json)
        #[arg(long, short = 'f', default_value = "table")]
        format: String,

        /// Report categories that would only resolve to the default rule set
        #[arg(long, num_args = 1..)]
        check: Vec<String>,

        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// Generate a starter .vulnfix.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Check {
            challenge,
            category,
            files,
            workspace,
            config,
            format,
            output,
        } => cmd_check(challenge, category, files, workspace, config, format, output),
        Commands::Rules {
            format,
            check,
            config,
        } => cmd_rules(format, check, config),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<Config, TrainerError> {
    Config::load(&path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE)))
}

fn cmd_check(
    challenge: String,
    category: String,
    files: Vec<PathBuf>,
    workspace: Option<PathBuf>,
    config: Option<PathBuf>,
    format_str: String,
    output_path: Option<PathBuf>,
) -> Result<i32, TrainerError> {
    let format = OutputFormat::from_str_lenient(&format_str).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", format_str);
        OutputFormat::Console
    });
    let config = load_config(config)?;

    let files = files
        .into_iter()
        .map(|f| std::path::absolute(&f).unwrap_or(f))
        .collect();

    let mut session = Session::new();
    match workspace {
        Some(root) => {
            let root = std::path::absolute(&root).unwrap_or(root);
            session.start_in(challenge, category, root, files)?
        }
        None => session.start(challenge, category, files)?,
    };
    let outcome = session.check_solution(&config)?;
    let rendered = output::render_outcome(&outcome, format)?;

    match output_path {
        Some(out) => std::fs::write(&out, &rendered)?,
        None => print!("{}", rendered),
    }

    // Exit code: 0 = pass, 1 = not passed
    Ok(if outcome.passed() { 0 } else { 1 })
}

fn cmd_rules(
    format_str: String,
    check: Vec<String>,
    config: Option<PathBuf>,
) -> Result<i32, TrainerError> {
    let config = load_config(config)?;
    let registry = RuleRegistry::with_config(&config.rules)?;

    if !check.is_empty() {
        let unresolved = registry.unresolved(check.iter().map(String::as_str));
        if unresolved.is_empty() {
            println!("All {} categories resolve to a rule set.", check.len());
            return Ok(0);
        }
        for category in &unresolved {
            println!(
                "{}: no rule set or alias, falls back to '{}'",
                category,
                registry.default_category()
            );
        }
        return Ok(1);
    }

    let rule_sets = registry.list();
    match format_str.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&rule_sets)?;
            println!("{}", json);
        }
        _ => {
            println!(
                "{:<16} {:<28} {:<6} {:<6} ALIASES",
                "CATEGORY", "NAME", "VULN", "SECURE"
            );
            println!("{}", "-".repeat(80));
            for set in &rule_sets {
                println!(
                    "{:<16} {:<28} {:<6} {:<6} {}",
                    set.category,
                    set.display_name,
                    set.vulnerable_patterns.len(),
                    set.secure_patterns.len(),
                    if set.aliases.is_empty() {
                        "-".to_string()
                    } else {
                        set.aliases.join(", ")
                    },
                );
            }
        }
    }

    Ok(0)
}

fn cmd_init(force: bool) -> Result<i32, TrainerError> {
    let path = PathBuf::from(CONFIG_FILE);

    if path.exists() && !force {
        eprintln!("{} already exists. Use --force to overwrite.", CONFIG_FILE);
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created {}", CONFIG_FILE);

    Ok(0)
}
