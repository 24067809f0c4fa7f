use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell as CompletionShell};
use colored::Colorize;
use project_tracker::{Config, Database, ProjectService, Session, Shell};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "projects")]
#[command(author, version, about = "Project tracker - hours, materials, steps and categories for your projects")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Database file (overrides .projects/config.toml and PROJECTS_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database file and tables, then exit
    Init,

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = Config::load();
    if let Some(path) = args.db {
        config.database.path = path;
    }

    match args.command {
        Some(Command::Completion { shell }) => {
            generate(shell, &mut Args::command(), "projects", &mut io::stdout());
        }
        Some(Command::Init) => {
            open_database(&config);
            println!(
                "{} {}",
                "Initialized project database at".green(),
                config.database.path.display()
            );
        }
        None => {
            let service = ProjectService::new(open_database(&config));
            let mut session = Session::default();
            let mut shell = Shell::new(&service, io::stdin().lock(), io::stdout().lock());

            if let Err(e) = shell.run(&mut session) {
                eprintln!("{} {}", "Error:".red().bold(), e);
                std::process::exit(1);
            }
        }
    }
}

/// Logs go to stderr so they never interleave with the menu on stdout
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "project_tracker=debug,projects=debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn open_database(config: &Config) -> Database {
    match Database::connect(&config.database) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}
