use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use modelsmith::app::parse::parse_interface;
use modelsmith::app::pimp::{PimpOptions, pimp_files};
use modelsmith::infra::config::Config;

#[derive(Parser)]
#[command(author, version, about = "Generate Objective-C model accessors from ivar declarations", long_about = None)]
struct Cli {
    /// Extra config file layered over the global and workspace configs.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add properties, @synthesize, an initializer and dealloc to a model class
    Pimp {
        /// The @interface header
        header: PathBuf,
        /// Implementation file; defaults to the header with the configured extension
        #[arg(long)]
        implementation: Option<PathBuf>,
        /// Print the generated files instead of overwriting them
        #[arg(long)]
        dry_run: bool,
        /// Keep a .orig copy of each file before overwriting
        #[arg(long)]
        backup: bool,
    },
    /// Print the instance variables parsed from a header
    Inspect {
        header: PathBuf,
        #[arg(long, value_enum, default_value_t = InspectFormat::Text)]
        format: InspectFormat,
    },
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InspectFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    modelsmith::init(cli.verbose);

    match cli.command {
        Commands::Pimp {
            header,
            implementation,
            dry_run,
            backup,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let options = PimpOptions {
                implementation,
                dry_run,
                backup,
            };
            let outcome = pimp_files(&header, &options, &config)?;
            if outcome.written {
                println!(
                    "updated {} and {}",
                    outcome.header_path.display(),
                    outcome.implementation_path.display()
                );
            } else {
                println!("// {}", outcome.header_path.display());
                println!("{}", outcome.generated.header);
                println!("// {}", outcome.implementation_path.display());
                println!("{}", outcome.generated.implementation);
            }
        }
        Commands::Inspect { header, format } => {
            let source = fs::read_to_string(&header)
                .with_context(|| format!("failed to read {}", header.display()))?;
            let decl = parse_interface(&source)?;
            match format {
                InspectFormat::Text => {
                    for ivar in &decl.ivars {
                        println!(
                            "{}: {} ({:?})",
                            ivar.name,
                            ivar.declared_type(),
                            ivar.ownership
                        );
                    }
                }
                InspectFormat::Json => {
                    let json = serde_json::to_string_pretty(&decl)
                        .context("failed to serialize declaration")?;
                    println!("{json}");
                }
            }
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "modelsmith", &mut io::stdout());
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_with_file(path),
        None => Config::load(),
    }
}
