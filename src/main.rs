use anyhow::Context;
use anyhow::Result;
use brd_builder::document::Document;
use brd_builder::document::TableSignature;
use brd_builder::BrdError;
use brd_builder::ErrorKind;
use brd_builder::FilterMode;
use brd_builder::GenerateRequest;
use brd_builder::Generated;
use brd_builder::Generator;
use brd_builder::GeneratorConfig;
use clap::Parser;
use clap::Subcommand;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_OUTPUT: &str = "Business Requirements Document - updated.docx";

#[derive(Parser, Debug)]
#[command(name = "brd-builder", version, about = "Rebuilds the Functional Requirements table of a BRD template from a spreadsheet")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "BRD_CONFIG")]
    config: Option<PathBuf>,

    /// Log debug messages
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a copy of the template with the requirements table rebuilt
    Generate {
        /// Requirements workbook (.xlsx)
        #[arg(long)]
        excel: PathBuf,

        /// Word template (.docx); the configured template when absent
        #[arg(long, env = "BRD_TEMPLATE")]
        template: Option<PathBuf>,

        /// Sheet name or glob pattern
        #[arg(long, env = "BRD_SHEET")]
        sheet: Option<String>,

        /// none, final or final_or_approved
        #[arg(long, env = "BRD_FILTER")]
        filter: Option<String>,

        /// Paragraph text after which a missing table is created
        #[arg(long, env = "BRD_SECTION_MARKER")]
        section_marker: Option<String>,

        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,
    },
    /// Print the parsed form groups as JSON, without filtering
    Parse {
        #[arg(long)]
        excel: PathBuf,

        #[arg(long, env = "BRD_SHEET")]
        sheet: Option<String>,
    },
    /// Summarize the tables and paragraphs of a template
    Inspect {
        #[arg(long, env = "BRD_TEMPLATE")]
        template: Option<PathBuf>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    // Loaded before parsing so `.env` can supply the BRD_* arguments.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    if let Some(warning) = dotenv_warning(&dotenv) {
        log::warn!("{warning}");
    }

    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            log::error!("{error:#}");
            exit_code(&error)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };

    match cli.command {
        Command::Generate { excel, template, sheet, filter, section_marker, output } => {
            if let Some(template) = template {
                config.template = template;
            }
            if let Some(section_marker) = section_marker {
                config.section_marker = section_marker;
            }
            let generator = Generator::new(config);
            let request = GenerateRequest {
                spreadsheet: read(&excel)?,
                template: None,
                sheet,
                filter: filter.as_deref().map(FilterMode::parse),
            };
            match generator.generate(request)? {
                Generated::Document(bytes) => {
                    std::fs::write(&output, bytes).with_context(|| format!("Writing {}", output.display()))?;
                    log::info!("Wrote {}", output.display());
                    Ok(ExitCode::SUCCESS)
                }
                Generated::NoMatchingRequirements { filter } => {
                    log::error!("No requirements matched with the selected filter ({filter}).");
                    Ok(ExitCode::from(2))
                }
            }
        }
        Command::Parse { excel, sheet } => {
            let preview = Generator::new(config).preview(read(&excel)?, sheet.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&preview)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Inspect { template, json } => {
            let path = template.unwrap_or(config.template);
            let document = Document::open(read(&path)?).with_context(|| format!("Opening {}", path.display()))?;
            let outline = document.outline(&TableSignature::default());
            if json {
                println!("{}", serde_json::to_string_pretty(&outline)?);
            } else {
                print!("{outline}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// A missing `.env` file is normal; anything else is worth reporting.
fn dotenv_warning(result: &dotenvy::Result<PathBuf>) -> Option<String> {
    match result {
        Err(error) if !error.not_found() => Some(format!("Ignoring .env file: {error}")),
        _ => None,
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Reading {}", path.display()))
}

/// 1 for internal failures, 2 for input the caller must fix, 3 for an unusable template.
fn exit_code(error: &anyhow::Error) -> ExitCode {
    match error.downcast_ref::<BrdError>().map(BrdError::kind) {
        Some(ErrorKind::Validation) => ExitCode::from(2),
        Some(ErrorKind::Structure) => ExitCode::from(3),
        Some(ErrorKind::Internal) | None => ExitCode::from(1),
    }
}
