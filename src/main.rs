//! docfill - template fields and rich text merging

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use docfill::{MergeConfig, MergeContext, RichTextMerger, extract_schema};

#[derive(Parser)]
#[command(name = "docfill")]
#[command(version, about = "Template fields and rich text merging for DOCX and ODT", long_about = None)]
#[command(after_help = "EXAMPLES:
    docfill extract contrato.docx --pretty         Print the field schema
    docfill validate contrato.odt valores.json     Check submitted values
    docfill merge salida.docx valores.json         Convert HTML values in place")]
struct Cli {
    /// Log every part that is scanned
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the field schema of a template as JSON
    Extract {
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,

        /// Indent the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Validate a JSON object of values (keyed by field slug) against a template
    Validate {
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,

        #[arg(value_name = "VALUES")]
        values: PathBuf,
    },
    /// Convert HTML values inside a generated document, in place
    Merge {
        #[arg(value_name = "PACKAGE")]
        package: PathBuf,

        /// JSON object of values keyed by merge key
        #[arg(value_name = "VALUES")]
        values: PathBuf,

        /// Also convert markup split across runs
        #[arg(long)]
        recover_markup: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Command::Extract { template, pretty } => extract(&template, pretty),
        Command::Validate { template, values } => validate(&template, &values),
        Command::Merge {
            package,
            values,
            recover_markup,
        } => merge(&package, &values, recover_markup),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn extract(template: &Path, pretty: bool) -> Result<ExitCode, String> {
    let schema = extract_schema(template).map_err(|e| e.to_string())?;
    let json = if pretty {
        serde_json::to_string_pretty(&schema)
    } else {
        serde_json::to_string(&schema)
    }
    .map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

fn validate(template: &Path, values: &Path) -> Result<ExitCode, String> {
    let schema = extract_schema(template).map_err(|e| e.to_string())?;
    let submitted = read_values(values)?;

    match schema.validate_submission(&submitted) {
        Ok(context) => {
            let json = serde_json::to_string_pretty(&context).map_err(|e| e.to_string())?;
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }
        Err(errors) => {
            for error in &errors.0 {
                eprintln!("{error}");
            }
            eprintln!("{errors}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn merge(package: &Path, values: &Path, recover_markup: bool) -> Result<ExitCode, String> {
    let context = read_values(values)?;
    let merger = RichTextMerger::new().with_config(MergeConfig {
        recover_split_markup: recover_markup,
        ..MergeConfig::default()
    });
    let report = merger.merge(package, &context).map_err(|e| e.to_string())?;
    println!(
        "{}: {} fragment(s) converted in {} part(s)",
        package.display(),
        report.fragments_converted,
        report.parts_rewritten
    );
    Ok(ExitCode::SUCCESS)
}

fn read_values(path: &Path) -> Result<MergeContext, String> {
    let data = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&data).map_err(|e| e.to_string())?;
    MergeContext::from_json(&json).map_err(|e| e.to_string())
}
