use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use url::Url;

use api_introspector::classify::{classify, CaptureSite, Scalar};
use api_introspector::config::{load_config, validate_proxy};
use api_introspector::reporter::{HttpSink, ReportSink, ReporterSettings};
use api_introspector::schema::{merge_all, schema_from_value, Schema};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "introspector-cli")]
#[command(about = "Management CLI for the API introspector", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a configuration file
    Validate {
        config: PathBuf,
        /// Also check proxy and metrics settings
        #[arg(long)]
        proxy: bool,
    },
    /// Print the schema inferred from a JSON document
    Infer { file: PathBuf },
    /// Print the merged schema of several JSON documents
    Merge {
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,
    },
    /// Show which content type a single value is classified as
    Classify {
        value: String,
        /// Property or parameter name the value appears under
        #[arg(long)]
        field: Option<String>,
        #[arg(long, value_enum)]
        site: Option<Site>,
        /// Parse the value as JSON instead of taking it as a string
        #[arg(long)]
        json: bool,
    },
    /// Send a liveness ping to the configured collector
    Ping { config: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum Site {
    Body,
    Query,
    Header,
    Url,
}

impl From<Site> for CaptureSite {
    fn from(site: Site) -> Self {
        match site {
            Site::Body => CaptureSite::Body,
            Site::Query => CaptureSite::Query,
            Site::Header => CaptureSite::Header,
            Site::Url => CaptureSite::Url,
        }
    }
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config, proxy } => {
            let loaded = load_config(&config)?;
            if proxy {
                if let Err(errors) = validate_proxy(&loaded) {
                    for error in &errors {
                        eprintln!("  - {error}");
                    }
                    return Err(format!("{} configuration error(s)", errors.len()).into());
                }
            }
            println!("{}: ok", config.display());
        }
        Commands::Infer { file } => {
            let schema = infer(&file)?;
            print_json(&schema)?;
        }
        Commands::Merge { files } => {
            let schemas = files.iter().map(|f| infer(f)).collect::<CliResult<Vec<_>>>()?;
            match merge_all(schemas) {
                Some(schema) => print_json(&schema)?,
                None => println!("null"),
            }
        }
        Commands::Classify {
            value,
            field,
            site,
            json,
        } => {
            let parsed = if json {
                serde_json::from_str(&value)?
            } else {
                Value::String(value)
            };
            let scalar = Scalar::from_value(&parsed)
                .ok_or("only scalar values can be classified; use `infer` for documents")?;
            match classify(scalar, site.map(Into::into), field.as_deref()) {
                Some(c) => {
                    println!("content type: {}", c.content_type.name());
                    print_json(&c.schema)?;
                }
                None => println!("no rule matches at this site"),
            }
        }
        Commands::Ping { config } => {
            let loaded = load_config(&config)?;
            let settings = ReporterSettings::from_config(&loaded);
            let sink = HttpSink::new(
                Url::parse(&loaded.reporting.endpoint)?,
                &loaded.api_key,
                Duration::from_secs(loaded.reporting.timeout_secs),
            )?;
            sink.ping(&settings.info).await?;
            println!("pinged {}", sink.endpoint());
        }
    }

    Ok(())
}

fn infer(path: &Path) -> CliResult<Schema> {
    let content = std::fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&content)?;
    schema_from_value(&document, None)
        .map(Schema::from)
        .ok_or_else(|| format!("{}: no schema could be inferred", path.display()).into())
}

fn print_json<T: serde::Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
