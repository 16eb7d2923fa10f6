use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use eton::{
    debug_loads, dumps, normalize_schema, toml_to_eton_with, DictionaryFormat, EncodeOptions,
    Record, StreamEncoder, SymbolState, Value, DEFAULT_NUMERIC_THRESHOLD, DEFAULT_THRESHOLD,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "eton", about = "Encode and inspect ETON documents", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Args)]
struct Thresholds {
    /// Minimum text length (in characters) for a value to get a token
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: usize,

    /// Numbers with a smaller magnitude always stay literal
    #[arg(long, default_value_t = DEFAULT_NUMERIC_THRESHOLD)]
    numeric_threshold: f64,
}

impl Thresholds {
    fn options(&self) -> EncodeOptions {
        EncodeOptions::new()
            .with_threshold(self.threshold)
            .with_numeric_threshold(self.numeric_threshold)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a JSON array of records into a complete document
    Encode {
        /// Schema id to encode under
        schema_id: String,

        /// JSON file holding an array of objects
        input: PathBuf,

        /// JSON file mapping schema ids to field lists
        schema: PathBuf,

        /// Do not write audit lines
        #[arg(long)]
        no_audit: bool,

        #[command(flatten)]
        thresholds: Thresholds,

        /// Dictionary block form: auto, lines or json
        #[arg(long, default_value = "auto")]
        dictionary_format: DictionaryFormat,
    },

    /// Print the structural decomposition of a document as JSON
    Decode {
        /// ETON document
        input: PathBuf,
    },

    /// Convert a TOML document
    Toml {
        /// TOML file
        input: PathBuf,

        #[command(flatten)]
        thresholds: Thresholds,
    },

    /// Print the streaming wire text for a JSON array of records
    Stream {
        /// JSON file holding an array of objects
        input: PathBuf,

        /// Schema id announced in the stream header
        #[arg(long, default_value = "Root")]
        schema_id: String,

        #[command(flatten)]
        thresholds: Thresholds,
    },
}

fn init_tracing(cli: &Cli) {
    //   --quiet   → off
    //   --verbose → RUST_LOG if set, otherwise info
    //   default   → warnings only, so recovered corruption is still reported
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        tracing_subscriber::EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = run(cli) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Encode {
            schema_id,
            input,
            schema,
            no_audit,
            thresholds,
            dictionary_format,
        } => {
            let records = read_records(&input)?;
            let schema_json = read_json(&schema)?;
            let schemas = normalize_schema(&schema_json)
                .with_context(|| format!("invalid schema file {}", schema.display()))?;

            let options = thresholds
                .options()
                .with_audit(!no_audit)
                .with_dictionary_format(dictionary_format);
            let doc = dumps(&records, &schema_id, &schemas, &SymbolState::new(), &options)?;
            info!(records = records.len(), bytes = doc.len(), "encoded document");
            println!("{}", doc);
        }

        Commands::Decode { input } => {
            let content = read_text(&input)?;
            let entries = debug_loads(&content);
            info!(entries = entries.len(), "decoded document");
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }

        Commands::Toml { input, thresholds } => {
            let content = read_text(&input)?;
            let converted = toml_to_eton_with(&content, &thresholds.options())
                .with_context(|| format!("failed to convert {}", input.display()))?;
            info!(
                tables = converted.schemas.len(),
                symbols = converted.state.len(),
                "converted TOML"
            );
            println!("{}", converted.document);
        }

        Commands::Stream {
            input,
            schema_id,
            thresholds,
        } => {
            let records = read_records(&input)?;
            let encoder = StreamEncoder::new(schema_id).with_options(thresholds.options());
            for chunk in encoder.encode_iter(&records) {
                print!("{}", chunk);
            }
        }
    }
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let text = read_text(path)?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn read_records(path: &Path) -> Result<Vec<Record>> {
    let Value::Array(items) = Value::from(read_json(path)?) else {
        bail!("{} must hold a JSON array of objects", path.display());
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(record) => Ok(record),
            other => bail!(
                "{}: item {} is a {}, expected an object",
                path.display(),
                i,
                other.kind()
            ),
        })
        .collect()
}
