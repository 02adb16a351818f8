//! IIDES CLI
//!
//! Thin file-level front end over `iides-model`:
//! - `check`: parse and validate a bundle document
//! - `roundtrip`: read a bundle document and write it back out
//! - `vocab`: inspect the built-in controlled vocabularies

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use iides_model::{
    bundle_to_document_with, document_to_bundle_with, Bundle, CodecConfig, Document,
    VocabularyRegistry,
};

const LOG_ENV: &str = "IIDES_LOG";

#[derive(Parser)]
#[command(name = "iides")]
#[command(author, version, about = "IIDES: insider-incident bundle tools")]
struct Cli {
    /// Codec options (JSON); defaults apply to missing keys
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (overrides IIDES_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a bundle document and print per-type counts
    Check {
        /// Bundle document (JSON)
        input: PathBuf,
    },

    /// Read a bundle document and write it back out
    Roundtrip {
        input: PathBuf,
        out: PathBuf,
    },

    /// List the codes of a vocabulary
    Vocab {
        /// Vocabulary name, e.g. `incident-type-vocab`
        name: Option<String>,

        /// List the vocabulary names instead
        #[arg(long, conflicts_with = "name")]
        list: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Check { input } => cmd_check(&input, &config),
        Commands::Roundtrip { input, out } => cmd_roundtrip(&input, &out, &config),
        Commands::Vocab { name, list } => cmd_vocab(name.as_deref(), list),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<CodecConfig> {
    let Some(path) = path else {
        return Ok(CodecConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: CodecConfig = serde_json::from_str(&text)
        .with_context(|| format!("invalid config {}", path.display()))?;
    config.validate()?;
    tracing::debug!(?config, "loaded codec config");
    Ok(config)
}

fn read_bundle(input: &Path, config: &CodecConfig) -> Result<Bundle> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let doc = Document::from_json_str(&text)
        .with_context(|| format!("failed to parse {}", input.display()))?;
    let bundle = document_to_bundle_with(&doc, config)
        .with_context(|| format!("invalid bundle {}", input.display()))?;
    Ok(bundle)
}

fn cmd_check(input: &Path, config: &CodecConfig) -> Result<()> {
    let bundle = read_bundle(input, config)?;
    println!(
        "{} {} (bundle--{})",
        "Valid".green().bold(),
        input.display(),
        bundle.id()
    );
    for (tag, count) in bundle.counts() {
        println!("  {} {tag}: {count}", "→".cyan());
    }
    println!("  {} {} entities", "→".yellow(), bundle.len());
    Ok(())
}

fn cmd_roundtrip(input: &Path, out: &Path, config: &CodecConfig) -> Result<()> {
    let bundle = read_bundle(input, config)?;
    let doc = bundle_to_document_with(&bundle, config)?;
    let text = doc.to_json_string(config.pretty)?;
    if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(out, text).with_context(|| format!("failed to write {}", out.display()))?;
    println!(
        "{} {} → {} ({} records)",
        "Wrote".green().bold(),
        input.display(),
        out.display(),
        doc.record_count()
    );
    Ok(())
}

fn cmd_vocab(name: Option<&str>, list: bool) -> Result<()> {
    let registry = VocabularyRegistry::builtin();
    if list {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }
    let name = name.ok_or_else(|| anyhow!("give a vocabulary name, or --list"))?;
    let vocab = registry
        .get(name)
        .ok_or_else(|| anyhow!("unknown vocabulary `{name}` (see `iides vocab --list`)"))?;
    println!("{} ({} codes)", vocab.name().bold(), vocab.len());
    for (code, title) in vocab.terms() {
        println!("  {} {title}", format!("{code:<8}").cyan());
    }
    Ok(())
}
