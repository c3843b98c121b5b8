//! autoreact - reaction hook for chat bots
//!
//! # Input (via stdin)
//! JSON with fields: content, symbols (optional map of reaction name to platform handle).
//! With `--batch`, one such object per line.
//!
//! # Output (via stdout)
//! JSON with the reactions array, in the order they should be applied
//!
//! The catalogue is read from `--catalogue`, `$AUTOREACT_CATALOGUE`, or
//! `<config_dir>/autoreact/catalogue.json`.

use autoreact::{
    default_catalogue_path, find_matches, load_catalogue, normalize, reactions_for, symbol_map,
    Catalogue, ReactError,
};
use clap::Parser;
use colored::Colorize;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Response format version
const OUTPUT_VERSION: &str = "1.0";

// ============================================================================
// Command line
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "autoreact", version, about = "Match chat messages to reactions")]
struct Cli {
    /// Trigger-term catalogue (JSON)
    #[arg(long, env = "AUTOREACT_CATALOGUE")]
    catalogue: Option<PathBuf>,

    /// Validate the catalogue and exit
    #[arg(long)]
    check: bool,

    /// Read one request per line and answer one response per line
    #[arg(long)]
    batch: bool,

    /// Include the matched terms behind each reaction
    #[arg(long)]
    explain: bool,
}

// ============================================================================
// Wire types
// ============================================================================

/// One message to react to
#[derive(Debug, Deserialize)]
struct ReactRequest {
    /// Raw message text
    content: String,

    /// Reaction name -> platform handle usable in this context.
    /// Absent means every catalogue term reacts with its own key.
    #[serde(default)]
    symbols: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
struct ReactResponse {
    version: String,

    /// Handles to apply, in order
    reactions: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    matches: Option<Vec<MatchEvidence>>,
}

impl ReactResponse {
    fn empty() -> Self {
        Self {
            version: OUTPUT_VERSION.to_string(),
            reactions: vec![],
            matches: None,
        }
    }
}

/// What triggered a reaction
#[derive(Debug, Serialize)]
struct MatchEvidence {
    term: String,
    start: usize,
    variant: &'static str,
}

// ============================================================================
// Matching
// ============================================================================

fn respond(request: &ReactRequest, catalogue: &Catalogue, explain: bool) -> ReactResponse {
    let symbols: HashMap<String, String> = match &request.symbols {
        Some(symbols) => symbol_map(symbols.iter().map(|(k, v)| (k, v.clone()))),
        None => catalogue
            .terms()
            .map(|t| (t.key().to_string(), t.key().to_string()))
            .collect(),
    };

    let text = normalize(&request.content);
    debug!("searchtext transformed {:?} -> {:?}", request.content, text);

    let reactions: Vec<String> = reactions_for(&text, &symbols, catalogue)
        .into_iter()
        .cloned()
        .collect();

    if !reactions.is_empty() {
        info!(
            "Reacting to {:?} with {}",
            request.content,
            reactions.join(" ").green().bold()
        );
    }

    let matches = explain.then(|| {
        find_matches(&text, &symbols, catalogue)
            .into_iter()
            .map(|m| MatchEvidence {
                term: m.term.to_string(),
                start: m.start,
                variant: if m.spaced { "spaced" } else { "collapsed" },
            })
            .collect()
    });

    ReactResponse {
        version: OUTPUT_VERSION.to_string(),
        reactions,
        matches,
    }
}

fn respond_line(line: &str, catalogue: &Catalogue, explain: bool) -> ReactResponse {
    match serde_json::from_str::<ReactRequest>(line) {
        Ok(request) => respond(&request, catalogue, explain),
        Err(e) => {
            error!("Skipping request: {}", ReactError::RequestParse(e));
            ReactResponse::empty()
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    // Initialize tracing if RUST_LOG is set
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.check {
        std::process::exit(check(&cli));
    }

    if let Err(e) = run(&cli) {
        error!("Error: {}", e);
        // Output empty response on error (non-blocking)
        println!(
            "{}",
            serde_json::to_string(&ReactResponse::empty()).unwrap_or_default()
        );
        std::process::exit(0); // Exit 0 so the bot keeps going
    }
}

fn catalogue_path(cli: &Cli) -> Result<PathBuf, ReactError> {
    match &cli.catalogue {
        Some(path) => Ok(path.clone()),
        None => default_catalogue_path(),
    }
}

/// Validate the catalogue; returns the process exit code
fn check(cli: &Cli) -> i32 {
    let loaded = catalogue_path(cli).and_then(|path| {
        let catalogue = load_catalogue(&path)?;
        Ok((path, catalogue))
    });

    match loaded {
        Ok((path, catalogue)) => {
            let spaced = catalogue.terms().filter(|t| t.use_spaced_variant).count();
            eprintln!(
                "{} {} ({} terms, {} spaced)",
                "ok".green().bold(),
                path.display(),
                catalogue.len(),
                spaced
            );
            0
        }
        Err(e) => {
            eprintln!("{} {}", "invalid".red().bold(), e);
            1
        }
    }
}

fn run(cli: &Cli) -> Result<(), ReactError> {
    let path = catalogue_path(cli)?;
    debug!("Loading catalogue from: {:?}", path);

    let catalogue = match load_catalogue(&path) {
        Ok(catalogue) => catalogue,
        Err(ReactError::CatalogueNotFound(path)) => {
            warn!("Catalogue not found at {:?}, nothing will react", path);
            Catalogue::default()
        }
        Err(e) => return Err(e),
    };

    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;

    if cli.batch {
        let lines: Vec<&str> = input.lines().filter(|l| !l.trim().is_empty()).collect();
        info!("Matching {} messages", lines.len());

        // par_iter keeps input order on collect
        let responses: Vec<ReactResponse> = lines
            .par_iter()
            .map(|line| respond_line(line, &catalogue, cli.explain))
            .collect();

        for response in &responses {
            println!("{}", serde_json::to_string(response)?);
        }
        return Ok(());
    }

    let request: ReactRequest = serde_json::from_str(&input)?;
    let response = respond(&request, &catalogue, cli.explain);
    println!("{}", serde_json::to_string(&response)?);

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
