mod payload;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use decisioning_bridge::propositions_from_response;
use decisioning_interchange::{JsonMap, Proposition};
use decisioning_tracking::{OfferInteraction, OfferListInteraction};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Inspect decisioning responses and the interaction XDM they produce.
#[derive(Parser)]
#[command(
    name = "decisioning",
    version,
    about = "Inspect decisioning responses and interaction XDM"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a response payload and list its propositions by scope
    Parse {
        /// Path to a response payload or a JSON list of propositions
        file: PathBuf,
    },

    /// Print the display interaction XDM for offers in a payload
    Display {
        /// Path to a response payload or a JSON list of propositions
        file: PathBuf,
        /// Offer ids to include (repeatable). Default: every offer.
        #[arg(long = "offer")]
        offers: Vec<String>,
    },

    /// Print the tap interaction XDM for one offer
    Tap {
        /// Path to a response payload or a JSON list of propositions
        file: PathBuf,
        /// Id of the tapped offer
        #[arg(long)]
        offer: String,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { file } => cmd_parse(&file, cli.output, cli.quiet),
        Commands::Display { file, offers } => cmd_display(&file, &offers, cli.output, cli.quiet),
        Commands::Tap { file, offer } => cmd_tap(&file, &offer, cli.output, cli.quiet),
    }
}

/// Logs go to stderr so stdout stays a clean document.
fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load(file: &Path, output: OutputFormat, quiet: bool) -> JsonMap {
    match payload::read_payload(file) {
        Ok(map) => {
            tracing::debug!(file = %file.display(), keys = map.len(), "payload loaded");
            map
        }
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_parse(file: &Path, output: OutputFormat, quiet: bool) {
    let payload = load(file, output, quiet);
    let by_scope: BTreeMap<String, _> = match propositions_from_response(&payload) {
        Ok(map) => map
            .into_iter()
            .map(|(scope, proposition)| (scope.name().to_string(), proposition))
            .collect(),
        Err(e) => {
            report_error(
                &format!("invalid response in '{}': {}", file.display(), e),
                output,
                quiet,
            );
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => {
            let doc: JsonMap = by_scope
                .iter()
                .map(|(scope, proposition)| (scope.clone(), proposition.to_event_data()))
                .collect();
            print_document(Value::Object(doc));
        }
        OutputFormat::Text => {
            if by_scope.is_empty() {
                println!("no propositions");
            }
            for proposition in by_scope.values() {
                print_proposition(proposition);
            }
        }
    }
}

/// Propositions of a loaded payload, or exit if the payload's
/// `propositions` field is not a list.
fn load_propositions(
    file: &Path,
    payload: &JsonMap,
    output: OutputFormat,
    quiet: bool,
) -> Vec<Arc<Proposition>> {
    match payload::propositions(payload) {
        Ok(list) => list,
        Err(e) => {
            report_error(
                &format!("invalid response in '{}': {}", file.display(), e),
                output,
                quiet,
            );
            process::exit(1);
        }
    }
}

fn print_proposition(proposition: &Proposition) {
    println!(
        "{}  {}  ({} offers)",
        proposition.scope(),
        proposition.id(),
        proposition.offers().len()
    );
    for offer in proposition.offers() {
        let format = match offer.offer_type().as_format() {
            "" => "-",
            f => f,
        };
        let preview: String = offer.content().chars().take(60).collect();
        println!("  {}  [{}]  {}", offer.id(), format, preview);
    }
}

fn cmd_display(file: &Path, offer_ids: &[String], output: OutputFormat, quiet: bool) {
    let payload = load(file, output, quiet);
    let propositions = load_propositions(file, &payload, output, quiet);
    let offers = payload::select_offers(&propositions, offer_ids);

    match offers.generate_display_interaction_xdm() {
        Some(xdm) => print_xdm(xdm, output),
        None => {
            report_error("no matching offers to track", output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_tap(file: &Path, offer_id: &str, output: OutputFormat, quiet: bool) {
    let payload = load(file, output, quiet);
    let propositions = load_propositions(file, &payload, output, quiet);
    let xdm = propositions
        .iter()
        .flat_map(|p| p.offers().iter())
        .find(|offer| offer.id() == offer_id)
        .and_then(|offer| offer.generate_tap_interaction_xdm());

    match xdm {
        Some(xdm) => print_xdm(xdm, output),
        None => {
            report_error(&format!("offer '{}' not found", offer_id), output, quiet);
            process::exit(1);
        }
    }
}

fn print_xdm(xdm: JsonMap, output: OutputFormat) {
    match output {
        OutputFormat::Text => print_document(Value::Object(xdm)),
        OutputFormat::Json => println!("{}", Value::Object(xdm)),
    }
}

fn print_document(doc: Value) {
    let pretty =
        serde_json::to_string_pretty(&doc).unwrap_or_else(|e| format!("serialization error: {}", e));
    println!("{}", pretty);
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
