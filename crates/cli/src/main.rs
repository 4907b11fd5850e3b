use std::path::PathBuf;

use anyhow::Result;
use bintag::commands::{
    capture_command, delete_tag_command, export_command, list_tags_command, rank_command,
    show_tag_command, store_info_command, FeatureInput,
};
use bintag::resolve_layout;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `bintag_core=debug`).
const LOG_ENV: &str = "BINTAG_LOG";

/// Match binaries against a store of analyst-tagged reference binaries.
///
/// This CLI is a thin wrapper around `bintag-core` (exposed in code as `bintag_core`).
/// All substantive logic lives in the library so it can be tested thoroughly
/// and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "bintag",
    version,
    about = "Rank binaries against analyst-tagged reference binaries",
    long_about = None
)]
struct Cli {
    /// Tag store base directory. Defaults to $BINTAG_HOME, then ~/.bintag.
    #[arg(long, global = true)]
    store: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank the stored tags by similarity to a binary.
    Rank {
        /// Binary to analyze.
        #[arg(long, conflicts_with = "features", required_unless_present = "features")]
        binary: Option<PathBuf>,

        /// Architecture hint for the disassembler (e.g., x86, x86_64, arm64).
        #[arg(long, requires = "binary")]
        arch: Option<String>,

        /// Previously exported feature document to rank instead of a binary.
        #[arg(long)]
        features: Option<PathBuf>,

        /// Only show candidates below this distance (overrides config).
        #[arg(long)]
        threshold: Option<f64>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Capture a binary's features as a new tag.
    ///
    /// If a tag with the same name exists you are asked before it is replaced.
    Capture {
        /// Tag name. Defaults to the binary's file name.
        #[arg(long)]
        name: Option<String>,

        /// Binary to capture.
        #[arg(long, conflicts_with = "features", required_unless_present = "features")]
        binary: Option<PathBuf>,

        /// Architecture hint for the disassembler.
        #[arg(long, requires = "binary")]
        arch: Option<String>,

        /// Previously exported feature document to capture instead of a binary.
        #[arg(long)]
        features: Option<PathBuf>,

        /// Free-text description shown with matches.
        #[arg(long, conflicts_with = "description_file")]
        description: Option<String>,

        /// Read the description from a file.
        #[arg(long)]
        description_file: Option<PathBuf>,

        /// Replace an existing tag without asking.
        #[arg(long, short = 'y', default_value_t = false)]
        yes: bool,
    },

    /// Write a binary's features (histogram, imports, arch) as JSON.
    Export {
        /// Binary to analyze.
        #[arg(long)]
        binary: PathBuf,

        /// Architecture hint for the disassembler.
        #[arg(long)]
        arch: Option<String>,

        /// Output path for the feature document.
        #[arg(long)]
        out: PathBuf,
    },

    /// List all tags in the store.
    ListTags {
        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show a single tag.
    ShowTag {
        /// Tag name.
        #[arg(long)]
        name: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Delete a tag from the store.
    DeleteTag {
        /// Tag name.
        #[arg(long)]
        name: String,
    },

    /// Show the resolved store location, config and tag count.
    StoreInfo {
        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let layout = resolve_layout(cli.store.as_deref())?;

    match cli.command {
        Command::Rank { binary, arch, features, threshold, json } => {
            let input = FeatureInput::from_args(binary, arch, features)?;
            rank_command(&layout, &input, threshold, json)?
        }
        Command::Capture {
            name,
            binary,
            arch,
            features,
            description,
            description_file,
            yes,
        } => {
            let input = FeatureInput::from_args(binary, arch, features)?;
            capture_command(&layout, name, &input, description, description_file.as_deref(), yes)?
        }
        Command::Export { binary, arch, out } => export_command(&binary, arch.as_deref(), &out)?,
        Command::ListTags { json } => list_tags_command(&layout, json)?,
        Command::ShowTag { name, json } => show_tag_command(&layout, &name, json)?,
        Command::DeleteTag { name } => delete_tag_command(&layout, &name)?,
        Command::StoreInfo { json } => store_info_command(&layout, json)?,
    }

    Ok(())
}
