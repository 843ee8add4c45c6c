//! Command-line entry point for a NexusNote vault.
//!
//! # Responsibility
//! - Load vault configuration and start logging.
//! - Expose the facade's read views and note creation as subcommands.
//!
//! Output is plain text, one record per line, so it pipes cleanly.

use clap::{Parser, Subcommand};
use log::warn;
use nexusnote_core::{
    calculate_centrality, init_from_config, Vault, VaultConfig, VaultEntry, VaultError,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Personal knowledge-base vault tool.
#[derive(Parser, Debug)]
#[command(name = "nexusnote")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML vault configuration; defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the folder/note tree
    Tree,
    /// Create an empty note
    New {
        title: String,
        /// Target folder, relative to the vault root
        #[arg(short, long)]
        folder: Option<String>,
    },
    /// Resolve a note by name, creating it at the root when missing
    Open { name: String },
    /// List notes referencing a note name
    Backlinks { name: String },
    /// List headings of a note
    Headings { id: String },
    /// List tags and how many notes carry each
    Tags,
    /// Print graph edges and node degree
    Graph,
    /// Print vault totals and the most linked notes
    Stats,
    /// Settle interrupted renames
    Reconcile,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = match &cli.config {
        Some(path) => VaultConfig::load(path).map_err(|err| err.to_string())?,
        None => VaultConfig::default(),
    };
    if let Err(err) = init_from_config(&config) {
        eprintln!("warning: logging disabled: {err}");
    }

    let vault = Vault::open(&config).map_err(|err| err.to_string())?;
    execute(&vault, cli.command).map_err(|err| {
        warn!("event=cli_command module=cli status=error error={err}");
        err.to_string()
    })
}

fn execute(vault: &Vault, command: Commands) -> Result<(), VaultError> {
    match command {
        Commands::Tree => print_tree(&vault.get_all()?, 0),
        Commands::New { title, folder } => {
            let note = vault.create_note(&title, folder.as_deref())?;
            println!("{}\t{}", note.id, note.path);
        }
        Commands::Open { name } => {
            let note = vault.open_or_create_by_name(&name)?;
            println!("{}\t{}", note.id, note.path);
        }
        Commands::Backlinks { name } => {
            for backlink in vault.backlinks(&name)? {
                println!("{}\t{}", backlink.from, backlink.context);
            }
        }
        Commands::Headings { id } => {
            for heading in vault.headings(&id)? {
                println!(
                    "{}{} #{}",
                    "#".repeat(usize::from(heading.level)),
                    heading.text,
                    heading.slug
                );
            }
        }
        Commands::Tags => {
            for (tag, ids) in vault.tags()? {
                println!("#{tag}\t{}", ids.len());
            }
        }
        Commands::Graph => {
            let graph = vault.build_graph()?;
            let degree = calculate_centrality(&graph);
            for node in &graph.nodes {
                println!(
                    "node\t{}\t{}\tsize={}\tdegree={}",
                    node.id,
                    node.name,
                    node.size,
                    degree.get(&node.id).copied().unwrap_or(0)
                );
            }
            for edge in &graph.edges {
                println!("edge\t{}\t{}", edge.source, edge.target);
            }
        }
        Commands::Stats => {
            let stats = vault.stats()?;
            println!("notes\t{}", stats.total_notes);
            println!("folders\t{}", stats.total_folders);
            println!("links\t{}", stats.total_links);
            for item in stats.most_linked {
                println!("linked\t{}\t{}", item.name, item.links);
            }
        }
        Commands::Reconcile => {
            let report = vault.reconcile()?;
            println!(
                "resolved={} conflicts={} settled={}",
                report.resolved.len(),
                report.conflicts.len(),
                report.settled.len()
            );
        }
    }
    Ok(())
}

fn print_tree(entries: &[VaultEntry], depth: usize) {
    for entry in entries {
        let marker = if entry.is_directory { "/" } else { "" };
        println!("{}{}{marker}", "  ".repeat(depth), entry.name);
        print_tree(&entry.children, depth + 1);
    }
}
