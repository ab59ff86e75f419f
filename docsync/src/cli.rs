///
/// This module implements the CLI interface for docsync: command parsing, the async
/// entrypoint and user-visible output.
///
/// All parsing, validation and reconciliation logic lives in the `docsync-core` crate.
/// This module only wires settings, the Contentful client and the filesystem together.
///
/// ## How To Use
/// - In CI: `docsync sync` with the environment described in [`crate::load_config`].
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
use crate::contentful::ContentfulClient;
use crate::load_config::{load_repository, load_settings};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use docsync_core::config::{DEFAULT_BRANCH, DEFAULT_CONFIG_PATH, DEFAULT_DOCS_PREFIX};
use docsync_core::document::FsDocumentSource;
use docsync_core::reference::EntryType;
use docsync_core::report::Outcome;
use docsync_core::synchronise::{list_repository_entries, synchronise};
use std::path::PathBuf;

/// CLI for docsync: publish repository documentation to a CMS.
#[derive(Parser)]
#[clap(
    name = "docsync",
    version,
    about = "Publish markdown documentation pages and collections to a Contentful space"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Publish changed (or all) documentation pages, then the collection config
    Sync(SyncArgs),
    /// List CMS entries published from this repository
    List {
        /// Only list entries of this content type (page or collection)
        #[clap(long)]
        content_type: Option<EntryType>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Repository-relative path of the collection config
    #[clap(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,
    /// Only changed paths under this prefix are published
    #[clap(long, default_value = DEFAULT_DOCS_PREFIX)]
    pub docs_prefix: String,
    /// Branch used when linking pages back to their source file
    #[clap(long, default_value = DEFAULT_BRANCH)]
    pub branch: String,
    /// Root of the repository checkout
    #[clap(long, default_value = ".")]
    pub root: PathBuf,
    /// Reject pages that have no uuid in front matter or on the CMS
    #[clap(long)]
    pub require_uuid: bool,
    /// Exit with an error when any page or collection failed
    #[clap(long)]
    pub strict: bool,
}

impl Default for SyncArgs {
    fn default() -> Self {
        Self {
            config: DEFAULT_CONFIG_PATH.to_string(),
            docs_prefix: DEFAULT_DOCS_PREFIX.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            root: PathBuf::from("."),
            require_uuid: false,
            strict: false,
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync(args) => run_sync(args).await,
        Commands::List { content_type } => run_list(content_type).await,
    }
}

async fn run_sync(args: SyncArgs) -> Result<()> {
    let settings = load_settings(&args)?;
    settings.trace_loaded();
    let client = ContentfulClient::new_from_env()?;
    let source = FsDocumentSource::new(&args.root);

    tracing::info!(command = "sync", "Starting synchronisation process");
    println!("Synchronise starting...");
    let report = synchronise(&client, &source, &settings).await;
    println!("{}", report.log);

    if let Some(e) = report.error {
        tracing::error!(command = "sync", error = %e, "Synchronisation failed");
        return Err(anyhow::Error::new(e).context("Synchronisation failed"));
    }

    let failed = report.log.count(Outcome::Failed);
    if args.strict && failed > 0 {
        tracing::error!(command = "sync", failed, "Strict mode: failed items in run log");
        anyhow::bail!("{failed} item(s) failed to synchronise");
    }

    tracing::info!(command = "sync", failed, "Synchronisation complete");
    println!("Synchronise complete.");
    Ok(())
}

async fn run_list(content_type: Option<EntryType>) -> Result<()> {
    let repository = load_repository()?;
    let client = ContentfulClient::new_from_env()?;

    let entries = list_repository_entries(&client, &repository, content_type).await?;
    for entry in &entries {
        println!(
            "{}\t{}\tv{}",
            entry.id(),
            entry.content_type_id().unwrap_or("-"),
            entry.sys.version.unwrap_or_default()
        );
    }
    tracing::info!(command = "list", count = entries.len(), "Listing complete");
    Ok(())
}
