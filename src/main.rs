use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docstore_core::constants::DOCSTORE_ROOT_ENV;
use docstore_core::{DocstoreConfig, DocumentId, DocumentRecord, DocumentService, NewDocument};

#[derive(Parser)]
#[command(name = "docstore")]
#[command(about = "Document store and indexer")]
struct Cli {
    /// Store root directory (default: $DOCSTORE_ROOT, then ./docstore_data)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a file and render its thumbnail
    Add {
        /// File to index; its name is kept as the original filename
        path: PathBuf,
        #[arg(long)]
        title: Option<String>,
        /// Tag to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        source_url: Option<String>,
        /// Expected SHA-256 of the file, optionally prefixed with `sha256:`
        #[arg(long)]
        checksum: Option<String>,
    },
    /// Show one document
    Get {
        /// Document id
        id: String,
    },
    /// List documents, optionally only those carrying every given tag
    List {
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Render the thumbnail of every document again
    RecreateThumbnails,
}

/// Entry point for the `docstore` command.
///
/// # Environment Variables
/// - `DOCSTORE_ROOT`: store root directory, overridden by `--root`
/// - `RUST_LOG`: log filter (default adds `docstore=info`)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("docstore=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let cfg = DocstoreConfig::resolve(cli.root, std::env::var(DOCSTORE_ROOT_ENV).ok())?;
    tracing::debug!(root = %cfg.root().display(), "using docstore root");
    let service = Arc::new(DocumentService::open(&cfg)?);

    match cli.command {
        Some(Commands::Add {
            path,
            title,
            tags,
            source_url,
            checksum,
        }) => {
            let file = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;

            let mut doc = NewDocument::new(file).with_tags(tags);
            doc.filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned());
            doc.title = title;
            doc.source_url = source_url;
            doc.sha256_checksum = checksum;

            let (id, mut record) = service.upload(doc)?;
            if let Some(updated) = service.spawn_thumbnail(id.clone()).await? {
                record = updated;
            }
            print_document(id.as_str(), &record)?;
        }
        Some(Commands::Get { id }) => {
            let id = DocumentId::new(id)?;
            let record = service.get(&id)?;
            print_document(id.as_str(), &record)?;
        }
        Some(Commands::List { tags }) => {
            let documents = service.query(tags.as_slice())?;
            if documents.is_empty() {
                println!("No documents found.");
            } else {
                for (id, record) in documents {
                    println!(
                        "{id}  {}  {}",
                        record.file_identifier,
                        record.title.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        Some(Commands::RecreateThumbnails) => {
            let service = Arc::clone(&service);
            let created =
                tokio::task::spawn_blocking(move || service.recreate_thumbnails()).await??;
            println!("Recreated {created} thumbnails.");
        }
        None => {
            println!("Use 'docstore --help' for commands");
        }
    }

    Ok(())
}

fn print_document(id: &str, record: &DocumentRecord) -> anyhow::Result<()> {
    let mut value = record.to_value()?;
    if let Some(object) = value.as_object_mut() {
        object.insert("id".into(), serde_json::Value::from(id));
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
