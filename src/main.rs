//! drive_client CLI - Manage files in Google Drive.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use drive_client::{DriveClient, DriveConfig, DriveConfigBuilder, DEFAULT_PAGE_SIZE};

/// CLI tool for managing files in Google Drive.
#[derive(Parser)]
#[command(name = "drive_client")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to service account JSON credentials file.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Folder that uploads, listings and new folders are scoped to.
    #[arg(long, env = "GOOGLE_DRIVE_ROOT_FOLDER_ID")]
    root_folder: Option<String>,

    /// Operate on shared drives too; `--all-drives=false` overrides
    /// GOOGLE_DRIVE_SUPPORTS_ALL_DRIVES.
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    all_drives: Option<bool>,

    /// Attempts per request before giving up on transient errors.
    #[arg(long)]
    max_retries: Option<u32>,

    /// Delay between attempts, in milliseconds.
    #[arg(long)]
    retry_delay_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file.
    Upload {
        /// Local file to upload.
        path: PathBuf,

        /// Content type of the file, e.g. text/plain.
        mime_type: String,

        /// Destination folder ID (defaults to the root folder).
        #[arg(long)]
        parent: Option<String>,
    },

    /// List files.
    List {
        /// Drive query filter, e.g. "name contains 'report'".
        #[arg(long, short = 'q')]
        query: Option<String>,

        /// Maximum number of files to return.
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u32,
    },

    /// Download a file to the local filesystem.
    Download {
        /// File ID to download.
        file_id: String,

        /// Local destination path.
        dest: PathBuf,
    },

    /// Replace a file's content and/or rename it.
    Update {
        /// File ID to update.
        file_id: String,

        /// Local file with the new content.
        path: Option<PathBuf>,

        /// New display name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete a file.
    Delete {
        /// File ID to delete.
        file_id: String,
    },

    /// Show a file's metadata as JSON.
    Meta {
        /// File ID to inspect.
        file_id: String,
    },

    /// Create a folder.
    Mkdir {
        /// Folder name.
        name: String,

        /// Parent folder ID (defaults to the root folder).
        #[arg(long)]
        parent: Option<String>,
    },
}

/// Explicit CLI values; anything left unset falls back to the environment.
fn config_builder(cli: &Cli) -> DriveConfigBuilder {
    let mut builder = DriveConfig::builder();
    if let Some(path) = &cli.credentials {
        builder = builder.credentials_path(path);
    }
    if let Some(root) = &cli.root_folder {
        builder = builder.root_folder_id(root);
    }
    if let Some(enabled) = cli.all_drives {
        builder = builder.supports_all_drives(enabled);
    }
    if let Some(max_retries) = cli.max_retries {
        builder = builder.max_retries(max_retries);
    }
    if let Some(delay) = cli.retry_delay_ms {
        builder = builder.retry_delay_ms(delay);
    }
    builder
}

#[tokio::main]
async fn main() -> Result<()> {
    // Existing environment variables take precedence over .env entries.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let builder = config_builder(&cli);

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = builder.resolve().context("Invalid configuration")?;
    let client = DriveClient::new(config).context("Failed to create Drive client")?;

    match command {
        Commands::Upload {
            path,
            mime_type,
            parent,
        } => {
            let file = client
                .upload_file(&path, &mime_type, parent.as_deref())
                .await
                .with_context(|| format!("Failed to upload {:?}", path))?;

            println!("Uploaded: {} ({})", file.id, file.name);
            if let Some(link) = file.web_view_link {
                println!("Link: {}", link);
            }
        }

        Commands::List { query, page_size } => {
            let files = client
                .list_files(query.as_deref(), page_size)
                .await
                .context("Failed to list files")?;

            if files.is_empty() {
                println!("No files found.");
            } else {
                println!("{:<44} {:>10} {:<16} {:<30} {}", "ID", "SIZE", "MODIFIED", "TYPE", "NAME");
                println!("{}", "-".repeat(110));
                for file in files {
                    println!("{}", file);
                }
            }
        }

        Commands::Download { file_id, dest } => {
            if let Some(parent) = dest.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create directory: {:?}", parent))?;
                }
            }

            let bytes = client
                .download_file(&file_id, &dest)
                .await
                .with_context(|| format!("Failed to download file: {}", file_id))?;

            println!("Downloaded to {:?} ({} bytes)", dest, bytes);
        }

        Commands::Update {
            file_id,
            path,
            name,
        } => {
            let file = client
                .update_file(&file_id, path.as_deref(), name.as_deref())
                .await
                .with_context(|| format!("Failed to update file: {}", file_id))?;

            println!("Updated: {} ({})", file.id, file.name);
        }

        Commands::Delete { file_id } => {
            client
                .delete_file(&file_id)
                .await
                .with_context(|| format!("Failed to delete file: {}", file_id))?;

            println!("Deleted: {}", file_id);
        }

        Commands::Meta { file_id } => {
            let file = client
                .get_file_meta(&file_id)
                .await
                .with_context(|| format!("Failed to fetch metadata: {}", file_id))?;

            println!("{}", serde_json::to_string_pretty(&file)?);
        }

        Commands::Mkdir { name, parent } => {
            let folder = client
                .create_folder(&name, parent.as_deref())
                .await
                .with_context(|| format!("Failed to create folder: {}", name))?;

            println!("Created folder: {} ({})", folder.id, folder.name);
        }
    }

    Ok(())
}
