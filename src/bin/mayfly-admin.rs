use anyhow::Result;
use clap::{Parser, Subcommand};
use mayfly::clock;
use mayfly::config::{Config, StorageBackend};
use mayfly::lifecycle::{self, format_timestamp, PasteState};
use mayfly::storage::{self, sweeper};

#[derive(Parser)]
#[command(name = "mayfly-admin")]
#[command(about = "mayfly paste maintenance CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a paste's stored fields and current state without counting a view
    Show {
        /// Paste id
        id: String,
    },
    /// Delete a paste
    Delete {
        /// Paste id
        id: String,
    },
    /// Purge every paste whose storage expiry has passed
    Sweep,
}

fn describe(state: PasteState) -> &'static str {
    match state {
        PasteState::Available => "available",
        PasteState::Expired => "expired",
        PasteState::Exhausted => "exhausted",
        PasteState::Absent => "absent",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    if config.storage.backend == StorageBackend::Memory {
        eprintln!("⚠ STORAGE_BACKEND=memory: this process has its own empty store. Use sqlite or postgres.");
    }

    let storage = storage::connect(&config.storage).await?;

    match cli.command {
        Commands::Show { id } => match storage.get(&id).await? {
            Some(record) => {
                let state = lifecycle::evaluate(Some(&record), clock::now_ms());
                println!("{:<14} {}", "id", record.id);
                println!("{:<14} {}", "state", describe(state));
                println!("{:<14} {}", "created_at", format_timestamp(record.created_at));
                println!(
                    "{:<14} {}",
                    "expires_at",
                    lifecycle::expires_at_ms(&record)
                        .map(format_timestamp)
                        .unwrap_or_else(|| "never".to_string())
                );
                println!(
                    "{:<14} {}/{}",
                    "views",
                    record.views,
                    record
                        .max_views
                        .map(|max| max.to_string())
                        .unwrap_or_else(|| "unlimited".to_string())
                );
                println!("{:<14} {} bytes", "content", record.content.len());
            }
            None => println!("No paste with id '{}'", id),
        },
        Commands::Delete { id } => {
            if storage.delete(&id).await? {
                println!("✓ Deleted paste '{}'", id);
            } else {
                println!("⚠ No paste with id '{}'", id);
            }
        }
        Commands::Sweep => {
            let purged = sweeper::sweep_once(&storage).await?;
            println!("✓ Purged {} expired paste(s)", purged);
        }
    }

    storage.close().await;
    Ok(())
}
