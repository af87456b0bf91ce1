//! One-shot operational commands that don't fit the `task` subcommand (which
//! needs a task name known to loco's own CLI parser ahead of time). `tool`
//! boots the same `App`/`Migrator` pair as `galleryd-cli` in `ServerOnly`
//! mode just to get a `db` connection and `Settings`, runs one operation,
//! then exits.

use clap::{Parser, Subcommand};
use galleryd::common::settings::Settings;
use galleryd::models::users;
use galleryd::pipeline::recovery;
use galleryd::queue::pg_queue::PgJobQueue;
use galleryd::storage::StorageAdapter;
use loco_rs::boot::{create_app, StartMode};
use loco_rs::environment::Environment;
use migration::Migrator;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the object storage bucket if it doesn't already exist.
    EnsureBucket,
    /// Create the admin user, or rotate its password if it already exists.
    SeedAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Run the crash-recovery sweep once, out of band of the periodic
    /// in-process sweep, and print how many photos were requeued.
    RecoverStuck,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let environment: Environment = std::env::var("LOCO_ENV")
        .unwrap_or_else(|_| "development".to_string())
        .into();
    let boot = create_app::<galleryd::app::App, Migrator>(StartMode::ServerOnly, &environment).await?;
    let settings = Settings::from_context(&boot.app_context);
    let db = galleryd::db::build_adapter(&settings.database, boot.app_context.db.clone())?;

    match cli.command {
        Command::EnsureBucket => {
            let storage = galleryd::storage::build_adapter(&settings.storage)?;
            storage.ensure_bucket().await?;
            println!("bucket {} ready", settings.storage.bucket);
        }
        Command::SeedAdmin { email, password } => {
            let admin = users::seed_admin(db.as_ref(), &email, &password).await?;
            println!("admin user ready: {} ({})", admin.email, admin.id);
        }
        Command::RecoverStuck => {
            let queue = PgJobQueue::new(db.clone());
            let recovered =
                recovery::sweep(db.as_ref(), &queue, settings.pipeline.recovery_horizon_ms).await?;
            println!("recovered {recovered} stuck photo(s)");
        }
    }

    Ok(())
}
