use anyhow::{anyhow, Context};
use dotenvy::dotenv;
use migration::MigratorTrait;
use tracing::{error, info};

use service::seed::{self, AdminSeed, SeedOutcome};

const DEFAULT_ADMIN_EMAIL: &str = "devteam@example.com";

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string())
}

fn seed_from_env() -> anyhow::Result<AdminSeed> {
    let password = std::env::var("ADMIN_PASSWORD")
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("ADMIN_PASSWORD must be set"))?;
    Ok(AdminSeed {
        email: env_or("ADMIN_EMAIL", DEFAULT_ADMIN_EMAIL),
        password,
        first_name: env_or("ADMIN_FIRST_NAME", "Dev"),
        last_name: env_or("ADMIN_LAST_NAME", "Team"),
    })
}

async fn run() -> anyhow::Result<()> {
    let cfg = configs::AppConfig::load_or_env().context("loading configuration")?;
    let admin = seed_from_env()?;
    let db = models::db::connect_with_config(&models::db::DatabaseConfig::from(&cfg.database))
        .await
        .context("connecting to database")?;
    migration::Migrator::up(&db, None).await.context("running migrations")?;

    match seed::ensure_admin(&db, &admin).await? {
        SeedOutcome::Created(id) => info!(user_id = %id, email = %admin.email, "admin user created"),
        SeedOutcome::AlreadyExists(id) => info!(user_id = %id, email = %admin.email, "admin user already exists"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    dotenv().ok();
    common::utils::logging::init_logging_default();
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "create_admin failed");
            std::process::ExitCode::FAILURE
        }
    }
}
