/// Expire approvals that stayed pending too long
/// Run from cron when the API's hourly sweep is disabled or for backfills
///
/// Usage: expire-approvals [--days N]
///   --days N  : Maximum age of a pending approval (default: APPROVAL_EXPIRY_DAYS or 7)

use std::time::Duration;

use clap::Parser;
use skinshield_api::{
    db::{self, Repositories},
    services::{ai::AiSettings, ServiceSettings, Services},
};

#[derive(Parser)]
#[command(name = "expire-approvals", about = "Expire stale pending product approvals")]
struct Args {
    /// Maximum age in days of a pending approval
    #[arg(long, env = "APPROVAL_EXPIRY_DAYS", default_value_t = 7)]
    days: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    if args.days < 1 {
        anyhow::bail!("--days must be at least 1");
    }

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;
    let pool = db::create_pool(&database_url).await?;

    // Only the approval workflow is used; caches and AI stay idle.
    let settings = ServiceSettings {
        fcm_api_key: std::env::var("FCM_API_KEY").ok().filter(|s| !s.is_empty()),
        feature_flag_ttl: Duration::from_secs(300),
        prompt_ttl: Duration::from_secs(120),
        ai: AiSettings {
            provider: skinshield_api::services::ai::AiProvider::OpenAi,
            api_key: None,
            model: String::new(),
            base_url: None,
        },
    };
    let services = Services::new(&Repositories::postgres(pool), settings);

    tracing::info!("Expiring approvals pending for more than {} day(s)...", args.days);
    let expired = services
        .approvals
        .expire_stale(chrono::Duration::days(args.days))
        .await?;
    tracing::info!("Expired {} approval(s)", expired);

    Ok(())
}
