pub mod approvals;
pub mod audit;
pub mod family;
pub mod feature_flags;
pub mod library;
pub mod notifications;
pub mod products;
pub mod prompts;
pub mod routines;
pub mod wishlist;

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub use approvals::ApprovalRepository;
pub use audit::AuditRepository;
pub use family::FamilyRepository;
pub use feature_flags::FeatureFlagRepository;
pub use library::LibraryRepository;
pub use notifications::NotificationRepository;
pub use products::ProductRepository;
pub use prompts::PromptRepository;
pub use routines::RoutineRepository;
pub use wishlist::WishlistRepository;

pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run the schema migrations embedded from ./migrations/
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed implementation of every repository trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Every repository the services need, as trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub approvals: Arc<dyn ApprovalRepository>,
    pub audit: Arc<dyn AuditRepository>,
    pub family: Arc<dyn FamilyRepository>,
    pub feature_flags: Arc<dyn FeatureFlagRepository>,
    pub library: Arc<dyn LibraryRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub prompts: Arc<dyn PromptRepository>,
    pub routines: Arc<dyn RoutineRepository>,
    pub wishlist: Arc<dyn WishlistRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }

    /// Wires a single store that implements every repository trait.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ApprovalRepository
            + AuditRepository
            + FamilyRepository
            + FeatureFlagRepository
            + LibraryRepository
            + NotificationRepository
            + ProductRepository
            + PromptRepository
            + RoutineRepository
            + WishlistRepository
            + 'static,
    {
        Self {
            approvals: store.clone(),
            audit: store.clone(),
            family: store.clone(),
            feature_flags: store.clone(),
            library: store.clone(),
            notifications: store.clone(),
            products: store.clone(),
            prompts: store.clone(),
            routines: store.clone(),
            wishlist: store,
        }
    }
}
