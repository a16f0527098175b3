pub mod ai;
pub mod approval_expiry;
pub mod approvals;
pub mod audit;
pub mod family;
pub mod feature_flags;
pub mod metrics;
pub mod notifications;
pub mod products;
pub mod prompts;
pub mod routines;
pub mod shelf;
pub mod wishlist;

use std::sync::Arc;
use std::time::Duration;

use crate::{config::Config, db::Repositories};

use ai::{AiService, AiSettings};
use approvals::ApprovalService;
use audit::AuditLogger;
use family::FamilyService;
use feature_flags::FeatureFlagService;
use notifications::NotificationService;
use products::ProductService;
use prompts::PromptLoader;
use routines::RoutineService;
use shelf::ShelfService;
use wishlist::WishlistService;

/// Knobs the services need from the environment.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub fcm_api_key: Option<String>,
    pub feature_flag_ttl: Duration,
    pub prompt_ttl: Duration,
    pub ai: AiSettings,
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            fcm_api_key: config.fcm_api_key.clone(),
            feature_flag_ttl: config.feature_flag_ttl,
            prompt_ttl: config.prompt_ttl,
            ai: AiSettings {
                provider: config.ai_provider,
                api_key: config.ai_api_key.clone(),
                model: config.ai_model.clone(),
                base_url: config.ai_base_url.clone(),
            },
        }
    }
}

/// Every service, wired once at startup and shared through `AppState`.
#[derive(Clone)]
pub struct Services {
    pub family: Arc<FamilyService>,
    pub notifications: Arc<NotificationService>,
    pub products: Arc<ProductService>,
    pub approvals: Arc<ApprovalService>,
    pub wishlist: Arc<WishlistService>,
    pub shelf: Arc<ShelfService>,
    pub routines: Arc<RoutineService>,
    pub feature_flags: Arc<FeatureFlagService>,
    pub prompts: Arc<PromptLoader>,
    pub audit: Arc<AuditLogger>,
    pub ai: Arc<AiService>,
}

impl Services {
    pub fn new(repos: &Repositories, settings: ServiceSettings) -> Self {
        let family = Arc::new(FamilyService::new(repos.family.clone()));
        let notifications = Arc::new(NotificationService::new(
            repos.notifications.clone(),
            settings.fcm_api_key,
        ));
        let approvals = Arc::new(ApprovalService::new(
            repos,
            family.clone(),
            notifications.clone(),
        ));
        let feature_flags = Arc::new(FeatureFlagService::new(repos, settings.feature_flag_ttl));
        let prompts = Arc::new(PromptLoader::new(repos, settings.prompt_ttl));

        Self {
            products: Arc::new(ProductService::new(repos)),
            wishlist: Arc::new(WishlistService::new(repos, family.clone(), approvals.clone())),
            shelf: Arc::new(ShelfService::new(repos, family.clone())),
            routines: Arc::new(RoutineService::new(repos, family.clone())),
            audit: Arc::new(AuditLogger::new(repos)),
            ai: Arc::new(AiService::new(settings.ai, feature_flags.clone(), prompts.clone())),
            family,
            notifications,
            approvals,
            feature_flags,
            prompts,
        }
    }
}
