mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use common::{services_over, settings, MemoryStore};
use skinshield_api::{
    error::AppError,
    models::audit::{AuditEntry, AuditQuery},
    services::ai::{ChatMessage, SYSTEM_PROMPT_KEY},
};

fn setup() -> (Arc<MemoryStore>, skinshield_api::services::Services) {
    let store = Arc::new(MemoryStore::default());
    let services = services_over(
        store.clone(),
        settings(Duration::from_secs(300), Duration::from_secs(120)),
    );
    (store, services)
}

#[tokio::test(start_paused = true)]
async fn flags_are_served_from_cache_within_ttl() {
    let (store, services) = setup();
    services
        .feature_flags
        .set_flag("barcode_scanner", true, None, None)
        .await
        .unwrap();

    assert!(services.feature_flags.is_enabled("barcode_scanner").await.unwrap());
    assert!(!services.feature_flags.is_enabled("unknown_flag").await.unwrap());
    tokio::time::advance(Duration::from_secs(299)).await;
    assert!(services.feature_flags.is_enabled("barcode_scanner").await.unwrap());
    assert_eq!(store.flag_queries.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    services.feature_flags.get_feature_flags().await.unwrap();
    assert_eq!(store.flag_queries.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn setting_a_flag_invalidates_the_cache() {
    let (store, services) = setup();
    assert!(!services.feature_flags.is_enabled("ai_assistant").await.unwrap());

    services
        .feature_flags
        .set_flag("ai_assistant", true, Some("chat tab"), Some(Uuid::new_v4()))
        .await
        .unwrap();
    assert!(services.feature_flags.is_enabled("ai_assistant").await.unwrap());
    assert_eq!(store.flag_queries.load(Ordering::SeqCst), 2);

    let err = services
        .feature_flags
        .set_flag("Bad Key!", true, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test(start_paused = true)]
async fn prompt_activation_replaces_cached_version() {
    let (store, services) = setup();
    let v1 = services
        .prompts
        .create_version(SYSTEM_PROMPT_KEY, "You help kids with skincare.", None, None, true)
        .await
        .unwrap();
    assert_eq!(v1.version, 1);
    assert!(v1.is_active);

    let draft = services
        .prompts
        .create_version(SYSTEM_PROMPT_KEY, "Be brief and kind.", Some("gpt-4o"), None, false)
        .await
        .unwrap();
    assert_eq!(draft.version, 2);
    assert!(!draft.is_active);

    let loaded = services.prompts.get_prompt(SYSTEM_PROMPT_KEY).await.unwrap();
    assert_eq!(loaded.version, 1);
    services.prompts.get_prompt(SYSTEM_PROMPT_KEY).await.unwrap();
    assert_eq!(store.prompt_queries.load(Ordering::SeqCst), 1);

    services
        .prompts
        .activate_version(SYSTEM_PROMPT_KEY, 2)
        .await
        .unwrap();
    let loaded = services.prompts.get_prompt(SYSTEM_PROMPT_KEY).await.unwrap();
    assert_eq!(loaded.version, 2);
    assert_eq!(loaded.model.as_deref(), Some("gpt-4o"));

    let versions = services.prompts.list_versions(SYSTEM_PROMPT_KEY).await.unwrap();
    assert_eq!(versions.iter().filter(|v| v.is_active).count(), 1);

    let err = services
        .prompts
        .activate_version(SYSTEM_PROMPT_KEY, 9)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn missing_prompt_is_not_found() {
    let (_store, services) = setup();
    let err = services.prompts.get_prompt("nope").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn audit_log_pages_newest_first() {
    let (store, services) = setup();
    let admin = Uuid::new_v4();
    for i in 0..3 {
        services
            .audit
            .record(&AuditEntry::new(admin, "approval.approve").resource("approval", i))
            .await
            .unwrap();
    }
    services
        .audit
        .record(&AuditEntry::new(admin, "feature_flag.set").resource("feature_flag", "ai_assistant"))
        .await
        .unwrap();

    // fire-and-forget path
    services.audit.log(AuditEntry::new(admin, "prompt.activate"));
    for _ in 0..10 {
        if store.audit_rows().len() == 5 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(store.audit_rows().len(), 5);

    let page = services
        .audit
        .list(&AuditQuery {
            page: Some(1),
            limit: Some(2),
            action: Some("approval.".into()),
        })
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.entries.len(), 2);
    assert_eq!(page.entries[0].resource_id.as_deref(), Some("2"));

    let all = services.audit.list(&AuditQuery::default()).await.unwrap();
    assert_eq!(all.limit, 50);
    assert_eq!(all.entries[0].action, "prompt.activate");
}

#[tokio::test]
async fn far_audit_page_is_empty_not_an_error() {
    let (_store, services) = setup();
    services
        .audit
        .record(&AuditEntry::new(Uuid::new_v4(), "approval.decline"))
        .await
        .unwrap();

    let page = services
        .audit
        .list(&AuditQuery {
            page: Some(i64::MAX),
            limit: Some(200),
            action: None,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert!(page.entries.is_empty());
    assert_eq!(page.page, i64::MAX / 200);
}

#[tokio::test]
async fn chat_is_unavailable_until_enabled_and_configured() {
    let (_store, services) = setup();
    let messages = vec![ChatMessage {
        role: "user".into(),
        content: "Can I use retinol?".into(),
    }];

    let err = services.ai.chat(&messages).await.unwrap_err();
    assert!(matches!(err, AppError::Unavailable(_)));

    services
        .feature_flags
        .set_flag("ai_assistant", true, None, None)
        .await
        .unwrap();
    // still no API key configured
    let err = services.ai.chat(&messages).await.unwrap_err();
    assert!(matches!(err, AppError::Unavailable(_)));
}
