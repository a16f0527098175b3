use std::sync::Arc;

use crate::{
    db::{AuditRepository, Repositories},
    error::AppResult,
    models::audit::{AuditEntry, AuditPage, AuditQuery},
};

pub struct AuditLogger {
    repo: Arc<dyn AuditRepository>,
}

impl AuditLogger {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            repo: repos.audit.clone(),
        }
    }

    /// Fire-and-forget audit log entry.
    /// Spawns a background task, never blocks the request handler,
    /// never propagates errors (logs a warning on failure).
    pub fn log(&self, entry: AuditEntry) {
        let repo = self.repo.clone();
        tokio::spawn(async move {
            if let Err(e) = repo.insert_audit(&entry).await {
                tracing::warn!("audit log insert failed for '{}': {e}", entry.action);
            }
        });
    }

    /// Awaited variant for callers that need the row written before replying.
    pub async fn record(&self, entry: &AuditEntry) -> AppResult<()> {
        self.repo.insert_audit(entry).await?;
        Ok(())
    }

    pub async fn list(&self, query: &AuditQuery) -> AppResult<AuditPage> {
        let limit = query.limit.unwrap_or(50).clamp(1, 200);
        // keeps the offset below i64::MAX for any limit up to 200
        let page = query.page.unwrap_or(1).clamp(1, i64::MAX / 200);
        let offset = (page - 1) * limit;

        let (entries, total) = self
            .repo
            .list_audit(query.action.as_deref(), limit, offset)
            .await?;
        Ok(AuditPage {
            entries,
            total,
            page,
            limit,
        })
    }
}
