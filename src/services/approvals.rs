use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    db::{
        ApprovalRepository, LibraryRepository, ProductRepository, Repositories,
        RoutineRepository, WishlistRepository,
    },
    error::{AppError, AppResult},
    models::{
        approval::{
            get_highest_severity, ApprovalAction, ApprovalDetail, ApprovalStatus, NewApproval,
            NewApprovalHistory, PendingApproval, ProductApproval, ProductFlag, ReviewRequest,
            StatusChange,
        },
        auth::AuthenticatedUser,
        routine::RoutineStep,
        shelf::{ChildProduct, NewChildProduct},
        wishlist::WishlistStatus,
    },
    services::{
        family::FamilyService,
        metrics::{APPROVAL_DECISIONS_COUNTER, APPROVAL_REQUESTS_COUNTER},
        notifications::Notifier,
    },
};

/// Result of a parent decision. The status change and its history row are
/// always written; the side effects listed after them are best effort and
/// anything that failed is reported in `warnings`.
#[derive(Debug, Serialize)]
pub struct ApprovalOutcome {
    pub approval: ProductApproval,
    pub child_product: Option<ChildProduct>,
    pub routine_step: Option<RoutineStep>,
    pub warnings: Vec<String>,
}

pub struct ApprovalService {
    approvals: Arc<dyn ApprovalRepository>,
    library: Arc<dyn LibraryRepository>,
    routines: Arc<dyn RoutineRepository>,
    wishlist: Arc<dyn WishlistRepository>,
    products: Arc<dyn ProductRepository>,
    family: Arc<FamilyService>,
    notifications: Arc<dyn Notifier>,
}

impl ApprovalService {
    pub fn new(
        repos: &Repositories,
        family: Arc<FamilyService>,
        notifications: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            approvals: repos.approvals.clone(),
            library: repos.library.clone(),
            routines: repos.routines.clone(),
            wishlist: repos.wishlist.clone(),
            products: repos.products.clone(),
            family,
            notifications,
        }
    }

    /// Review queue for a parent: pending approvals of every child they
    /// manage, each with its flags and highest severity.
    pub async fn get_pending_approvals(&self, parent_id: Uuid) -> AppResult<Vec<PendingApproval>> {
        let rows = self.approvals.list_pending_for_parent(parent_id).await?;
        let ids: Vec<Uuid> = rows.iter().map(|r| r.approval.id).collect();
        let mut flags_by_approval = group_flags(self.approvals.flags_for(&ids).await?);

        Ok(rows
            .into_iter()
            .map(|row| {
                let flags = flags_by_approval.remove(&row.approval.id).unwrap_or_default();
                PendingApproval {
                    highest_severity: get_highest_severity(flags.iter().map(|f| &f.severity)),
                    approval: row.approval,
                    child_name: row.child_name,
                    flags,
                }
            })
            .collect())
    }

    pub async fn get_approval(
        &self,
        user: &AuthenticatedUser,
        approval_id: Uuid,
    ) -> AppResult<ApprovalDetail> {
        let approval = self.fetch(approval_id).await?;
        self.family.ensure_access(user, approval.child_id).await?;

        let flags = self.approvals.flags_for(&[approval.id]).await?;
        let history = self.approvals.history_for(approval.id).await?;
        Ok(ApprovalDetail {
            highest_severity: get_highest_severity(flags.iter().map(|f| &f.severity)),
            approval,
            flags,
            history,
        })
    }

    pub async fn list_for_child(
        &self,
        user: &AuthenticatedUser,
        child_id: Uuid,
    ) -> AppResult<Vec<ProductApproval>> {
        self.family.ensure_access(user, child_id).await?;
        Ok(self.approvals.list_for_child(child_id).await?)
    }

    /// Opens a review for the child's owning parent and tells every
    /// parent of the child about it.
    pub async fn request_review(
        &self,
        child_id: Uuid,
        request: ReviewRequest,
        source: &str,
    ) -> AppResult<ProductApproval> {
        if request.product_name.trim().is_empty() {
            return Err(AppError::validation("product_name is required"));
        }
        let child = self.family.get_child(child_id).await?;
        if let Some(item_id) = request.wishlist_item_id {
            self.check_wishlist_link(child_id, item_id).await?;
        }

        let approval = self
            .approvals
            .create(&NewApproval {
                child_id,
                parent_id: child.parent_id,
                request,
            })
            .await?;

        self.approvals
            .insert_history(&NewApprovalHistory {
                approval_id: approval.id,
                action: ApprovalStatus::Pending.into(),
                actor_id: Some(child_id),
                notes: approval.child_notes.clone(),
            })
            .await?;

        APPROVAL_REQUESTS_COUNTER.with_label_values(&[source]).inc();
        tracing::info!(
            approval_id = %approval.id,
            child_id = %child_id,
            source,
            "product review requested"
        );

        let body = format!("{} would like to use {}", child.display_name, approval.product_name);
        for parent_id in self.family.parents_of(child_id).await? {
            if let Err(e) = self
                .notifications
                .notify_user(
                    parent_id,
                    "New product to review",
                    &body,
                    Some(json!({ "type": "approval_request", "approval_id": approval.id })),
                )
                .await
            {
                tracing::warn!("review request notification to {parent_id} failed: {e}");
            }
        }

        Ok(approval)
    }

    pub async fn approve_product(&self, action: ApprovalAction) -> AppResult<ApprovalOutcome> {
        let approval = self.decide(&action, ApprovalStatus::Approved).await?;
        let mut warnings = Vec::new();

        let pao_months = match approval.product_id {
            Some(product_id) => match self.products.get(product_id).await {
                Ok(product) => product.and_then(|p| p.pao_months),
                Err(e) => {
                    tracing::warn!("product lookup for {product_id} failed: {e}");
                    None
                }
            },
            None => None,
        };

        let child_product = match self
            .library
            .add_product(&NewChildProduct {
                child_id: approval.child_id,
                product_id: approval.product_id,
                product_name: approval.product_name.clone(),
                brand: approval.brand.clone(),
                image_url: approval.image_url.clone(),
                approval_id: Some(approval.id),
                pao_months,
                expiry_date: None,
            })
            .await
        {
            Ok(product) => Some(product),
            Err(e) => {
                tracing::warn!(approval_id = %approval.id, "adding to library failed: {e}");
                warnings.push(format!("could not add product to library: {e}"));
                None
            }
        };

        let mut routine_step = None;
        if action.add_to_routine {
            match &child_product {
                Some(product) => {
                    match self
                        .routines
                        .add_step(approval.child_id, product.id, action.routine_slot)
                        .await
                    {
                        Ok(Some(step)) => routine_step = Some(step),
                        Ok(None) => warnings.push(format!(
                            "product is already in the {} routine",
                            action.routine_slot.as_str()
                        )),
                        Err(e) => {
                            tracing::warn!(approval_id = %approval.id, "adding to routine failed: {e}");
                            warnings.push(format!("could not add product to routine: {e}"));
                        }
                    }
                }
                None => warnings.push("routine skipped: product is not in the library".into()),
            }
        }

        if let Some(warning) = self
            .sync_wishlist(&approval, WishlistStatus::Approved)
            .await
        {
            warnings.push(warning);
        }

        self.notify_child(
            &approval,
            "Product approved ✨",
            &format!("{} is approved. Enjoy!", approval.product_name),
        )
        .await;

        Ok(ApprovalOutcome {
            approval,
            child_product,
            routine_step,
            warnings,
        })
    }

    pub async fn decline_product(&self, action: ApprovalAction) -> AppResult<ApprovalOutcome> {
        let approval = self.decide(&action, ApprovalStatus::Declined).await?;
        let mut warnings = Vec::new();

        if let Some(warning) = self
            .sync_wishlist(&approval, WishlistStatus::NotApproved)
            .await
        {
            warnings.push(warning);
        }

        let body = match &approval.parent_notes {
            Some(notes) => format!("{} was not approved: {notes}", approval.product_name),
            None => format!("{} was not approved", approval.product_name),
        };
        self.notify_child(&approval, "Product not approved", &body).await;

        Ok(ApprovalOutcome {
            approval,
            child_product: None,
            routine_step: None,
            warnings,
        })
    }

    /// Expires approvals left pending longer than `max_age` and returns how
    /// many were expired. Linked wishlist items go back to `saved`.
    pub async fn expire_stale(&self, max_age: Duration) -> AppResult<usize> {
        let cutoff = Utc::now() - max_age;
        let stale = self.approvals.list_stale_pending(cutoff).await?;
        let notes = format!("No decision within {} days", max_age.num_days());
        let mut expired = 0;

        for approval in stale {
            if self.close(&approval, None, &notes).await?.is_some() {
                expired += 1;
            }
        }

        if expired > 0 {
            tracing::info!("expired {expired} stale approval(s)");
        }
        Ok(expired)
    }

    /// Pending approval opened from the given wishlist item, if any.
    pub async fn pending_for_item(&self, item_id: Uuid) -> AppResult<Option<ProductApproval>> {
        Ok(self.approvals.pending_for_wishlist_item(item_id).await?)
    }

    /// The item was taken back: the pending approval is closed as
    /// expired and the item returns to `saved`.
    pub async fn withdraw(
        &self,
        approval: &ProductApproval,
        actor_id: Uuid,
    ) -> AppResult<ProductApproval> {
        self.close(approval, Some(actor_id), "Withdrawn from the wishlist")
            .await?
            .ok_or_else(|| AppError::Conflict("Approval was already reviewed".into()))
    }

    /// Moves a pending approval to `expired` and releases its wishlist item.
    /// `None` when it was decided in the meantime.
    async fn close(
        &self,
        approval: &ProductApproval,
        actor_id: Option<Uuid>,
        notes: &str,
    ) -> AppResult<Option<ProductApproval>> {
        let change = StatusChange {
            from: ApprovalStatus::Pending,
            to: ApprovalStatus::Expired,
            reviewed_by: None,
            parent_notes: None,
            at: Utc::now(),
        };
        let Some(updated) = self.approvals.set_status(approval.id, &change).await? else {
            return Ok(None);
        };

        self.approvals
            .insert_history(&NewApprovalHistory {
                approval_id: updated.id,
                action: ApprovalStatus::Expired.into(),
                actor_id,
                notes: Some(notes.to_string()),
            })
            .await?;
        APPROVAL_DECISIONS_COUNTER
            .with_label_values(&[ApprovalStatus::Expired.as_str()])
            .inc();

        if let Some(warning) = self.sync_wishlist(&updated, WishlistStatus::Saved).await {
            tracing::warn!(approval_id = %updated.id, "{warning}");
        }
        Ok(Some(updated))
    }

    /// A review may only point at the child's own item, and only while that
    /// item is waiting for this review.
    async fn check_wishlist_link(&self, child_id: Uuid, item_id: Uuid) -> AppResult<()> {
        let item = self
            .wishlist
            .get_item(item_id)
            .await?
            .ok_or(AppError::NotFound("Wishlist item"))?;
        if item.profile_id != child_id {
            return Err(AppError::Forbidden);
        }
        if item.status != WishlistStatus::AwaitingApproval {
            return Err(AppError::validation(
                "wishlist item is not awaiting approval",
            ));
        }
        if self
            .approvals
            .pending_for_wishlist_item(item_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "wishlist item already has a pending review".into(),
            ));
        }
        Ok(())
    }

    async fn fetch(&self, approval_id: Uuid) -> AppResult<ProductApproval> {
        self.approvals
            .get(approval_id)
            .await?
            .ok_or(AppError::NotFound("Approval"))
    }

    /// Checks ownership and the state machine, then writes the decision and
    /// its history row.
    async fn decide(
        &self,
        action: &ApprovalAction,
        to: ApprovalStatus,
    ) -> AppResult<ProductApproval> {
        let approval = self.fetch(action.approval_id).await?;

        if !self
            .family
            .is_parent_of(action.parent_id, approval.child_id)
            .await?
        {
            return Err(AppError::Forbidden);
        }
        if !approval.status.can_transition_to(to) {
            return Err(AppError::InvalidTransition {
                entity: "approval",
                from: approval.status.to_string(),
                to: to.to_string(),
            });
        }

        let change = StatusChange {
            from: approval.status,
            to,
            reviewed_by: Some(action.parent_id),
            parent_notes: action.parent_notes.clone(),
            at: Utc::now(),
        };
        let updated = self
            .approvals
            .set_status(approval.id, &change)
            .await?
            .ok_or_else(|| AppError::Conflict("Approval was already reviewed".into()))?;

        self.approvals
            .insert_history(&NewApprovalHistory {
                approval_id: updated.id,
                action: to.into(),
                actor_id: Some(action.parent_id),
                notes: action.parent_notes.clone(),
            })
            .await?;

        APPROVAL_DECISIONS_COUNTER.with_label_values(&[to.as_str()]).inc();
        tracing::info!(
            approval_id = %updated.id,
            parent_id = %action.parent_id,
            status = %to,
            "approval decided"
        );
        Ok(updated)
    }

    /// Moves the linked wishlist item out of `awaiting_approval`.
    async fn sync_wishlist(
        &self,
        approval: &ProductApproval,
        to: WishlistStatus,
    ) -> Option<String> {
        let item_id = approval.wishlist_item_id?;
        match self
            .wishlist
            .set_status(item_id, WishlistStatus::AwaitingApproval, to)
            .await
        {
            Ok(Some(_)) => None,
            Ok(None) => Some(format!(
                "wishlist item {item_id} was no longer awaiting approval"
            )),
            Err(e) => {
                tracing::warn!(approval_id = %approval.id, "wishlist update failed: {e}");
                Some(format!("could not update wishlist item: {e}"))
            }
        }
    }

    async fn notify_child(&self, approval: &ProductApproval, title: &str, body: &str) {
        let data = json!({
            "type": "approval_decision",
            "approval_id": approval.id,
            "status": approval.status,
        });
        if let Err(e) = self
            .notifications
            .notify_user(approval.child_id, title, body, Some(data))
            .await
        {
            tracing::warn!(approval_id = %approval.id, "child notification failed: {e}");
        }
    }
}

fn group_flags(flags: Vec<ProductFlag>) -> HashMap<Uuid, Vec<ProductFlag>> {
    let mut grouped: HashMap<Uuid, Vec<ProductFlag>> = HashMap::new();
    for flag in flags {
        grouped.entry(flag.approval_id).or_default().push(flag);
    }
    grouped
}
