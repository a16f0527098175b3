use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{LibraryRepository, ProductRepository, Repositories, WishlistRepository},
    error::{AppError, AppResult},
    models::{
        approval::{
            ApprovalAction, ApproveRequest, DeclineRequest, ProductApproval, ReviewRequest,
        },
        auth::AuthenticatedUser,
        shelf::{ChildProduct, NewChildProduct},
        wishlist::{
            AddWishlistItemRequest, CreateWishlistGroupRequest, NewWishlistItem,
            UpdateWishlistGroupRequest, WishlistGroup, WishlistGroupSummary, WishlistItem,
            WishlistItemView, WishlistStatus,
        },
    },
    services::{
        approvals::ApprovalService, family::FamilyService, metrics::WISHLIST_TRANSITIONS_COUNTER,
    },
};

#[derive(Debug, Serialize)]
pub struct ApprovalRequested {
    pub item: WishlistItem,
    pub approval: ProductApproval,
}

pub struct WishlistService {
    repo: Arc<dyn WishlistRepository>,
    products: Arc<dyn ProductRepository>,
    library: Arc<dyn LibraryRepository>,
    family: Arc<FamilyService>,
    approvals: Arc<ApprovalService>,
}

impl WishlistService {
    pub fn new(
        repos: &Repositories,
        family: Arc<FamilyService>,
        approvals: Arc<ApprovalService>,
    ) -> Self {
        Self {
            repo: repos.wishlist.clone(),
            products: repos.products.clone(),
            library: repos.library.clone(),
            family,
            approvals,
        }
    }

    // ── Items ───────────────────────────────────────────────────────────────

    pub async fn add_item(
        &self,
        user: &AuthenticatedUser,
        profile_id: Uuid,
        req: &AddWishlistItemRequest,
    ) -> AppResult<WishlistItemView> {
        self.family.ensure_access(user, profile_id).await?;

        let new = match req.product_id {
            Some(product_id) => {
                let product = self
                    .products
                    .get(product_id)
                    .await?
                    .ok_or(AppError::NotFound("Product"))?;
                NewWishlistItem {
                    profile_id,
                    product_id: Some(product.id),
                    product_name: product.name,
                    brand: product.brand,
                    image_url: product.image_url,
                    safety_score: product.safety_score,
                    rating: product.rating,
                    notes: req.notes.clone(),
                }
            }
            None => {
                let name = req
                    .product_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| AppError::validation("product_id or product_name is required"))?;
                NewWishlistItem {
                    profile_id,
                    product_id: None,
                    product_name: name.to_string(),
                    brand: req.brand.clone(),
                    image_url: req.image_url.clone(),
                    safety_score: None,
                    rating: None,
                    notes: req.notes.clone(),
                }
            }
        };

        for group_id in &req.group_ids {
            self.owned_group(profile_id, *group_id).await?;
        }

        let item = self.repo.create_item(&new).await?;
        for group_id in &req.group_ids {
            self.repo.add_item_to_group(item.id, *group_id).await?;
        }

        Ok(WishlistItemView {
            item,
            group_ids: req.group_ids.clone(),
        })
    }

    pub async fn list_items(
        &self,
        user: &AuthenticatedUser,
        profile_id: Uuid,
        status: Option<WishlistStatus>,
    ) -> AppResult<Vec<WishlistItemView>> {
        self.family.ensure_access(user, profile_id).await?;

        let items = self.repo.list_items(profile_id, status).await?;
        let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        let mut groups: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for m in self.repo.memberships(&ids).await? {
            groups.entry(m.item_id).or_default().push(m.group_id);
        }

        Ok(items
            .into_iter()
            .map(|item| WishlistItemView {
                group_ids: groups.remove(&item.id).unwrap_or_default(),
                item,
            })
            .collect())
    }

    pub async fn update_item(
        &self,
        user: &AuthenticatedUser,
        item_id: Uuid,
        notes: Option<&str>,
    ) -> AppResult<WishlistItem> {
        self.owned_item(user, item_id).await?;
        self.repo
            .update_notes(item_id, notes)
            .await?
            .ok_or(AppError::NotFound("Wishlist item"))
    }

    pub async fn remove_item(&self, user: &AuthenticatedUser, item_id: Uuid) -> AppResult<()> {
        self.owned_item(user, item_id).await?;
        self.repo.delete_item(item_id).await?;
        Ok(())
    }

    /// Manual status change. Entering `awaiting_approval` or `on_shelf` has
    /// side effects and goes through [`Self::request_approval`] and
    /// [`Self::move_to_shelf`]; deciding is for parents only. While a review
    /// is pending, decisions and withdrawals act on that review so the
    /// parent's queue stays in step with the item.
    pub async fn set_status(
        &self,
        user: &AuthenticatedUser,
        item_id: Uuid,
        to: WishlistStatus,
    ) -> AppResult<WishlistItem> {
        let item = self.owned_item(user, item_id).await?;
        match to {
            WishlistStatus::AwaitingApproval => {
                return Err(AppError::validation("use request-approval to ask a parent"))
            }
            WishlistStatus::OnShelf => {
                return Err(AppError::validation("use the shelf action to move an item"))
            }
            WishlistStatus::Approved | WishlistStatus::NotApproved => {
                self.family.ensure_parent(user, item.profile_id).await?
            }
            WishlistStatus::Saved => {}
        }
        if !item.status.can_transition_to(to) {
            return Err(invalid_transition(item.status, to));
        }

        let pending = match item.status {
            WishlistStatus::AwaitingApproval => self.approvals.pending_for_item(item.id).await?,
            _ => None,
        };
        let Some(approval) = pending else {
            return self.transition(&item, to).await;
        };

        match to {
            WishlistStatus::Approved => {
                let action =
                    ApprovalAction::approve(approval.id, user.user_id, ApproveRequest::default());
                self.approvals.approve_product(action).await?;
            }
            WishlistStatus::NotApproved => {
                let action =
                    ApprovalAction::decline(approval.id, user.user_id, DeclineRequest::default());
                self.approvals.decline_product(action).await?;
            }
            _ => {
                self.approvals.withdraw(&approval, user.user_id).await?;
            }
        }
        WISHLIST_TRANSITIONS_COUNTER
            .with_label_values(&[to.as_str()])
            .inc();

        self.repo
            .get_item(item.id)
            .await?
            .ok_or(AppError::NotFound("Wishlist item"))
    }

    /// Child asks a parent to approve a saved item.
    pub async fn request_approval(
        &self,
        user: &AuthenticatedUser,
        item_id: Uuid,
        child_notes: Option<String>,
    ) -> AppResult<ApprovalRequested> {
        let item = self.owned_item(user, item_id).await?;
        let previous = item.status;
        let item = self.transition(&item, WishlistStatus::AwaitingApproval).await?;

        let request = ReviewRequest {
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            brand: item.brand.clone(),
            barcode: None,
            image_url: item.image_url.clone(),
            safety_score: item.safety_score,
            child_notes,
            wishlist_item_id: Some(item.id),
        };

        match self.approvals.request_review(item.profile_id, request, "wishlist").await {
            Ok(approval) => Ok(ApprovalRequested { item, approval }),
            Err(e) => {
                // put the item back so the child can retry
                if let Err(revert) = self
                    .repo
                    .set_status(item.id, WishlistStatus::AwaitingApproval, previous)
                    .await
                {
                    tracing::warn!(item_id = %item.id, "reverting wishlist status failed: {revert}");
                }
                Err(e)
            }
        }
    }

    /// Approved item becomes a product on the child's shelf. Reuses the
    /// library entry the approval already created when there is one.
    pub async fn move_to_shelf(
        &self,
        user: &AuthenticatedUser,
        item_id: Uuid,
    ) -> AppResult<ChildProduct> {
        let item = self.owned_item(user, item_id).await?;
        if !item.status.can_transition_to(WishlistStatus::OnShelf) {
            return Err(invalid_transition(item.status, WishlistStatus::OnShelf));
        }

        let existing = self
            .library
            .list_for_child(item.profile_id)
            .await?
            .into_iter()
            .find(|p| match (p.product_id, item.product_id) {
                (Some(a), Some(b)) => a == b,
                _ => p.product_name.eq_ignore_ascii_case(&item.product_name),
            });

        let product = match existing {
            Some(product) => product,
            None => {
                let pao_months = match item.product_id {
                    Some(id) => self.products.get(id).await?.and_then(|p| p.pao_months),
                    None => None,
                };
                self.library
                    .add_product(&NewChildProduct {
                        child_id: item.profile_id,
                        product_id: item.product_id,
                        product_name: item.product_name.clone(),
                        brand: item.brand.clone(),
                        image_url: item.image_url.clone(),
                        approval_id: None,
                        pao_months,
                        expiry_date: None,
                    })
                    .await?
            }
        };

        self.transition(&item, WishlistStatus::OnShelf).await?;
        Ok(product)
    }

    // ── Groups ──────────────────────────────────────────────────────────────

    pub async fn create_group(
        &self,
        user: &AuthenticatedUser,
        profile_id: Uuid,
        req: &CreateWishlistGroupRequest,
    ) -> AppResult<WishlistGroup> {
        self.family.ensure_access(user, profile_id).await?;
        if req.name.trim().is_empty() {
            return Err(AppError::validation("group name is required"));
        }
        Ok(self.repo.create_group(profile_id, req).await?)
    }

    pub async fn list_groups(
        &self,
        user: &AuthenticatedUser,
        profile_id: Uuid,
    ) -> AppResult<Vec<WishlistGroupSummary>> {
        self.family.ensure_access(user, profile_id).await?;
        Ok(self.repo.list_groups(profile_id).await?)
    }

    pub async fn update_group(
        &self,
        user: &AuthenticatedUser,
        group_id: Uuid,
        req: &UpdateWishlistGroupRequest,
    ) -> AppResult<WishlistGroup> {
        self.accessible_group(user, group_id).await?;
        if matches!(&req.name, Some(name) if name.trim().is_empty()) {
            return Err(AppError::validation("group name cannot be empty"));
        }
        self.repo
            .update_group(group_id, req)
            .await?
            .ok_or(AppError::NotFound("Wishlist group"))
    }

    pub async fn delete_group(&self, user: &AuthenticatedUser, group_id: Uuid) -> AppResult<()> {
        self.accessible_group(user, group_id).await?;
        self.repo.delete_group(group_id).await?;
        Ok(())
    }

    pub async fn group_items(
        &self,
        user: &AuthenticatedUser,
        group_id: Uuid,
    ) -> AppResult<Vec<WishlistItem>> {
        self.accessible_group(user, group_id).await?;
        Ok(self.repo.group_items(group_id).await?)
    }

    pub async fn add_item_to_group(
        &self,
        user: &AuthenticatedUser,
        item_id: Uuid,
        group_id: Uuid,
    ) -> AppResult<()> {
        let item = self.owned_item(user, item_id).await?;
        self.owned_group(item.profile_id, group_id).await?;
        self.repo.add_item_to_group(item_id, group_id).await?;
        Ok(())
    }

    pub async fn remove_item_from_group(
        &self,
        user: &AuthenticatedUser,
        item_id: Uuid,
        group_id: Uuid,
    ) -> AppResult<()> {
        let item = self.owned_item(user, item_id).await?;
        self.owned_group(item.profile_id, group_id).await?;
        if !self.repo.remove_item_from_group(item_id, group_id).await? {
            return Err(AppError::NotFound("Group membership"));
        }
        Ok(())
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    async fn transition(&self, item: &WishlistItem, to: WishlistStatus) -> AppResult<WishlistItem> {
        if !item.status.can_transition_to(to) {
            return Err(invalid_transition(item.status, to));
        }
        let updated = self
            .repo
            .set_status(item.id, item.status, to)
            .await?
            .ok_or_else(|| AppError::Conflict("Wishlist item changed, reload and retry".into()))?;
        WISHLIST_TRANSITIONS_COUNTER
            .with_label_values(&[to.as_str()])
            .inc();
        tracing::debug!(item_id = %item.id, from = %item.status, to = %to, "wishlist status changed");
        Ok(updated)
    }

    async fn owned_item(&self, user: &AuthenticatedUser, item_id: Uuid) -> AppResult<WishlistItem> {
        let item = self
            .repo
            .get_item(item_id)
            .await?
            .ok_or(AppError::NotFound("Wishlist item"))?;
        self.family.ensure_access(user, item.profile_id).await?;
        Ok(item)
    }

    async fn accessible_group(
        &self,
        user: &AuthenticatedUser,
        group_id: Uuid,
    ) -> AppResult<WishlistGroup> {
        let group = self
            .repo
            .get_group(group_id)
            .await?
            .ok_or(AppError::NotFound("Wishlist group"))?;
        self.family.ensure_access(user, group.profile_id).await?;
        Ok(group)
    }

    async fn owned_group(&self, profile_id: Uuid, group_id: Uuid) -> AppResult<WishlistGroup> {
        let group = self
            .repo
            .get_group(group_id)
            .await?
            .ok_or(AppError::NotFound("Wishlist group"))?;
        if group.profile_id != profile_id {
            return Err(AppError::validation("group belongs to another profile"));
        }
        Ok(group)
    }
}

fn invalid_transition(from: WishlistStatus, to: WishlistStatus) -> AppError {
    AppError::InvalidTransition {
        entity: "wishlist item",
        from: from.to_string(),
        to: to.to_string(),
    }
}
