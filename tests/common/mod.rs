#![allow(dead_code)]
//! In-memory repositories so the service layer can be exercised without Postgres.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use skinshield_api::{
    db::*,
    models::{
        approval::{
            ApprovalHistory, ApprovalWithChild, NewApproval, NewApprovalHistory, ProductApproval,
            ProductFlag, Severity, StatusChange,
        },
        audit::{AuditEntry, AuditLogRow},
        auth::AuthenticatedUser,
        child::{AddGuardianRequest, Child, CreateChildRequest, ManagedChild, UpdateChildRequest},
        feature_flag::FeatureFlag,
        notification::Notification,
        product::{Product, UpsertProductRequest},
        prompt::PromptVersion,
        routine::{RoutineSlot, RoutineStep},
        shelf::{ChildProduct, NewChildProduct, UpdateChildProductRequest},
        user::UserRole,
        wishlist::{
            CreateWishlistGroupRequest, NewWishlistItem, UpdateWishlistGroupRequest,
            WishlistGroup, WishlistGroupSummary, WishlistItem, WishlistItemGroup, WishlistStatus,
        },
    },
    services::{ai::AiProvider, ai::AiSettings, ServiceSettings, Services},
};

#[derive(Default)]
struct Tables {
    children: Vec<Child>,
    guardians: Vec<ManagedChild>,
    products: Vec<Product>,
    approvals: Vec<ProductApproval>,
    flags: Vec<ProductFlag>,
    history: Vec<ApprovalHistory>,
    library: Vec<ChildProduct>,
    steps: Vec<RoutineStep>,
    items: Vec<WishlistItem>,
    groups: Vec<WishlistGroup>,
    memberships: Vec<WishlistItemGroup>,
    notifications: Vec<Notification>,
    push_tokens: Vec<(Uuid, String, String)>,
    feature_flags: Vec<FeatureFlag>,
    prompts: Vec<PromptVersion>,
    audit: Vec<AuditLogRow>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    pub flag_queries: AtomicUsize,
    pub prompt_queries: AtomicUsize,
    pub fail_library_writes: AtomicBool,
}

impl MemoryStore {
    fn with<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut tables = self.tables.lock().unwrap();
        f(&mut tables)
    }

    pub fn seed_flag(&self, approval_id: Uuid, severity: Severity, title: &str) {
        self.with(|t| {
            t.flags.push(ProductFlag {
                id: Uuid::new_v4(),
                approval_id,
                ingredient: None,
                severity,
                title: title.to_string(),
                description: None,
                created_at: Utc::now(),
            })
        });
    }

    /// Pushes an approval's request time into the past.
    pub fn backdate_approval(&self, approval_id: Uuid, requested_at: DateTime<Utc>) {
        self.with(|t| {
            if let Some(a) = t.approvals.iter_mut().find(|a| a.id == approval_id) {
                a.requested_at = requested_at;
            }
        });
    }

    pub fn notifications_for(&self, user_id: Uuid) -> Vec<Notification> {
        self.with(|t| {
            t.notifications
                .iter()
                .filter(|n| n.user_id == user_id)
                .cloned()
                .collect()
        })
    }

    pub fn audit_rows(&self) -> Vec<AuditLogRow> {
        self.with(|t| t.audit.clone())
    }

    pub fn library_for(&self, child_id: Uuid) -> Vec<ChildProduct> {
        self.with(|t| t.library.iter().filter(|p| p.child_id == child_id).cloned().collect())
    }
}

#[async_trait]
impl FamilyRepository for MemoryStore {
    async fn list_children(&self, parent_id: Uuid) -> anyhow::Result<Vec<Child>> {
        Ok(self.with(|t| {
            let managed: Vec<Uuid> = t
                .guardians
                .iter()
                .filter(|g| g.parent_id == parent_id)
                .map(|g| g.child_id)
                .collect();
            t.children
                .iter()
                .filter(|c| c.parent_id == parent_id || managed.contains(&c.id))
                .cloned()
                .collect()
        }))
    }

    async fn get_child(&self, id: Uuid) -> anyhow::Result<Option<Child>> {
        Ok(self.with(|t| t.children.iter().find(|c| c.id == id).cloned()))
    }

    async fn create_child(
        &self,
        parent_id: Uuid,
        req: &CreateChildRequest,
    ) -> anyhow::Result<Child> {
        let now = Utc::now();
        let child = Child {
            id: Uuid::new_v4(),
            parent_id,
            display_name: req.display_name.clone(),
            birth_year: req.birth_year,
            avatar_emoji: req.avatar_emoji.clone(),
            requires_approval: req.requires_approval.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        self.with(|t| t.children.push(child.clone()));
        Ok(child)
    }

    async fn update_child(
        &self,
        id: Uuid,
        req: &UpdateChildRequest,
    ) -> anyhow::Result<Option<Child>> {
        Ok(self.with(|t| {
            let child = t.children.iter_mut().find(|c| c.id == id)?;
            if let Some(name) = &req.display_name {
                child.display_name = name.clone();
            }
            if req.birth_year.is_some() {
                child.birth_year = req.birth_year;
            }
            if req.avatar_emoji.is_some() {
                child.avatar_emoji = req.avatar_emoji.clone();
            }
            if let Some(flag) = req.requires_approval {
                child.requires_approval = flag;
            }
            child.updated_at = Utc::now();
            Some(child.clone())
        }))
    }

    async fn delete_child(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.with(|t| {
            let before = t.children.len();
            t.children.retain(|c| c.id != id);
            t.guardians.retain(|g| g.child_id != id);
            t.items.retain(|i| i.profile_id != id);
            before != t.children.len()
        }))
    }

    async fn is_parent_of(&self, parent_id: Uuid, child_id: Uuid) -> anyhow::Result<bool> {
        Ok(self.with(|t| {
            t.children.iter().any(|c| c.id == child_id && c.parent_id == parent_id)
                || t
                    .guardians
                    .iter()
                    .any(|g| g.child_id == child_id && g.parent_id == parent_id)
        }))
    }

    async fn parents_of(&self, child_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        Ok(self.with(|t| {
            let Some(owner) = t.children.iter().find(|c| c.id == child_id).map(|c| c.parent_id)
            else {
                return Vec::new();
            };
            let mut parents = vec![owner];
            parents.extend(
                t.guardians
                    .iter()
                    .filter(|g| g.child_id == child_id && g.parent_id != owner)
                    .map(|g| g.parent_id),
            );
            parents
        }))
    }

    async fn add_guardian(
        &self,
        child_id: Uuid,
        req: &AddGuardianRequest,
    ) -> anyhow::Result<ManagedChild> {
        Ok(self.with(|t| {
            t.guardians
                .retain(|g| !(g.child_id == child_id && g.parent_id == req.parent_id));
            let link = ManagedChild {
                child_id,
                parent_id: req.parent_id,
                relationship: req.relationship.clone(),
                created_at: Utc::now(),
            };
            t.guardians.push(link.clone());
            link
        }))
    }

    async fn remove_guardian(&self, child_id: Uuid, parent_id: Uuid) -> anyhow::Result<bool> {
        Ok(self.with(|t| {
            let before = t.guardians.len();
            t.guardians
                .retain(|g| !(g.child_id == child_id && g.parent_id == parent_id));
            before != t.guardians.len()
        }))
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn search(&self, query: &str, limit: i64) -> anyhow::Result<Vec<Product>> {
        let q = query.to_lowercase();
        Ok(self.with(|t| {
            t.products
                .iter()
                .filter(|p| {
                    p.name.to_lowercase().contains(&q)
                        || p.brand.as_deref().unwrap_or("").to_lowercase().contains(&q)
                })
                .take(limit as usize)
                .cloned()
                .collect()
        }))
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        Ok(self.with(|t| t.products.iter().find(|p| p.id == id).cloned()))
    }

    async fn get_by_barcode(&self, barcode: &str) -> anyhow::Result<Option<Product>> {
        Ok(self.with(|t| {
            t.products
                .iter()
                .find(|p| p.barcode.as_deref() == Some(barcode))
                .cloned()
        }))
    }

    async fn upsert(&self, req: &UpsertProductRequest) -> anyhow::Result<Product> {
        let now = Utc::now();
        Ok(self.with(|t| {
            let existing = req
                .barcode
                .as_deref()
                .and_then(|code| t.products.iter().position(|p| p.barcode.as_deref() == Some(code)));
            let product = Product {
                id: existing.map(|i| t.products[i].id).unwrap_or_else(Uuid::new_v4),
                barcode: req.barcode.clone(),
                name: req.name.clone(),
                brand: req.brand.clone(),
                category: req.category.clone(),
                ingredients: req.ingredients.clone(),
                image_url: req.image_url.clone(),
                safety_score: req.safety_score,
                rating: req.rating,
                pao_months: req.pao_months,
                created_at: existing.map(|i| t.products[i].created_at).unwrap_or(now),
                updated_at: now,
            };
            match existing {
                Some(i) => t.products[i] = product.clone(),
                None => t.products.push(product.clone()),
            }
            product
        }))
    }
}

#[async_trait]
impl ApprovalRepository for MemoryStore {
    async fn create(&self, new: &NewApproval) -> anyhow::Result<ProductApproval> {
        let now = Utc::now();
        let r = &new.request;
        let approval = ProductApproval {
            id: Uuid::new_v4(),
            child_id: new.child_id,
            parent_id: new.parent_id,
            product_id: r.product_id,
            product_name: r.product_name.clone(),
            brand: r.brand.clone(),
            barcode: r.barcode.clone(),
            image_url: r.image_url.clone(),
            safety_score: r.safety_score,
            wishlist_item_id: r.wishlist_item_id,
            status: skinshield_api::models::approval::ApprovalStatus::Pending,
            child_notes: r.child_notes.clone(),
            parent_notes: None,
            requested_at: now,
            reviewed_at: None,
            reviewed_by: None,
            created_at: now,
            updated_at: now,
        };
        self.with(|t| t.approvals.push(approval.clone()));
        Ok(approval)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<ProductApproval>> {
        Ok(self.with(|t| t.approvals.iter().find(|a| a.id == id).cloned()))
    }

    async fn list_pending_for_parent(
        &self,
        parent_id: Uuid,
    ) -> anyhow::Result<Vec<ApprovalWithChild>> {
        Ok(self.with(|t| {
            let mut rows: Vec<ApprovalWithChild> = t
                .approvals
                .iter()
                .filter(|a| a.status == skinshield_api::models::approval::ApprovalStatus::Pending)
                .filter_map(|a| {
                    let child = t.children.iter().find(|c| c.id == a.child_id)?;
                    let manages = child.parent_id == parent_id
                        || t
                            .guardians
                            .iter()
                            .any(|g| g.child_id == child.id && g.parent_id == parent_id);
                    manages.then(|| ApprovalWithChild {
                        approval: a.clone(),
                        child_name: child.display_name.clone(),
                    })
                })
                .collect();
            rows.sort_by(|a, b| b.approval.requested_at.cmp(&a.approval.requested_at));
            rows
        }))
    }

    async fn list_for_child(&self, child_id: Uuid) -> anyhow::Result<Vec<ProductApproval>> {
        Ok(self.with(|t| {
            t.approvals
                .iter()
                .filter(|a| a.child_id == child_id)
                .cloned()
                .collect()
        }))
    }

    async fn flags_for(&self, approval_ids: &[Uuid]) -> anyhow::Result<Vec<ProductFlag>> {
        Ok(self.with(|t| {
            t.flags
                .iter()
                .filter(|f| approval_ids.contains(&f.approval_id))
                .cloned()
                .collect()
        }))
    }

    async fn set_status(
        &self,
        id: Uuid,
        change: &StatusChange,
    ) -> anyhow::Result<Option<ProductApproval>> {
        Ok(self.with(|t| {
            let a = t
                .approvals
                .iter_mut()
                .find(|a| a.id == id && a.status == change.from)?;
            a.status = change.to;
            a.reviewed_by = change.reviewed_by;
            a.reviewed_at = Some(change.at);
            a.parent_notes = change.parent_notes.clone();
            a.updated_at = change.at;
            Some(a.clone())
        }))
    }

    async fn insert_history(&self, entry: &NewApprovalHistory) -> anyhow::Result<ApprovalHistory> {
        let row = ApprovalHistory {
            id: Uuid::new_v4(),
            approval_id: entry.approval_id,
            action: entry.action,
            actor_id: entry.actor_id,
            notes: entry.notes.clone(),
            created_at: Utc::now(),
        };
        self.with(|t| t.history.push(row.clone()));
        Ok(row)
    }

    async fn history_for(&self, approval_id: Uuid) -> anyhow::Result<Vec<ApprovalHistory>> {
        Ok(self.with(|t| {
            t.history
                .iter()
                .filter(|h| h.approval_id == approval_id)
                .cloned()
                .collect()
        }))
    }

    async fn list_stale_pending(
        &self,
        requested_before: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ProductApproval>> {
        Ok(self.with(|t| {
            t.approvals
                .iter()
                .filter(|a| {
                    a.status == skinshield_api::models::approval::ApprovalStatus::Pending
                        && a.requested_at < requested_before
                })
                .cloned()
                .collect()
        }))
    }

    async fn pending_for_wishlist_item(
        &self,
        item_id: Uuid,
    ) -> anyhow::Result<Option<ProductApproval>> {
        Ok(self.with(|t| {
            t.approvals
                .iter()
                .rev()
                .find(|a| {
                    a.wishlist_item_id == Some(item_id)
                        && a.status == skinshield_api::models::approval::ApprovalStatus::Pending
                })
                .cloned()
        }))
    }
}

#[async_trait]
impl LibraryRepository for MemoryStore {
    async fn add_product(&self, new: &NewChildProduct) -> anyhow::Result<ChildProduct> {
        if self.fail_library_writes.load(Ordering::SeqCst) {
            anyhow::bail!("library unavailable");
        }
        let now = Utc::now();
        let product = ChildProduct {
            id: Uuid::new_v4(),
            child_id: new.child_id,
            product_id: new.product_id,
            product_name: new.product_name.clone(),
            brand: new.brand.clone(),
            image_url: new.image_url.clone(),
            approval_id: new.approval_id,
            usage_count: 0,
            last_used_at: None,
            opened_at: None,
            pao_months: new.pao_months,
            expiry_date: new.expiry_date,
            created_at: now,
            updated_at: now,
        };
        self.with(|t| t.library.push(product.clone()));
        Ok(product)
    }

    async fn get_product(&self, id: Uuid) -> anyhow::Result<Option<ChildProduct>> {
        Ok(self.with(|t| t.library.iter().find(|p| p.id == id).cloned()))
    }

    async fn list_for_child(&self, child_id: Uuid) -> anyhow::Result<Vec<ChildProduct>> {
        Ok(self.library_for(child_id))
    }

    async fn record_usage(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<ChildProduct>> {
        Ok(self.with(|t| {
            let p = t.library.iter_mut().find(|p| p.id == id)?;
            p.usage_count += 1;
            p.last_used_at = Some(at);
            p.opened_at.get_or_insert(at.date_naive());
            p.updated_at = at;
            Some(p.clone())
        }))
    }

    async fn update_product(
        &self,
        id: Uuid,
        req: &UpdateChildProductRequest,
    ) -> anyhow::Result<Option<ChildProduct>> {
        Ok(self.with(|t| {
            let p = t.library.iter_mut().find(|p| p.id == id)?;
            if req.opened_at.is_some() {
                p.opened_at = req.opened_at;
            }
            if req.pao_months.is_some() {
                p.pao_months = req.pao_months;
            }
            if req.expiry_date.is_some() {
                p.expiry_date = req.expiry_date;
            }
            Some(p.clone())
        }))
    }

    async fn delete_product(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.with(|t| {
            let before = t.library.len();
            t.library.retain(|p| p.id != id);
            t.steps.retain(|s| s.child_product_id != id);
            before != t.library.len()
        }))
    }
}

#[async_trait]
impl RoutineRepository for MemoryStore {
    async fn add_step(
        &self,
        child_id: Uuid,
        child_product_id: Uuid,
        slot: RoutineSlot,
    ) -> anyhow::Result<Option<RoutineStep>> {
        Ok(self.with(|t| {
            let in_slot = t.steps.iter().filter(|s| s.child_id == child_id && s.slot == slot);
            if in_slot.clone().any(|s| s.child_product_id == child_product_id) {
                return None;
            }
            let position = in_slot.map(|s| s.position + 1).max().unwrap_or(0);
            let step = RoutineStep {
                id: Uuid::new_v4(),
                child_id,
                child_product_id,
                slot,
                position,
                created_at: Utc::now(),
            };
            t.steps.push(step.clone());
            Some(step)
        }))
    }

    async fn list_steps(
        &self,
        child_id: Uuid,
        slot: Option<RoutineSlot>,
    ) -> anyhow::Result<Vec<RoutineStep>> {
        Ok(self.with(|t| {
            let mut steps: Vec<RoutineStep> = t
                .steps
                .iter()
                .filter(|s| s.child_id == child_id && slot.map_or(true, |want| s.slot == want))
                .cloned()
                .collect();
            steps.sort_by_key(|s| (s.slot != RoutineSlot::Morning, s.position));
            steps
        }))
    }

    async fn get_step(&self, id: Uuid) -> anyhow::Result<Option<RoutineStep>> {
        Ok(self.with(|t| t.steps.iter().find(|s| s.id == id).cloned()))
    }

    async fn remove_step(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.with(|t| {
            let before = t.steps.len();
            t.steps.retain(|s| s.id != id);
            before != t.steps.len()
        }))
    }
}

#[async_trait]
impl WishlistRepository for MemoryStore {
    async fn create_item(&self, new: &NewWishlistItem) -> anyhow::Result<WishlistItem> {
        let now = Utc::now();
        let item = WishlistItem {
            id: Uuid::new_v4(),
            profile_id: new.profile_id,
            product_id: new.product_id,
            product_name: new.product_name.clone(),
            brand: new.brand.clone(),
            image_url: new.image_url.clone(),
            safety_score: new.safety_score,
            rating: new.rating,
            notes: new.notes.clone(),
            status: WishlistStatus::Saved,
            created_at: now,
            updated_at: now,
        };
        self.with(|t| t.items.push(item.clone()));
        Ok(item)
    }

    async fn get_item(&self, id: Uuid) -> anyhow::Result<Option<WishlistItem>> {
        Ok(self.with(|t| t.items.iter().find(|i| i.id == id).cloned()))
    }

    async fn list_items(
        &self,
        profile_id: Uuid,
        status: Option<WishlistStatus>,
    ) -> anyhow::Result<Vec<WishlistItem>> {
        Ok(self.with(|t| {
            t.items
                .iter()
                .filter(|i| i.profile_id == profile_id && status.map_or(true, |s| i.status == s))
                .cloned()
                .collect()
        }))
    }

    async fn update_notes(
        &self,
        id: Uuid,
        notes: Option<&str>,
    ) -> anyhow::Result<Option<WishlistItem>> {
        Ok(self.with(|t| {
            let item = t.items.iter_mut().find(|i| i.id == id)?;
            item.notes = notes.map(str::to_string);
            Some(item.clone())
        }))
    }

    async fn set_status(
        &self,
        id: Uuid,
        from: WishlistStatus,
        to: WishlistStatus,
    ) -> anyhow::Result<Option<WishlistItem>> {
        Ok(self.with(|t| {
            let item = t.items.iter_mut().find(|i| i.id == id && i.status == from)?;
            item.status = to;
            item.updated_at = Utc::now();
            Some(item.clone())
        }))
    }

    async fn delete_item(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.with(|t| {
            let before = t.items.len();
            t.items.retain(|i| i.id != id);
            t.memberships.retain(|m| m.item_id != id);
            before != t.items.len()
        }))
    }

    async fn create_group(
        &self,
        profile_id: Uuid,
        req: &CreateWishlistGroupRequest,
    ) -> anyhow::Result<WishlistGroup> {
        let now = Utc::now();
        let group = WishlistGroup {
            id: Uuid::new_v4(),
            profile_id,
            name: req.name.clone(),
            emoji: req.emoji.clone(),
            created_at: now,
            updated_at: now,
        };
        self.with(|t| t.groups.push(group.clone()));
        Ok(group)
    }

    async fn get_group(&self, id: Uuid) -> anyhow::Result<Option<WishlistGroup>> {
        Ok(self.with(|t| t.groups.iter().find(|g| g.id == id).cloned()))
    }

    async fn list_groups(&self, profile_id: Uuid) -> anyhow::Result<Vec<WishlistGroupSummary>> {
        Ok(self.with(|t| {
            t.groups
                .iter()
                .filter(|g| g.profile_id == profile_id)
                .map(|g| WishlistGroupSummary {
                    group: g.clone(),
                    item_count: t.memberships.iter().filter(|m| m.group_id == g.id).count()
                        as i64,
                })
                .collect()
        }))
    }

    async fn update_group(
        &self,
        id: Uuid,
        req: &UpdateWishlistGroupRequest,
    ) -> anyhow::Result<Option<WishlistGroup>> {
        Ok(self.with(|t| {
            let group = t.groups.iter_mut().find(|g| g.id == id)?;
            if let Some(name) = &req.name {
                group.name = name.clone();
            }
            if req.emoji.is_some() {
                group.emoji = req.emoji.clone();
            }
            Some(group.clone())
        }))
    }

    async fn delete_group(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.with(|t| {
            let before = t.groups.len();
            t.groups.retain(|g| g.id != id);
            t.memberships.retain(|m| m.group_id != id);
            before != t.groups.len()
        }))
    }

    async fn add_item_to_group(&self, item_id: Uuid, group_id: Uuid) -> anyhow::Result<()> {
        self.with(|t| {
            if !t
                .memberships
                .iter()
                .any(|m| m.item_id == item_id && m.group_id == group_id)
            {
                t.memberships.push(WishlistItemGroup { item_id, group_id });
            }
        });
        Ok(())
    }

    async fn remove_item_from_group(
        &self,
        item_id: Uuid,
        group_id: Uuid,
    ) -> anyhow::Result<bool> {
        Ok(self.with(|t| {
            let before = t.memberships.len();
            t.memberships
                .retain(|m| !(m.item_id == item_id && m.group_id == group_id));
            before != t.memberships.len()
        }))
    }

    async fn memberships(&self, item_ids: &[Uuid]) -> anyhow::Result<Vec<WishlistItemGroup>> {
        Ok(self.with(|t| {
            t.memberships
                .iter()
                .filter(|m| item_ids.contains(&m.item_id))
                .cloned()
                .collect()
        }))
    }

    async fn group_items(&self, group_id: Uuid) -> anyhow::Result<Vec<WishlistItem>> {
        Ok(self.with(|t| {
            t.items
                .iter()
                .filter(|i| {
                    t.memberships
                        .iter()
                        .any(|m| m.group_id == group_id && m.item_id == i.id)
                })
                .cloned()
                .collect()
        }))
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn insert(
        &self,
        user_id: Uuid,
        title: &str,
        body: &str,
        data: Option<&serde_json::Value>,
    ) -> anyhow::Result<Notification> {
        let n = Notification {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            body: body.to_string(),
            data: data.cloned(),
            read_at: None,
            created_at: Utc::now(),
        };
        self.with(|t| t.notifications.push(n.clone()));
        Ok(n)
    }

    async fn list_for_user(&self, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<Notification>> {
        let mut all = self.notifications_for(user_id);
        all.truncate(limit as usize);
        Ok(all)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        Ok(self.with(|t| {
            match t
                .notifications
                .iter_mut()
                .find(|n| n.id == id && n.user_id == user_id)
            {
                Some(n) => {
                    n.read_at.get_or_insert_with(Utc::now);
                    true
                }
                None => false,
            }
        }))
    }

    async fn push_tokens(&self, user_id: Uuid) -> anyhow::Result<Vec<(String, String)>> {
        Ok(self.with(|t| {
            t.push_tokens
                .iter()
                .filter(|(u, _, _)| *u == user_id)
                .map(|(_, p, tok)| (p.clone(), tok.clone()))
                .collect()
        }))
    }

    async fn register_push_token(
        &self,
        user_id: Uuid,
        platform: &str,
        token: &str,
    ) -> anyhow::Result<()> {
        self.with(|t| {
            t.push_tokens.retain(|(_, _, tok)| tok != token);
            t.push_tokens
                .push((user_id, platform.to_string(), token.to_string()));
        });
        Ok(())
    }
}

#[async_trait]
impl FeatureFlagRepository for MemoryStore {
    async fn list_flags(&self) -> anyhow::Result<Vec<FeatureFlag>> {
        self.flag_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.with(|t| t.feature_flags.clone()))
    }

    async fn set_flag(
        &self,
        key: &str,
        enabled: bool,
        description: Option<&str>,
        updated_by: Option<Uuid>,
    ) -> anyhow::Result<FeatureFlag> {
        Ok(self.with(|t| {
            let previous = t.feature_flags.iter().find(|f| f.key == key).cloned();
            t.feature_flags.retain(|f| f.key != key);
            let flag = FeatureFlag {
                key: key.to_string(),
                enabled,
                description: description
                    .map(str::to_string)
                    .or_else(|| previous.and_then(|p| p.description)),
                updated_by,
                updated_at: Utc::now(),
            };
            t.feature_flags.push(flag.clone());
            flag
        }))
    }
}

#[async_trait]
impl PromptRepository for MemoryStore {
    async fn active_version(&self, key: &str) -> anyhow::Result<Option<PromptVersion>> {
        self.prompt_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.with(|t| {
            t.prompts
                .iter()
                .find(|p| p.prompt_key == key && p.is_active)
                .cloned()
        }))
    }

    async fn list_versions(&self, key: &str) -> anyhow::Result<Vec<PromptVersion>> {
        Ok(self.with(|t| {
            let mut v: Vec<PromptVersion> = t
                .prompts
                .iter()
                .filter(|p| p.prompt_key == key)
                .cloned()
                .collect();
            v.sort_by(|a, b| b.version.cmp(&a.version));
            v
        }))
    }

    async fn create_version(
        &self,
        key: &str,
        content: &str,
        model: Option<&str>,
        created_by: Option<Uuid>,
    ) -> anyhow::Result<PromptVersion> {
        Ok(self.with(|t| {
            let next = t
                .prompts
                .iter()
                .filter(|p| p.prompt_key == key)
                .map(|p| p.version)
                .max()
                .unwrap_or(0)
                + 1;
            let prompt = PromptVersion {
                id: Uuid::new_v4(),
                prompt_key: key.to_string(),
                version: next,
                content: content.to_string(),
                model: model.map(str::to_string),
                is_active: false,
                created_by,
                created_at: Utc::now(),
            };
            t.prompts.push(prompt.clone());
            prompt
        }))
    }

    async fn activate_version(
        &self,
        key: &str,
        version: i32,
    ) -> anyhow::Result<Option<PromptVersion>> {
        Ok(self.with(|t| {
            if !t
                .prompts
                .iter()
                .any(|p| p.prompt_key == key && p.version == version)
            {
                return None;
            }
            let mut activated = None;
            for p in t.prompts.iter_mut().filter(|p| p.prompt_key == key) {
                p.is_active = p.version == version;
                if p.is_active {
                    activated = Some(p.clone());
                }
            }
            activated
        }))
    }
}

#[async_trait]
impl AuditRepository for MemoryStore {
    async fn insert_audit(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        self.with(|t| {
            t.audit.push(AuditLogRow {
                id: Uuid::new_v4(),
                actor_id: entry.actor_id,
                action: entry.action.clone(),
                resource_type: entry.resource_type.clone(),
                resource_id: entry.resource_id.clone(),
                details: entry.details.clone(),
                created_at: Utc::now(),
            })
        });
        Ok(())
    }

    async fn list_audit(
        &self,
        action_prefix: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<AuditLogRow>, i64)> {
        Ok(self.with(|t| {
            let matching: Vec<AuditLogRow> = t
                .audit
                .iter()
                .rev()
                .filter(|r| action_prefix.map_or(true, |p| r.action.starts_with(p)))
                .cloned()
                .collect();
            let total = matching.len() as i64;
            let page = matching
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect();
            (page, total)
        }))
    }
}

// ── Fixture ─────────────────────────────────────────────────────────────────

pub struct Family {
    pub store: Arc<MemoryStore>,
    pub services: Services,
    pub parent: AuthenticatedUser,
    pub child: AuthenticatedUser,
}

pub fn settings(flag_ttl: Duration, prompt_ttl: Duration) -> ServiceSettings {
    ServiceSettings {
        fcm_api_key: None,
        feature_flag_ttl: flag_ttl,
        prompt_ttl,
        ai: AiSettings {
            provider: AiProvider::OpenAi,
            api_key: None,
            model: AiProvider::OpenAi.default_model().to_string(),
            base_url: None,
        },
    }
}

pub fn services_over(store: Arc<MemoryStore>, settings: ServiceSettings) -> Services {
    Services::new(&Repositories::from_store(store), settings)
}

pub fn user(user_id: Uuid, role: UserRole) -> AuthenticatedUser {
    AuthenticatedUser { user_id, role }
}

/// One parent with one child profile ("Mia").
pub async fn family() -> Family {
    let store = Arc::new(MemoryStore::default());
    let services = services_over(
        store.clone(),
        settings(Duration::from_secs(300), Duration::from_secs(120)),
    );

    let parent = user(Uuid::new_v4(), UserRole::Parent);
    let child = services
        .family
        .create_child(
            parent.user_id,
            &CreateChildRequest {
                display_name: "Mia".into(),
                birth_year: Some(2014),
                avatar_emoji: None,
                requires_approval: None,
            },
        )
        .await
        .expect("create child");

    Family {
        store,
        services,
        parent,
        child: user(child.id, UserRole::Child),
    }
}

pub async fn catalog_product(services: &Services, name: &str, pao_months: Option<i32>) -> Product {
    services
        .products
        .upsert(&UpsertProductRequest {
            barcode: None,
            name: name.into(),
            brand: Some("Gentle Co".into()),
            category: Some("moisturizer".into()),
            ingredients: None,
            image_url: None,
            safety_score: Some(92),
            rating: Some(4.5),
            pao_months,
        })
        .await
        .expect("upsert product")
}
