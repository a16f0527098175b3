use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::FamilyRepository,
    error::{AppError, AppResult},
    models::{
        auth::AuthenticatedUser,
        child::{AddGuardianRequest, Child, CreateChildRequest, ManagedChild, UpdateChildRequest},
        user::UserRole,
    },
};

/// Children, guardians, and the "may this user touch this child" checks
/// every other service leans on.
pub struct FamilyService {
    repo: Arc<dyn FamilyRepository>,
}

impl FamilyService {
    pub fn new(repo: Arc<dyn FamilyRepository>) -> Self {
        Self { repo }
    }

    pub async fn is_parent_of(&self, parent_id: Uuid, child_id: Uuid) -> AppResult<bool> {
        Ok(self.repo.is_parent_of(parent_id, child_id).await?)
    }

    pub async fn parents_of(&self, child_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self.repo.parents_of(child_id).await?)
    }

    /// Admins, or a parent/guardian of the child.
    pub async fn ensure_parent(&self, user: &AuthenticatedUser, child_id: Uuid) -> AppResult<()> {
        match user.role {
            UserRole::Admin => Ok(()),
            UserRole::Parent if self.repo.is_parent_of(user.user_id, child_id).await? => Ok(()),
            _ => Err(AppError::Forbidden),
        }
    }

    /// The child themselves, or anyone allowed by [`Self::ensure_parent`].
    pub async fn ensure_access(&self, user: &AuthenticatedUser, child_id: Uuid) -> AppResult<()> {
        if user.role == UserRole::Child {
            return if user.user_id == child_id {
                Ok(())
            } else {
                Err(AppError::Forbidden)
            };
        }
        self.ensure_parent(user, child_id).await
    }

    pub async fn list_children(&self, parent_id: Uuid) -> AppResult<Vec<Child>> {
        Ok(self.repo.list_children(parent_id).await?)
    }

    pub async fn get_child(&self, child_id: Uuid) -> AppResult<Child> {
        self.repo
            .get_child(child_id)
            .await?
            .ok_or(AppError::NotFound("Child"))
    }

    pub async fn create_child(&self, parent_id: Uuid, req: &CreateChildRequest) -> AppResult<Child> {
        if req.display_name.trim().is_empty() {
            return Err(AppError::validation("display_name is required"));
        }
        let child = self.repo.create_child(parent_id, req).await?;
        tracing::info!(child_id = %child.id, parent_id = %parent_id, "child profile created");
        Ok(child)
    }

    pub async fn update_child(
        &self,
        user: &AuthenticatedUser,
        child_id: Uuid,
        req: &UpdateChildRequest,
    ) -> AppResult<Child> {
        self.ensure_parent(user, child_id).await?;
        if matches!(&req.display_name, Some(name) if name.trim().is_empty()) {
            return Err(AppError::validation("display_name cannot be empty"));
        }
        self.repo
            .update_child(child_id, req)
            .await?
            .ok_or(AppError::NotFound("Child"))
    }

    /// Only the owning parent (or an admin) may delete a child profile.
    pub async fn delete_child(&self, user: &AuthenticatedUser, child_id: Uuid) -> AppResult<()> {
        let child = self.get_child(child_id).await?;
        if !user.is_admin() && child.parent_id != user.user_id {
            return Err(AppError::Forbidden);
        }
        self.repo.delete_child(child_id).await?;
        tracing::info!(child_id = %child_id, "child profile deleted");
        Ok(())
    }

    pub async fn add_guardian(
        &self,
        user: &AuthenticatedUser,
        child_id: Uuid,
        req: &AddGuardianRequest,
    ) -> AppResult<ManagedChild> {
        let child = self.get_child(child_id).await?;
        if !user.is_admin() && child.parent_id != user.user_id {
            return Err(AppError::Forbidden);
        }
        if req.parent_id == child.parent_id {
            return Err(AppError::validation("already the owning parent"));
        }
        Ok(self.repo.add_guardian(child_id, req).await?)
    }

    pub async fn remove_guardian(
        &self,
        user: &AuthenticatedUser,
        child_id: Uuid,
        parent_id: Uuid,
    ) -> AppResult<()> {
        let child = self.get_child(child_id).await?;
        // a guardian may remove themselves
        if !user.is_admin() && child.parent_id != user.user_id && user.user_id != parent_id {
            return Err(AppError::Forbidden);
        }
        if !self.repo.remove_guardian(child_id, parent_id).await? {
            return Err(AppError::NotFound("Guardian"));
        }
        Ok(())
    }
}
