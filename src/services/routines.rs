use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{LibraryRepository, Repositories, RoutineRepository},
    error::{AppError, AppResult},
    models::{
        auth::AuthenticatedUser,
        routine::{AddRoutineStepRequest, RoutineSlot, RoutineStep},
    },
    services::family::FamilyService,
};

pub struct RoutineService {
    routines: Arc<dyn RoutineRepository>,
    library: Arc<dyn LibraryRepository>,
    family: Arc<FamilyService>,
}

impl RoutineService {
    pub fn new(repos: &Repositories, family: Arc<FamilyService>) -> Self {
        Self {
            routines: repos.routines.clone(),
            library: repos.library.clone(),
            family,
        }
    }

    pub async fn list(
        &self,
        user: &AuthenticatedUser,
        child_id: Uuid,
        slot: Option<RoutineSlot>,
    ) -> AppResult<Vec<RoutineStep>> {
        self.family.ensure_access(user, child_id).await?;
        Ok(self.routines.list_steps(child_id, slot).await?)
    }

    pub async fn add_step(
        &self,
        user: &AuthenticatedUser,
        child_id: Uuid,
        req: &AddRoutineStepRequest,
    ) -> AppResult<RoutineStep> {
        self.family.ensure_access(user, child_id).await?;

        let product = self
            .library
            .get_product(req.child_product_id)
            .await?
            .ok_or(AppError::NotFound("Product"))?;
        if product.child_id != child_id {
            return Err(AppError::validation("product is not on this child's shelf"));
        }

        let existing = self.routines.list_steps(child_id, Some(req.slot)).await?;
        if existing.iter().any(|s| s.child_product_id == req.child_product_id) {
            return Err(already_in_routine(req.slot));
        }

        // lost a race with a concurrent add
        self.routines
            .add_step(child_id, req.child_product_id, req.slot)
            .await?
            .ok_or_else(|| already_in_routine(req.slot))
    }

    pub async fn remove_step(&self, user: &AuthenticatedUser, step_id: Uuid) -> AppResult<()> {
        let step = self
            .routines
            .get_step(step_id)
            .await?
            .ok_or(AppError::NotFound("Routine step"))?;
        self.family.ensure_access(user, step.child_id).await?;
        self.routines.remove_step(step_id).await?;
        Ok(())
    }
}

fn already_in_routine(slot: RoutineSlot) -> AppError {
    AppError::Conflict(format!("product is already in the {} routine", slot.as_str()))
}
