use std::sync::Arc;

use log::info;
use uuid::Uuid;

use crate::models::{
    CreateProviderProfileDto, Provider, ProviderDashboardResponse, UpdateProviderProfileDto,
};
use crate::services::clock::{Clock, IdSource};
use crate::services::error::EngineError;
use crate::store::{RetryPolicy, Store, with_retry};

/// Provider directory: profile lifecycle and the aggregates the rest of the
/// engine reads. Profiles are only ever soft-deleted so finished requests
/// keep resolving their provider.
pub struct ProviderService<S: Store> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
    retry: RetryPolicy,
}

impl<S: Store> ProviderService<S> {
    pub fn new(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
        retry: RetryPolicy,
    ) -> Self {
        ProviderService { store, clock, ids, retry }
    }

    /// One profile per identity principal.
    pub async fn create_profile(
        &self,
        user_id: Uuid,
        dto: CreateProviderProfileDto,
    ) -> Result<Uuid, EngineError> {
        let now = self.clock.now();
        let id = self.ids.next_id();

        with_retry(&self.retry, || {
            self.store.with_txn(|t| {
                if t.provider_by_user(user_id).is_some() {
                    return Err(EngineError::InvalidState);
                }
                t.insert_provider(Provider {
                    id,
                    user_id,
                    full_name: dto.full_name.clone(),
                    phone: dto.phone.clone(),
                    bio: dto.bio.clone(),
                    skills: dto.skills.clone(),
                    experience_years: dto.experience_years,
                    latitude: dto.latitude,
                    longitude: dto.longitude,
                    availability: true,
                    rating: 0.0,
                    total_reviews: 0,
                    total_jobs: 0,
                    is_deleted: false,
                    created_at: now,
                    updated_at: now,
                });
                Ok(())
            })
        })
        .await?;

        info!("provider profile {id} created");
        Ok(id)
    }

    pub fn get_profile(&self, provider_id: Uuid) -> Result<Provider, EngineError> {
        self.store.read(|t| {
            t.provider(provider_id)
                .filter(|p| !p.is_deleted)
                .cloned()
                .ok_or(EngineError::NotFound)
        })
    }

    pub async fn update_profile(
        &self,
        provider_id: Uuid,
        dto: UpdateProviderProfileDto,
    ) -> Result<Provider, EngineError> {
        let now = self.clock.now();

        with_retry(&self.retry, || {
            self.store.with_txn(|t| {
                let provider = t.provider_mut(provider_id).ok_or(EngineError::NotFound)?;
                if provider.is_deleted {
                    return Err(EngineError::NotFound);
                }
                if let Some(ref full_name) = dto.full_name {
                    provider.full_name = full_name.clone();
                }
                if let Some(ref phone) = dto.phone {
                    provider.phone = phone.clone();
                }
                if let Some(ref bio) = dto.bio {
                    provider.bio = Some(bio.clone());
                }
                if let Some(ref skills) = dto.skills {
                    provider.skills = skills.clone();
                }
                if let Some(experience) = dto.experience_years {
                    provider.experience_years = Some(experience);
                }
                provider.updated_at = now;
                Ok(provider.clone())
            })
        })
        .await
    }

    pub async fn update_availability(
        &self,
        provider_id: Uuid,
        availability: bool,
    ) -> Result<(), EngineError> {
        let now = self.clock.now();

        with_retry(&self.retry, || {
            self.store.with_txn(|t| {
                let provider = t.provider_mut(provider_id).ok_or(EngineError::NotFound)?;
                if provider.is_deleted {
                    return Err(EngineError::NotFound);
                }
                provider.availability = availability;
                provider.updated_at = now;
                Ok(())
            })
        })
        .await
    }

    pub async fn update_location(
        &self,
        provider_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), EngineError> {
        let now = self.clock.now();

        with_retry(&self.retry, || {
            self.store.with_txn(|t| {
                let provider = t.provider_mut(provider_id).ok_or(EngineError::NotFound)?;
                if provider.is_deleted {
                    return Err(EngineError::NotFound);
                }
                provider.latitude = Some(latitude);
                provider.longitude = Some(longitude);
                provider.updated_at = now;
                Ok(())
            })
        })
        .await
    }

    /// Soft delete: the row stays so requests and ratings keep resolving,
    /// but the provider leaves matching immediately.
    pub async fn soft_delete(&self, provider_id: Uuid) -> Result<(), EngineError> {
        let now = self.clock.now();

        with_retry(&self.retry, || {
            self.store.with_txn(|t| {
                let provider = t.provider_mut(provider_id).ok_or(EngineError::NotFound)?;
                provider.is_deleted = true;
                provider.availability = false;
                provider.updated_at = now;
                Ok(())
            })
        })
        .await?;

        info!("provider profile {provider_id} soft-deleted");
        Ok(())
    }

    pub fn dashboard(&self, provider_id: Uuid) -> Result<ProviderDashboardResponse, EngineError> {
        self.store.read(|t| {
            let provider = t.provider(provider_id).ok_or(EngineError::NotFound)?;
            Ok(ProviderDashboardResponse {
                total_jobs_completed: provider.total_jobs,
                pending_offers: t.pending_offer_count(provider_id),
                jobs_in_progress: t.requests_in_progress_for(provider_id),
                average_rating: provider.rating,
                currently_available: provider.availability,
            })
        })
    }
}
