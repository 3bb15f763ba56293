use std::sync::Arc;

use log::info;
use uuid::Uuid;

use crate::models::{CreateSeekerProfileDto, Seeker, UpdateSeekerProfileDto};
use crate::services::clock::{Clock, IdSource};
use crate::services::error::EngineError;
use crate::store::{RetryPolicy, Store, with_retry};

pub struct SeekerService<S: Store> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
    retry: RetryPolicy,
}

impl<S: Store> SeekerService<S> {
    pub fn new(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
        retry: RetryPolicy,
    ) -> Self {
        SeekerService { store, clock, ids, retry }
    }

    pub async fn create_profile(
        &self,
        user_id: Uuid,
        dto: CreateSeekerProfileDto,
    ) -> Result<Uuid, EngineError> {
        let now = self.clock.now();
        let id = self.ids.next_id();

        with_retry(&self.retry, || {
            self.store.with_txn(|t| {
                if t.seeker_by_user(user_id).is_some() {
                    return Err(EngineError::InvalidState);
                }
                t.insert_seeker(Seeker {
                    id,
                    user_id,
                    full_name: dto.full_name.clone(),
                    phone: dto.phone.clone(),
                    latitude: dto.latitude,
                    longitude: dto.longitude,
                    address: dto.address.clone(),
                    created_at: now,
                    updated_at: now,
                });
                Ok(())
            })
        })
        .await?;

        info!("seeker profile {id} created");
        Ok(id)
    }

    pub fn get_profile(&self, seeker_id: Uuid) -> Result<Seeker, EngineError> {
        self.store.read(|t| t.seeker(seeker_id).cloned().ok_or(EngineError::NotFound))
    }

    pub async fn update_profile(
        &self,
        seeker_id: Uuid,
        dto: UpdateSeekerProfileDto,
    ) -> Result<Seeker, EngineError> {
        let now = self.clock.now();

        with_retry(&self.retry, || {
            self.store.with_txn(|t| {
                let seeker = t.seeker_mut(seeker_id).ok_or(EngineError::NotFound)?;
                if let Some(ref full_name) = dto.full_name {
                    seeker.full_name = full_name.clone();
                }
                if let Some(ref phone) = dto.phone {
                    seeker.phone = phone.clone();
                }
                if let Some(latitude) = dto.latitude {
                    seeker.latitude = Some(latitude);
                }
                if let Some(longitude) = dto.longitude {
                    seeker.longitude = Some(longitude);
                }
                if let Some(ref address) = dto.address {
                    seeker.address = Some(address.clone());
                }
                seeker.updated_at = now;
                Ok(seeker.clone())
            })
        })
        .await
    }
}
