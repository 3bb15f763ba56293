use std::time::Duration;

use parking_lot::Mutex;

use super::{Store, Tables};
use crate::services::error::EngineError;

/// In-memory store: one mutex around the whole data set, so a transaction
/// closure sees and mutates a consistent snapshot. Rollback keeps an undo
/// copy and restores it when the closure fails. Lock acquisition is bounded
/// by `lock_timeout`; callers see `StoreBusy` past the deadline and retry.
pub struct MemStore {
    tables: Mutex<Tables>,
    lock_timeout: Duration,
}

impl MemStore {
    pub fn new(lock_timeout: Duration) -> Self {
        MemStore {
            tables: Mutex::new(Tables::default()),
            lock_timeout,
        }
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000))
    }
}

impl Store for MemStore {
    fn with_txn<R, F>(&self, f: F) -> Result<R, EngineError>
    where
        F: FnOnce(&mut Tables) -> Result<R, EngineError>,
    {
        let mut guard = self
            .tables
            .try_lock_for(self.lock_timeout)
            .ok_or(EngineError::StoreBusy)?;
        let undo = guard.clone();
        match f(&mut guard) {
            Ok(value) => Ok(value),
            Err(e) => {
                *guard = undo;
                Err(e)
            }
        }
    }

    fn read<R, F>(&self, f: F) -> Result<R, EngineError>
    where
        F: FnOnce(&Tables) -> Result<R, EngineError>,
    {
        let guard = self
            .tables
            .try_lock_for(self.lock_timeout)
            .ok_or(EngineError::StoreBusy)?;
        f(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RequestStatus, ServiceRequest};
    use chrono::Utc;
    use uuid::Uuid;

    fn pending_request(id: Uuid) -> ServiceRequest {
        let now = Utc::now();
        ServiceRequest {
            id,
            seeker_id: Uuid::new_v4(),
            service_type: "plumbing".to_string(),
            description: None,
            latitude: 31.79,
            longitude: -7.09,
            preferred_time: now,
            status: RequestStatus::Pending,
            provider_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn txn_rolls_back_on_error() {
        let store = MemStore::default();
        let id = Uuid::new_v4();

        let result: Result<(), EngineError> = store.with_txn(|t| {
            t.insert_request(pending_request(id));
            Err(EngineError::InvalidState)
        });
        assert_eq!(result, Err(EngineError::InvalidState));

        let present = store.read(|t| Ok(t.request(id).is_some())).unwrap();
        assert!(!present, "insert must not survive a failed transaction");
    }

    #[test]
    fn cas_miss_leaves_row_untouched() {
        let store = MemStore::default();
        let id = Uuid::new_v4();
        store
            .with_txn(|t| {
                t.insert_request(pending_request(id));
                Ok(())
            })
            .unwrap();

        store
            .with_txn(|t| {
                let hit = t.update_request_if(id, &[RequestStatus::InProgress], |r| {
                    r.status = RequestStatus::Done;
                });
                assert!(!hit);
                Ok(())
            })
            .unwrap();

        let status = store.read(|t| Ok(t.request(id).unwrap().status)).unwrap();
        assert_eq!(status, RequestStatus::Pending);
    }

    #[test]
    fn contention_times_out_as_store_busy() {
        use std::sync::Arc;

        let store = Arc::new(MemStore::new(Duration::from_millis(10)));
        let held = store.clone();

        let holder = std::thread::spawn(move || {
            held.with_txn(|_| {
                std::thread::sleep(Duration::from_millis(150));
                Ok(())
            })
        });
        // Give the holder time to take the lock.
        std::thread::sleep(Duration::from_millis(30));

        let blocked = store.read(|_| Ok(()));
        assert_eq!(blocked, Err(EngineError::StoreBusy));

        holder.join().unwrap().unwrap();
    }
}
