use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Time source injected into the engine so expiry behavior is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Id source injected the same way; tests can pin ids if they need to.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> Uuid;
}

pub struct UuidSource;

impl IdSource for UuidSource {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}
