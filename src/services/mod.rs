pub mod clock;
pub mod error;
pub mod events;
pub mod geo;
pub mod jwt;
pub mod matching;
pub mod provider;
pub mod rating;
pub mod reaper;
pub mod request;
pub mod seeker;

pub use clock::{Clock, IdSource, SystemClock, UuidSource};
pub use error::EngineError;
pub use events::{EventSink, LogSink, RecordingSink};
pub use jwt::{JwtService, Role};
pub use matching::{MatchCriteria, MatchPolicy, MatchingService};
pub use provider::ProviderService;
pub use rating::RatingService;
pub use reaper::ExpiryReaper;
pub use request::{LifecyclePolicy, NewRequest, RequestService};
pub use seeker::SeekerService;
