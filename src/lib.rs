#[macro_use]
extern crate rocket;

pub mod config;
pub mod guards;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;

use store::MemStore;

/// Shared handle to the in-memory store, managed as Rocket state the same
/// way a database handle would be.
pub type Db = Arc<MemStore>;

pub type Lifecycle = services::request::RequestService<MemStore>;
pub type Matcher = services::matching::MatchingService<MemStore>;
pub type Ratings = services::rating::RatingService<MemStore>;
pub type Providers = services::provider::ProviderService<MemStore>;
pub type Seekers = services::seeker::SeekerService<MemStore>;
