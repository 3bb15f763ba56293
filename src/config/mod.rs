use rocket::figment::{Figment, providers::{Env, Format, Toml}};
use rocket::Config as RocketConfig;
use std::env;

use crate::services::matching::MatchPolicy;
use crate::services::request::LifecyclePolicy;
use crate::store::RetryPolicy;

pub struct Config;

impl Config {
    fn figment() -> Figment {
        // Get the current profile
        let profile = env::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string());

        Figment::from(RocketConfig::default())
            .merge(Toml::file("Rocket.toml").nested())
            .select(&profile)
            .merge(Env::prefixed("ROCKET_").split("_"))
    }

    pub fn jwt_secret() -> String {
        Self::figment()
            .extract_inner("jwt_secret")
            .unwrap_or_else(|_| "default-secret".to_string())
    }

    pub fn jwt_expiry() -> i64 {
        Self::figment()
            .extract_inner("jwt_expiry")
            .unwrap_or(900)
    }

    /// Pending requests older than this many hours get expired.
    pub fn expiry_threshold_hours() -> i64 {
        Self::figment()
            .extract_inner("expiry_threshold_hours")
            .unwrap_or(24)
    }

    pub fn reaper_interval_secs() -> u64 {
        Self::figment()
            .extract_inner("reaper_interval_secs")
            .unwrap_or(3600)
    }

    pub fn match_default_results() -> i64 {
        Self::figment()
            .extract_inner("match_default_results")
            .unwrap_or(20)
    }

    pub fn match_max_results() -> i64 {
        Self::figment()
            .extract_inner("match_max_results")
            .unwrap_or(50)
    }

    pub fn store_lock_timeout_ms() -> u64 {
        Self::figment()
            .extract_inner("store_lock_timeout_ms")
            .unwrap_or(1000)
    }

    pub fn txn_retry_attempts() -> u32 {
        Self::figment()
            .extract_inner("txn_retry_attempts")
            .unwrap_or(3)
    }

    pub fn txn_retry_delay_ms() -> u64 {
        Self::figment()
            .extract_inner("txn_retry_delay_ms")
            .unwrap_or(25)
    }

    pub fn allow_cancel_in_progress() -> bool {
        Self::figment()
            .extract_inner("allow_cancel_in_progress")
            .unwrap_or(true)
    }

    pub fn is_development() -> bool {
        let profile = env::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string());
        profile == "development"
    }

    pub fn retry_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: Self::txn_retry_attempts(),
            base_delay_ms: Self::txn_retry_delay_ms(),
        }
    }

    pub fn lifecycle_policy() -> LifecyclePolicy {
        LifecyclePolicy {
            expiry_threshold: chrono::Duration::hours(Self::expiry_threshold_hours()),
            allow_cancel_in_progress: Self::allow_cancel_in_progress(),
            retry: Self::retry_policy(),
        }
    }

    pub fn match_policy() -> MatchPolicy {
        MatchPolicy {
            default_results: Self::match_default_results(),
            max_results: Self::match_max_results(),
        }
    }
}
