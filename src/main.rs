#[macro_use]
extern crate rocket;

use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use rocket::fairing::{AdHoc, Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Build, Request, Response, Rocket};
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};

use khidma_server::config::Config;
use khidma_server::services::{
    Clock, EventSink, ExpiryReaper, IdSource, LogSink, MatchingService, ProviderService,
    RatingService, RequestService, SeekerService, SystemClock, UuidSource,
};
use khidma_server::store::MemStore;
use khidma_server::{Db, Lifecycle, Matcher, Providers, Ratings, Seekers, routes};

/* ----------------------------- CORS ----------------------------- */

pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        if let Some(origin) = request.headers().get_one("Origin") {
            response.set_header(Header::new("Access-Control-Allow-Origin", origin));
        }

        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        ));

        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        ));

        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

/* ----------------------------- OPTIONS ----------------------------- */

#[options("/<_..>")]
fn options_handler() {}

/* ----------------------------- ERRORS ----------------------------- */

#[catch(404)]
fn not_found() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Resource not found (check /api/v1 prefix)"
    })
}

#[catch(500)]
fn internal_error() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Internal server error"
    })
}

/* ----------------------------- SWAGGER ----------------------------- */

fn swagger_config() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/openapi.json".to_string(),
        ..Default::default()
    }
}

/* ----------------------------- LAUNCH ----------------------------- */

#[launch]
fn rocket() -> Rocket<Build> {
    dotenv().ok();
    env_logger::init();

    println!("🚀 Khidma API running");
    println!("📚 Swagger UI → http://localhost:8000/api/docs");

    let store: Db =
        Arc::new(MemStore::new(Duration::from_millis(Config::store_lock_timeout_ms())));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ids: Arc<dyn IdSource> = Arc::new(UuidSource);
    let events: Arc<dyn EventSink> = Arc::new(LogSink);

    let lifecycle: Lifecycle = RequestService::new(
        store.clone(),
        clock.clone(),
        ids.clone(),
        events.clone(),
        Config::lifecycle_policy(),
    );
    let matcher: Matcher = MatchingService::new(store.clone(), Config::match_policy());
    let ratings: Ratings =
        RatingService::new(store.clone(), clock.clone(), ids.clone(), Config::retry_policy());
    let providers: Providers =
        ProviderService::new(store.clone(), clock.clone(), ids.clone(), Config::retry_policy());
    let seekers: Seekers =
        SeekerService::new(store.clone(), clock.clone(), ids.clone(), Config::retry_policy());

    let reaper_lifecycle = lifecycle.clone();

    rocket::build()
        .attach(CORS)
        .attach(AdHoc::on_liftoff("Expiry Reaper", move |_| {
            Box::pin(async move {
                ExpiryReaper::spawn(
                    reaper_lifecycle,
                    Duration::from_secs(Config::reaper_interval_secs()),
                );
            })
        }))
        .manage(store)
        .manage(lifecycle)
        .manage(matcher)
        .manage(ratings)
        .manage(providers)
        .manage(seekers)
        .mount("/", routes![options_handler])
        .mount(
            "/api/v1",
            routes![
                // Seeker
                routes::seeker::create_seeker_profile,
                routes::seeker::get_seeker_profile,
                routes::seeker::update_seeker_profile,
                // Provider
                routes::provider::create_provider_profile,
                routes::provider::get_provider_profile,
                routes::provider::get_provider_profile_by_id,
                routes::provider::update_provider_profile,
                routes::provider::update_availability,
                routes::provider::update_provider_location,
                routes::provider::delete_provider_profile,
                routes::provider::provider_dashboard,
                // Matching
                routes::matching::search_providers,
                // Requests
                routes::request::create_request,
                routes::request::get_request_detail,
                routes::request::accept_offer,
                routes::request::decline_offer,
                routes::request::complete_request,
                routes::request::cancel_request,
                routes::request::seeker_requests,
                routes::request::provider_requests,
                // Ratings
                routes::rating::create_rating,
                routes::rating::get_request_rating,
                routes::rating::get_provider_ratings,
                // Ops
                routes::ops::expire_stale,
            ],
        )
        .mount("/api/docs", make_swagger_ui(&swagger_config()))
        .register("/", catchers![not_found, internal_error])
}
