use rocket::request::{self, Request, FromRequest, Outcome};
use rocket::http::Status;
use rocket::State;
use rocket_okapi::request::OpenApiFromRequest;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::request::RequestHeaderInput;

use crate::Db;
use crate::guards::AuthGuard;
use crate::models::{Provider, Seeker};
use crate::services::jwt::Role;
use crate::store::Store;

/// Authenticated seeker with an existing profile row.
pub struct SeekerGuard {
    pub auth: AuthGuard,
    pub seeker: Seeker,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SeekerGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let auth = match req.guard::<AuthGuard>().await {
            Outcome::Success(auth) => auth,
            Outcome::Error(e) => return Outcome::Error(e),
            Outcome::Forward(f) => return Outcome::Forward(f),
        };
        if auth.role != Role::Seeker {
            return Outcome::Error((Status::Forbidden, ()));
        }

        let db = match req.guard::<&State<Db>>().await {
            Outcome::Success(db) => db,
            _ => return Outcome::Error((Status::InternalServerError, ())),
        };

        match db.read(|t| Ok(t.seeker_by_user(auth.user_id).cloned())) {
            Ok(Some(seeker)) => Outcome::Success(SeekerGuard { auth, seeker }),
            Ok(None) => Outcome::Error((Status::Forbidden, ())),
            Err(_) => Outcome::Error((Status::ServiceUnavailable, ())),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for SeekerGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

/// Authenticated provider with a live (not soft-deleted) profile row.
pub struct ProviderGuard {
    pub auth: AuthGuard,
    pub provider: Provider,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ProviderGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let auth = match req.guard::<AuthGuard>().await {
            Outcome::Success(auth) => auth,
            Outcome::Error(e) => return Outcome::Error(e),
            Outcome::Forward(f) => return Outcome::Forward(f),
        };
        if auth.role != Role::Provider {
            return Outcome::Error((Status::Forbidden, ()));
        }

        let db = match req.guard::<&State<Db>>().await {
            Outcome::Success(db) => db,
            _ => return Outcome::Error((Status::InternalServerError, ())),
        };

        match db.read(|t| Ok(t.provider_by_user(auth.user_id).cloned())) {
            Ok(Some(provider)) if !provider.is_deleted => {
                Outcome::Success(ProviderGuard { auth, provider })
            }
            Ok(_) => Outcome::Error((Status::Forbidden, ())),
            Err(_) => Outcome::Error((Status::ServiceUnavailable, ())),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for ProviderGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}
