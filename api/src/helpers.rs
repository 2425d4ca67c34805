//! Fairings and error responses shared by every route.

use podium_common::{ErrorKind, ScoringError};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::Response;
use rocket::response::status as rocket_status;
use rocket::serde::json::Json;
use rocket::serde::Serialize;
use std::time::Instant;

#[derive(Clone, Copy)]
pub struct RequestTimingFairing;

#[rocket::async_trait]
impl Fairing for RequestTimingFairing {
    fn info(&self) -> Info {
        Info {
            name: "Request timing",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _data: &mut rocket::Data<'_>) {
        request.local_cache(Instant::now);
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let elapsed = request.local_cache(Instant::now).elapsed();
        let route = request
            .route()
            .and_then(|r| r.name.as_deref())
            .unwrap_or("unmatched");

        tracing::info!(
            method = %request.method(),
            path = %request.uri(),
            route,
            status = response.status().code,
            elapsed_ms = elapsed.as_millis(),
            "Request completed"
        );
    }
}

#[derive(Clone, Copy)]
pub struct CorsFairing;

#[rocket::async_trait]
impl Fairing for CorsFairing {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "Content-Type"));
    }
}

/// JSON body of every error response; `error` is the engine's error kind.
#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ApiErrorBody {
    error: &'static str,
    message: String,
}

pub type ApiError = rocket_status::Custom<Json<ApiErrorBody>>;
pub type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: Status, error: &'static str, message: String) -> ApiError {
    rocket_status::Custom(status, Json(ApiErrorBody { error, message }))
}

pub fn internal_error(message: &str) -> ApiError {
    api_error(Status::InternalServerError, "internal", message.to_string())
}

/// Map an engine error to a response by its kind.
pub fn scoring_error(err: &ScoringError) -> ApiError {
    match err.kind() {
        ErrorKind::Validation => api_error(Status::BadRequest, "validation", err.to_string()),
        ErrorKind::NotFound => api_error(Status::NotFound, "not_found", err.to_string()),
        ErrorKind::Conflict => api_error(Status::Conflict, "conflict", err.to_string()),
        ErrorKind::Persistence => {
            tracing::error!(error = %err, "Store failure");
            internal_error("The score store is unavailable, please retry later.")
        }
    }
}
