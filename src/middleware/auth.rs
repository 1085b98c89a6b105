use actix_web::{dev::Payload, Error, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::utils::jwt;

/// Authenticated caller, decoded from the bearer token.
/// Used as an extractor on protected routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
}

/// Converts an ApiError into an actix request error that carries its
/// JSON response body.
fn request_error(e: ApiError) -> Error {
    let response = e.to_response();
    actix_web::error::InternalError::from_response("", response).into()
}

fn unauthorized(message: &str) -> Error {
    request_error(ApiError::Unauthorized(message.to_string()))
}

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let header = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
        {
            Some(h) => h,
            None => return ready(Err(unauthorized("Missing Authorization header"))),
        };

        let token = match header.strip_prefix("Bearer ") {
            Some(t) => t,
            None => {
                return ready(Err(unauthorized(
                    "Invalid Authorization format (expected: Bearer <token>)",
                )));
            }
        };

        match jwt::verify_token(token) {
            Ok(claims) => ready(Ok(AuthUser {
                user_id: claims.sub,
                email: claims.email,
            })),
            Err(e) => ready(Err(request_error(e))),
        }
    }
}
