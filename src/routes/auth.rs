use actix_web::{post, get, web, HttpResponse};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::config::AppConfig;
use crate::db::{NewUser, Store};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::users;
use crate::services::mailer::Mailer;
use crate::utils::{jwt, password};

const RESET_TOKEN_LIFETIME_HOURS: i64 = 1;

// Neutral reply for forgot-password: never reveal whether the account exists
const FORGOT_PASSWORD_REPLY: &str =
    "If an account with that email exists, a password reset link has been sent";

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(rename = "firstName")]
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[serde(rename = "lastName")]
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
}

impl From<&users::Model> for UserResponse {
    fn from(user: &users::Model) -> Self {
        UserResponse {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// POST /api/auth/register - Create an account (PUBLIC)
#[post("/register")]
pub async fn register(
    body: web::Json<RegisterRequest>,
    store: web::Data<Store>,
) -> HttpResponse {
    // 1. Validate the payload
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    // 2. Reject duplicate email
    match store.find_user_by_email(&body.email).await {
        Ok(Some(_)) => {
            return ApiError::Conflict("User already exists".to_string()).to_response();
        }
        Err(e) => return e.to_response(),
        _ => {}
    }

    // 3. Hash the password
    let password_hash = match password::hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Failed to hash password: {}", e)
            }));
        }
    };

    // 4. Create the user
    let user = match store
        .insert_user(NewUser {
            email: body.email.clone(),
            password_hash,
            first_name: body.first_name.clone(),
            last_name: body.last_name.clone(),
        })
        .await
    {
        Ok(user) => user,
        Err(e) => return e.to_response(),
    };

    // 5. Issue the JWT
    let token = match jwt::generate_token(user.id, &user.email) {
        Ok(token) => token,
        Err(e) => return e.to_response(),
    };

    HttpResponse::Created().json(serde_json::json!({
        "message": "User registered successfully",
        "token": token,
        "user": UserResponse::from(&user),
    }))
}

/// POST /api/auth/login - Sign in (PUBLIC)
#[post("/login")]
pub async fn login(body: web::Json<LoginRequest>, store: web::Data<Store>) -> HttpResponse {
    // 1. Validate the payload
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    // 2. Find the user
    let user = match store.find_user_by_email(&body.email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return ApiError::Unauthorized("Invalid credentials".to_string()).to_response();
        }
        Err(e) => return e.to_response(),
    };

    // 3. Check the password
    let is_valid = match password::verify_password(&body.password, &user.password_hash) {
        Ok(valid) => valid,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Password verification error: {}", e)
            }));
        }
    };

    if !is_valid {
        return ApiError::Unauthorized("Invalid credentials".to_string()).to_response();
    }

    // 4. Issue the JWT
    let token = match jwt::generate_token(user.id, &user.email) {
        Ok(token) => token,
        Err(e) => return e.to_response(),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "message": "Login successful",
        "token": token,
        "user": UserResponse::from(&user),
    }))
}

/// GET /api/auth/me - Current user profile (PROTECTED)
#[get("/me")]
pub async fn me(auth_user: AuthUser, store: web::Data<Store>) -> HttpResponse {
    match store.find_user_by_id(auth_user.user_id).await {
        Ok(Some(user)) => HttpResponse::Ok().json(serde_json::json!({
            "user": {
                "id": user.id,
                "email": user.email,
                "firstName": user.first_name,
                "lastName": user.last_name,
                "createdAt": user.created_at,
            }
        })),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": "User not found"
        })),
        Err(e) => e.to_response(),
    }
}

/// POST /api/auth/forgot-password - Request a reset link (PUBLIC)
#[post("/forgot-password")]
pub async fn forgot_password(
    body: web::Json<ForgotPasswordRequest>,
    store: web::Data<Store>,
    config: web::Data<AppConfig>,
    mailer: web::Data<Mailer>,
) -> HttpResponse {
    // 1. Validate the payload
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    // 2. Look up the account
    let user = match store.find_user_by_email(&body.email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::Ok().json(serde_json::json!({
                "message": FORGOT_PASSWORD_REPLY
            }));
        }
        Err(e) => return e.to_response(),
    };

    // 3. Store a fresh reset token with a 1-hour expiry
    let token = Uuid::new_v4().to_string();
    let expires = Utc::now() + Duration::hours(RESET_TOKEN_LIFETIME_HOURS);
    if let Err(e) = store.set_reset_token(user.id, &token, expires).await {
        return e.to_response();
    }

    // 4. Send the reset link
    let reset_url = format!("{}/reset-password?token={}", config.frontend_url, token);
    let html = format!(
        "<h2>Password Reset Request</h2>\
         <p>Hello {},</p>\
         <p>You requested to reset your password. Click the link below:</p>\
         <p><a href=\"{}\">Reset Password</a></p>\
         <p>This link will expire in 1 hour. If you didn't request this reset, \
         please ignore this email.</p>",
        user.first_name, reset_url
    );

    if let Err(e) = mailer.send(&user.email, "Password Reset Request", &html).await {
        return e.to_response();
    }

    HttpResponse::Ok().json(serde_json::json!({
        "message": FORGOT_PASSWORD_REPLY
    }))
}

/// POST /api/auth/reset-password - Redeem a reset token (PUBLIC)
#[post("/reset-password")]
pub async fn reset_password(
    body: web::Json<ResetPasswordRequest>,
    store: web::Data<Store>,
) -> HttpResponse {
    // 1. Validate the payload
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    // 2. Find the user holding this token
    let user = match store.find_user_by_reset_token(&body.token).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Invalid or expired reset token"
            }));
        }
        Err(e) => return e.to_response(),
    };

    // 3. Check expiry
    let expired = match user.reset_token_expires {
        Some(expires) => Utc::now() > expires,
        None => true,
    };
    if expired {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Reset token has expired"
        }));
    }

    // 4. Store the new hash and clear the token
    let password_hash = match password::hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Failed to hash password: {}", e)
            }));
        }
    };

    match store.reset_password(user.id, &password_hash).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "message": "Password reset successful"
        })),
        Err(e) => e.to_response(),
    }
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(register)
            .service(login)
            .service(me)
            .service(forgot_password)
            .service(reset_password)
    );
}
