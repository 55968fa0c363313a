//! Authentication handlers.

use actix_web::{HttpResponse, web};

use quill_core::domain::{Credentials, NewUser, User};
use quill_core::services::Session;
use quill_shared::ApiResponse;
use quill_shared::dto::{AuthResponse, LoginRequest, RegisterUserRequest, UserResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

fn user_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
        created_at: user.created_at,
    }
}

fn auth_response(session: Session) -> AuthResponse {
    AuthResponse {
        user: user_response(&session.user),
        access_token: session.access_token,
        token_type: "Bearer".to_string(),
        expires_in: session.expires_in,
    }
}

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterUserRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let session = state
        .accounts
        .register(NewUser {
            first_name: req.first_name,
            last_name: req.last_name,
            username: req.username,
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(
        auth_response(session),
        "User registered successfully",
    )))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let session = state
        .accounts
        .login(Credentials {
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        auth_response(session),
        "Login successful",
    )))
}

/// GET /api/auth/me - Protected route
pub async fn me(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let user = state.accounts.profile(&identity.actor()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user_response(&user))))
}
