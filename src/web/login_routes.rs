use crate::jwt::{validate_token, NewToken, TokenType};
use crate::models::email_verification::NewEmailVerification;
use crate::models::organizations::VerificationStatus;
use crate::models::users::UserRole;
use crate::{db::DBError, email::send_verification_email, ApiError, AppState, Error};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::spawn;
use tracing::{error, info};
use uuid::Uuid;

pub fn router(app_state: Arc<AppState>) -> Router<()> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
        .route("/verify-email/:code", get(verify_email))
        .with_state(app_state)
}

#[derive(Deserialize, Clone)]
pub struct RegisterCredentials {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub role: String,
}

#[derive(Deserialize, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RefreshRequest {
    refresh_token: String,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    access_token: String,
    refresh_token: String,
}

pub async fn register(
    State(data): State<Arc<AppState>>,
    Json(creds): Json<RegisterCredentials>,
) -> Result<Json<AuthResponse>, ApiError> {
    if !creds.email.contains('@') {
        return Err(ApiError::Validation("invalid email address".to_string()));
    }
    if creds.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }
    let role = UserRole::parse(&creds.role)
        .filter(|r| *r != UserRole::Admin)
        .ok_or_else(|| ApiError::Validation(format!("invalid role: {}", creds.role)))?;

    let user = data
        .register_user(creds.email, creds.password, creds.name, role)
        .await
        .map_err(|e| match e {
            Error::UserAlreadyExists => ApiError::EmailAlreadyExists,
            _ => {
                error!("Registration failed: {:?}", e);
                ApiError::InternalServerError
            }
        })?;

    // Record the verification code, then send the email in the background
    let verification = data
        .db
        .create_email_verification(NewEmailVerification::new(user.uuid, 24))?;

    let app_state = data.clone();
    let to_email = user.email.clone();
    let code = verification.verification_code;
    spawn(async move {
        if let Err(e) = send_verification_email(&app_state, to_email, code).await {
            error!("Failed to send verification email: {:?}", e);
        }
    });

    let access_token = NewToken::new(&user, TokenType::Access, &data)?;
    let refresh_token = NewToken::new(&user, TokenType::Refresh, &data)?;

    Ok(Json(AuthResponse {
        id: user.get_id(),
        email: user.email.clone(),
        role: user.role(),
        access_token: access_token.token,
        refresh_token: refresh_token.token,
    }))
}

pub async fn login(
    State(data): State<Arc<AppState>>,
    Json(creds): Json<Credentials>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = data
        .authenticate_user(creds.email, creds.password)
        .await
        .map_err(|e| {
            error!("Authentication error: {:?}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::InvalidUsernameOrPassword)?;

    info!("user logged in: {}", user.get_id());

    let access_token = NewToken::new(&user, TokenType::Access, &data)?;
    let refresh_token = NewToken::new(&user, TokenType::Refresh, &data)?;

    Ok(Json(AuthResponse {
        id: user.get_id(),
        email: user.email.clone(),
        role: user.role(),
        access_token: access_token.token,
        refresh_token: refresh_token.token,
    }))
}

pub async fn refresh_token(
    State(data): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let claims =
        validate_token(&request.refresh_token, &data, "refresh").map_err(|_| ApiError::RefreshFailed)?;

    let user_uuid = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::RefreshFailed)?;
    let user = data
        .get_user(user_uuid)
        .await
        .map_err(|_| ApiError::RefreshFailed)?;

    let access_token = NewToken::new(&user, TokenType::Access, &data)?;
    let refresh_token = NewToken::new(&user, TokenType::Refresh, &data)?;

    Ok(Json(RefreshResponse {
        access_token: access_token.token,
        refresh_token: refresh_token.token,
    }))
}

/// Confirms an emailed verification code. For organization accounts this
/// also advances a pending organization to `email_verified`.
pub async fn verify_email(
    State(data): State<Arc<AppState>>,
    Path(code): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut verification = match data.db.get_email_verification_by_code(code) {
        Ok(v) => v,
        Err(DBError::EmailVerificationNotFound) => return Err(ApiError::NotFound),
        Err(e) => return Err(e.into()),
    };

    if verification.is_verified {
        return Err(ApiError::EmailAlreadyVerified);
    }
    if verification.is_expired() {
        return Err(ApiError::Validation(
            "verification code has expired".to_string(),
        ));
    }

    data.db.verify_email(&mut verification)?;

    match data.db.get_organization_by_user_id(verification.user_id) {
        Ok(mut org) if org.status() == VerificationStatus::Pending => {
            data.db
                .set_organization_status(&mut org, VerificationStatus::EmailVerified)?;
        }
        Ok(_) => {}
        Err(DBError::OrganizationNotFound) => {}
        Err(e) => return Err(e.into()),
    }

    info!("email verified for user {}", verification.user_id);

    Ok(Json(json!({ "message": "Email verified successfully" })))
}
