use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::IntoResponse,
};
use chrono::Duration;
use jwt_compact::{
    alg::{Hs256, Hs256Key},
    prelude::*,
    AlgorithmExt,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::users::User;
use crate::{ApiError, AppState, Error};

pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone)]
pub struct NewToken {
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct JwtKeys {
    key: Hs256Key,
}

impl JwtKeys {
    pub fn new(secret_bytes: Vec<u8>) -> Result<Self, Error> {
        if secret_bytes.len() < 32 {
            return Err(Error::BuilderError(
                "JWT secret must be at least 32 bytes".to_string(),
            ));
        }
        Ok(Self {
            key: Hs256Key::new(&secret_bytes),
        })
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct CustomClaims {
    pub sub: String,
    pub aud: String,
}

impl NewToken {
    pub fn new(user: &User, token_type: TokenType, app_state: &AppState) -> Result<Self, ApiError> {
        let (aud, duration) = match token_type {
            TokenType::Access => (
                "access".to_string(),
                Duration::minutes(app_state.config.access_token_maxage),
            ),
            TokenType::Refresh => (
                "refresh".to_string(),
                Duration::days(app_state.config.refresh_token_maxage),
            ),
        };

        let custom_claims = CustomClaims {
            sub: user.get_id().to_string(),
            aud,
        };

        let time_options = TimeOptions::default();
        let claims = Claims::new(custom_claims).set_duration_and_issuance(&time_options, duration);
        let header = Header::empty().with_token_type("JWT");

        let token_string = Hs256
            .token(&header, &claims, &app_state.config.jwt_keys.key)
            .map_err(|e| {
                tracing::error!("Error creating token: {:?}", e);
                ApiError::InternalServerError
            })?;

        Ok(Self {
            token: token_string,
        })
    }
}

/// Middleware that resolves the bearer token to a `User` and stores it as a
/// request extension for handlers downstream.
pub async fn validate_jwt(
    State(data): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    let token = match req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| auth_value.strip_prefix("Bearer ").map(ToString::to_string))
    {
        Some(token) => token,
        None => return ApiError::Unauthorized.into_response(),
    };

    tracing::trace!("Validating JWT");

    let claims = match validate_token(&token, &data, "access") {
        Ok(claims) => claims,
        Err(_) => return ApiError::Unauthorized.into_response(),
    };

    let user_uuid: Uuid = match Uuid::parse_str(&claims.sub) {
        Ok(uuid) => uuid,
        Err(e) => {
            tracing::error!("Error parsing user uuid: {:?}", e);
            return ApiError::Unauthorized.into_response();
        }
    };

    let user = match data.get_user(user_uuid).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("Error getting user: {:?}", e);
            return ApiError::Unauthorized.into_response();
        }
    };

    req.extensions_mut().insert(user);
    next.run(req).await
}

pub(crate) fn validate_token(
    original_token: &str,
    data: &AppState,
    expected_audience: &str,
) -> Result<CustomClaims, ApiError> {
    let parsed_token = match UntrustedToken::new(original_token) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to parse token: {:?}", e);
            return Err(ApiError::Unauthorized);
        }
    };

    let token: Token<CustomClaims> = match Hs256
        .validator(&data.config.jwt_keys.key)
        .validate(&parsed_token)
    {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Token signature validation failed: {:?}", e);
            return Err(ApiError::Unauthorized);
        }
    };

    // Only validate expiration, not maturity
    let time_options = TimeOptions::default();
    if let Err(e) = token.claims().validate_expiration(&time_options) {
        tracing::error!("Token expired: {:?}", e);
        return Err(ApiError::Unauthorized);
    }

    let claims: &Claims<CustomClaims> = token.claims();
    if claims.custom.aud != expected_audience {
        tracing::error!(
            "Invalid audience: got {}, expected {}",
            claims.custom.aud,
            expected_audience
        );
        return Err(ApiError::Unauthorized);
    }

    Ok(claims.custom.clone())
}
