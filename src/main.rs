use crate::db::{setup_db, DBConnection, DBError};
use crate::jwt::validate_jwt;
use crate::models::users::{NewUser, User, UserRole};
use axum::{
    http::{Method, StatusCode},
    middleware::from_fn_with_state,
    response::IntoResponse,
    Json,
};
use password_auth::{generate_hash, verify_password, VerifyError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

mod db;
mod discovery;
mod email;
mod jwt;
mod models;
mod web;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    TaskJoin(#[from] task::JoinError),

    #[error(transparent)]
    StdIo(#[from] std::io::Error),

    #[error(transparent)]
    TryInit(#[from] tracing_subscriber::util::TryInitError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DBError),

    #[error("User not found")]
    UserNotFound,

    #[error("Builder error: {0}")]
    BuilderError(String),

    #[error("Password verification error: {0}")]
    PasswordVerificationError(#[from] VerifyError),

    #[error("User with this email already exists")]
    UserAlreadyExists,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid email or password")]
    InvalidUsernameOrPassword,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("Token refresh failed")]
    RefreshFailed,

    #[error("Email already registered")]
    EmailAlreadyExists,

    #[error("Email is already verified")]
    EmailAlreadyVerified,

    #[error("Resource not found")]
    NotFound,

    #[error("Internal server error")]
    InternalServerError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            ApiError::InvalidUsernameOrPassword => StatusCode::UNAUTHORIZED,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RefreshFailed => StatusCode::UNAUTHORIZED,
            ApiError::EmailAlreadyExists => StatusCode::CONFLICT,
            ApiError::EmailAlreadyVerified => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorResponse {
                status: status.as_u16(),
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<DBError> for ApiError {
    fn from(err: DBError) -> Self {
        error!("Database error: {:?}", err);
        match err {
            DBError::UserNotFound
            | DBError::StudentNotFound
            | DBError::OrganizationNotFound
            | DBError::OpportunityNotFound
            | DBError::EmailVerificationNotFound => ApiError::NotFound,
            _ => ApiError::InternalServerError,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    status: u16,
    message: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    jwt_keys: jwt::JwtKeys,
    access_token_maxage: i64,
    refresh_token_maxage: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppMode {
    Local,
    Dev,
    Prod,
}

impl AppMode {
    fn frontend_url(&self) -> &str {
        match self {
            AppMode::Local => "http://127.0.0.1:5173",
            AppMode::Dev => "https://dev.berryopps.org",
            AppMode::Prod => "https://berryopps.org",
        }
    }
}

impl fmt::Display for AppMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppMode::Local => write!(f, "local"),
            AppMode::Dev => write!(f, "dev"),
            AppMode::Prod => write!(f, "prod"),
        }
    }
}

impl FromStr for AppMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(AppMode::Local),
            "dev" => Ok(AppMode::Dev),
            "prod" => Ok(AppMode::Prod),
            _ => Err(format!("Invalid app mode: {}", s)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    app_mode: AppMode,
    db: Arc<dyn DBConnection + Send + Sync>,
    config: Config,
    resend_api_key: Option<String>,
}

#[derive(Default)]
pub struct AppStateBuilder {
    app_mode: Option<AppMode>,
    db: Option<Arc<dyn DBConnection + Send + Sync>>,
    jwt_secret: Option<Vec<u8>>,
    resend_api_key: Option<String>,
}

impl AppStateBuilder {
    pub fn app_mode(mut self, app_mode: AppMode) -> Self {
        self.app_mode = Some(app_mode);
        self
    }

    pub fn db(mut self, db: Arc<dyn DBConnection + Send + Sync>) -> Self {
        self.db = Some(db);
        self
    }

    pub fn jwt_secret(mut self, jwt_secret: Vec<u8>) -> Self {
        self.jwt_secret = Some(jwt_secret);
        self
    }

    pub fn resend_api_key(mut self, resend_api_key: Option<String>) -> Self {
        self.resend_api_key = resend_api_key;
        self
    }

    pub fn build(self) -> Result<AppState, Error> {
        let app_mode = self
            .app_mode
            .ok_or(Error::BuilderError("app_mode is required".to_string()))?;
        let db = self
            .db
            .ok_or(Error::BuilderError("db is required".to_string()))?;
        let jwt_secret = self
            .jwt_secret
            .ok_or(Error::BuilderError("jwt_secret is required".to_string()))?;

        let config = Config {
            jwt_keys: jwt::JwtKeys::new(jwt_secret)?,
            access_token_maxage: 60,  // 60 minutes
            refresh_token_maxage: 30, // 30 days
        };

        Ok(AppState {
            app_mode,
            db,
            config,
            resend_api_key: self.resend_api_key,
        })
    }
}

impl AppState {
    async fn register_user(
        &self,
        email: String,
        password: String,
        name: Option<String>,
        role: UserRole,
    ) -> Result<User, Error> {
        match self.db.get_user_by_email(&email) {
            Ok(_) => return Err(Error::UserAlreadyExists),
            Err(DBError::UserNotFound) => {}
            Err(e) => return Err(Error::DatabaseError(e)),
        }

        let password_hash = generate_hash(password);

        tracing::debug!("registering new user: {}", email);

        let new_user = NewUser::new(email, Some(password_hash), role).with_name_option(name);
        let user = self.db.create_user(new_user)?;

        tracing::info!("registered new user: {} {}", user.email, user.uuid);

        Ok(user)
    }

    async fn authenticate_user(
        &self,
        user_email: String,
        user_password: String,
    ) -> Result<Option<User>, Error> {
        let user = match self.db.get_user_by_email(&user_email) {
            Ok(user) => user,
            Err(DBError::UserNotFound) => return Ok(None),
            Err(e) => return Err(Error::DatabaseError(e)),
        };

        let password_hash = match user.password_hash {
            Some(ref hash) => hash.clone(),
            None => return Ok(None),
        };

        // Verifying the password is blocking and potentially slow, so we'll
        // do so via `spawn_blocking`.
        let res =
            task::spawn_blocking(move || verify_password(user_password, &password_hash)).await?;

        match res {
            Ok(_) => Ok(Some(user)),
            Err(_) => Ok(None),
        }
    }

    async fn get_user(&self, user_uuid: Uuid) -> Result<User, Error> {
        let user = self
            .db
            .get_user_by_uuid(user_uuid)
            .map_err(|_| Error::UserNotFound)?;
        Ok(user)
    }

    pub fn frontend_url(&self) -> String {
        self.app_mode.frontend_url().to_string()
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file
    dotenv::dotenv().ok();

    let app_mode = std::env::var("APP_MODE")
        .unwrap_or_else(|_| "local".to_string())
        .parse::<AppMode>()
        .expect("Invalid APP_MODE");

    tracing_subscriber::registry()
        .with(EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(
            |_| "berry_backend=debug,tower_http=debug".into(),
        )))
        .with(tracing_subscriber::fmt::layer().with_ansi(false))
        .try_init()?;

    let pg_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = setup_db(pg_url);

    let jwt_secret = std::env::var("JWT_SECRET")
        .expect("JWT_SECRET must be set")
        .into_bytes();

    let resend_api_key = std::env::var("RESEND_API_KEY").ok();

    let app_state = AppStateBuilder::default()
        .app_mode(app_mode.clone())
        .db(db)
        .jwt_secret(jwt_secret)
        .resend_api_key(resend_api_key)
        .build()?;
    tracing::info!("App state created, app_mode: {:?}", app_mode);

    let app_state = Arc::new(app_state);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
        .allow_origin(Any);

    let app = web::discovery_routes(app_state.clone())
        .route_layer(from_fn_with_state(app_state.clone(), validate_jwt))
        .merge(
            web::student_routes(app_state.clone())
                .route_layer(from_fn_with_state(app_state.clone(), validate_jwt)),
        )
        .merge(
            web::opportunity_routes(app_state.clone())
                .route_layer(from_fn_with_state(app_state.clone(), validate_jwt)),
        )
        .merge(
            web::org_routes(app_state.clone())
                .route_layer(from_fn_with_state(app_state.clone(), validate_jwt)),
        )
        .merge(web::health_routes())
        .merge(web::login_routes(app_state.clone()))
        .layer(cors);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;

    tracing::info!("Listening on http://localhost:3000");

    Ok(axum::serve(listener, app.into_make_service()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_to_their_status_codes() {
        // a missing or bad bearer token is a 401, not a bespoke variant
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Validation("bad field".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::InternalServerError.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn db_not_found_errors_become_404() {
        assert!(matches!(
            ApiError::from(DBError::OpportunityNotFound),
            ApiError::NotFound
        ));
        assert!(matches!(
            ApiError::from(DBError::ConnectionError),
            ApiError::InternalServerError
        ));
    }
}
