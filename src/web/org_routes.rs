use crate::db::DBError;
use crate::email::send_verification_email;
use crate::models::email_verification::NewEmailVerification;
use crate::models::organizations::{NewOrganization, Organization, VerificationStatus};
use crate::models::users::{User, UserRole};
use crate::{ApiError, AppState};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::spawn;
use tracing::{error, info};
use uuid::Uuid;

pub fn router(app_state: Arc<AppState>) -> Router<()> {
    Router::new()
        .route("/org/register", post(register_organization))
        .route("/org/profile", get(get_org_profile))
        .route("/admin/organizations", get(list_organizations))
        .route("/admin/organizations/:id/approve", post(approve_organization))
        .route("/admin/organizations/:id/reject", post(reject_organization))
        .with_state(app_state)
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrgRegisterPayload {
    pub name: String,
    pub org_type: String,
    pub business_id: Option<String>,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub website: Option<String>,
}

#[derive(Serialize)]
pub struct OrgResponse {
    pub organization: Organization,
}

#[derive(Serialize)]
pub struct OrgListResponse {
    pub data: Vec<Organization>,
}

/// Creates the caller's organization profile in the `pending` state and
/// (re)sends their email verification code. An account can hold at most one
/// organization.
pub async fn register_organization(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<OrgRegisterPayload>,
) -> Result<Json<OrgResponse>, ApiError> {
    if user.role() != UserRole::Organization {
        return Err(ApiError::Forbidden);
    }
    validate_org_profile(&payload).map_err(ApiError::Validation)?;

    let user_id = user.get_id();
    match data.db.get_organization_by_user_id(user_id) {
        Ok(_) => {
            return Err(ApiError::Validation(
                "an organization is already registered for this account".to_string(),
            ))
        }
        Err(DBError::OrganizationNotFound) => {}
        Err(e) => return Err(e.into()),
    }

    // If the account already verified its email during signup, the org can
    // skip straight to the review queue.
    let (initial_status, resend_code) = match data.db.get_email_verification_by_user_id(user_id) {
        Ok(verification) if verification.is_verified => (VerificationStatus::EmailVerified, None),
        Ok(verification) => (
            VerificationStatus::Pending,
            Some(verification.verification_code),
        ),
        Err(DBError::EmailVerificationNotFound) => {
            let verification = data
                .db
                .create_email_verification(NewEmailVerification::new(user_id, 24))?;
            (VerificationStatus::Pending, Some(verification.verification_code))
        }
        Err(e) => return Err(e.into()),
    };

    let new_org = NewOrganization {
        user_id,
        name: payload.name,
        org_type: payload.org_type,
        business_id: payload.business_id,
        description: payload.description,
        contact_email: payload.contact_email,
        contact_phone: payload.contact_phone,
        website: payload.website,
        verification_status: initial_status.as_str().to_string(),
    };
    let organization = data.db.create_organization(new_org)?;
    info!(
        "organization {} registered with status {}",
        organization.uuid,
        initial_status.as_str()
    );

    if let Some(code) = resend_code {
        let app_state = data.clone();
        let to_email = user.email.clone();
        spawn(async move {
            if let Err(e) = send_verification_email(&app_state, to_email, code).await {
                error!("Failed to send verification email: {:?}", e);
            }
        });
    }

    Ok(Json(OrgResponse { organization }))
}

pub async fn get_org_profile(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<OrgResponse>, ApiError> {
    if user.role() != UserRole::Organization {
        return Err(ApiError::Forbidden);
    }
    let organization = data.db.get_organization_by_user_id(user.get_id())?;
    Ok(Json(OrgResponse { organization }))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

/// Admin review queue. Defaults to organizations awaiting approval.
pub async fn list_organizations(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<OrgListResponse>, ApiError> {
    if user.role() != UserRole::Admin {
        return Err(ApiError::Forbidden);
    }

    let status = match query.status.as_deref() {
        None => VerificationStatus::EmailVerified,
        Some(raw) => VerificationStatus::parse(raw)
            .ok_or_else(|| ApiError::Validation(format!("unknown status: {}", raw)))?,
    };

    let data_rows = data.db.get_organizations_by_status(status)?;
    Ok(Json(OrgListResponse { data: data_rows }))
}

pub async fn approve_organization(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrgResponse>, ApiError> {
    if user.role() != UserRole::Admin {
        return Err(ApiError::Forbidden);
    }

    let mut organization = data.db.get_organization_by_uuid(id)?;
    if organization.status() == VerificationStatus::Pending {
        return Err(ApiError::Validation(
            "organization has not verified its email yet".to_string(),
        ));
    }
    data.db
        .set_organization_status(&mut organization, VerificationStatus::Approved)?;
    info!("organization {} approved", id);

    Ok(Json(OrgResponse { organization }))
}

pub async fn reject_organization(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrgResponse>, ApiError> {
    if user.role() != UserRole::Admin {
        return Err(ApiError::Forbidden);
    }

    let mut organization = data.db.get_organization_by_uuid(id)?;
    data.db
        .set_organization_status(&mut organization, VerificationStatus::Rejected)?;
    info!("organization {} rejected", id);

    Ok(Json(OrgResponse { organization }))
}

fn validate_org_profile(payload: &OrgRegisterPayload) -> Result<(), String> {
    if payload.name.trim().is_empty() {
        return Err("organization name is required".to_string());
    }
    if payload.org_type.trim().is_empty() {
        return Err("organization type is required".to_string());
    }
    if let Some(email) = payload.contact_email.as_deref() {
        if !email.contains('@') {
            return Err("invalid contact email".to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> OrgRegisterPayload {
        OrgRegisterPayload {
            name: "City Science Alliance".to_string(),
            org_type: "nonprofit".to_string(),
            business_id: None,
            description: Some("After-school STEM programs".to_string()),
            contact_email: Some("hello@csa.org".to_string()),
            contact_phone: None,
            website: Some("https://csa.org".to_string()),
        }
    }

    #[test]
    fn accepts_a_complete_profile() {
        assert!(validate_org_profile(&payload()).is_ok());
    }

    #[test]
    fn requires_name_and_type() {
        let mut p = payload();
        p.name = "  ".to_string();
        assert!(validate_org_profile(&p).is_err());

        let mut p = payload();
        p.org_type = String::new();
        assert!(validate_org_profile(&p).is_err());
    }

    #[test]
    fn rejects_malformed_contact_email() {
        let mut p = payload();
        p.contact_email = Some("not-an-email".to_string());
        assert!(validate_org_profile(&p).is_err());
    }
}
