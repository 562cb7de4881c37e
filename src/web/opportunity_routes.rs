use crate::models::opportunities::{
    Category, LocationType, NewOpportunity, Opportunity, OpportunityType,
};
use crate::models::users::{User, UserRole};
use crate::{ApiError, AppState};
use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const GRADE_LEVELS: [&str; 4] = ["9", "10", "11", "12"];

pub fn router(app_state: Arc<AppState>) -> Router<()> {
    Router::new()
        .route(
            "/org/opportunities",
            get(list_own_opportunities).post(create_opportunity),
        )
        .route(
            "/org/opportunities/:id",
            axum::routing::put(update_opportunity).delete(delete_opportunity),
        )
        .with_state(app_state)
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpportunityPayload {
    pub name: String,
    pub brief_description: String,
    pub category: String,
    pub opportunity_type: String,
    pub location_type: String,
    pub location_address: Option<String>,
    pub location_state: Option<String>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub min_gpa: Option<f64>,
    #[serde(default)]
    pub grade_levels: Vec<String>,
    pub cost: Option<f64>,
    #[serde(default)]
    pub has_stipend: bool,
    pub application_deadline: Option<DateTime<Utc>>,
    pub application_url: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

#[derive(Serialize)]
pub struct OpportunityResponse {
    pub opportunity: Opportunity,
}

#[derive(Serialize)]
pub struct OpportunityListResponse {
    pub data: Vec<Opportunity>,
}

/// Looks up the caller's organization and requires it to have passed admin
/// review. Unapproved organizations can log in and edit their profile but
/// cannot publish.
fn require_approved_org(
    data: &AppState,
    user: &User,
) -> Result<crate::models::organizations::Organization, ApiError> {
    if user.role() != UserRole::Organization {
        return Err(ApiError::Forbidden);
    }
    let org = data.db.get_organization_by_user_id(user.get_id())?;
    if !org.is_approved() {
        return Err(ApiError::Forbidden);
    }
    Ok(org)
}

pub async fn create_opportunity(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<OpportunityPayload>,
) -> Result<Json<OpportunityResponse>, ApiError> {
    let org = require_approved_org(&data, &user)?;
    validate_opportunity(&payload).map_err(ApiError::Validation)?;
    validate_creation_deadline(&payload, Utc::now()).map_err(ApiError::Validation)?;

    let new_opportunity = NewOpportunity {
        organization_id: org.uuid,
        name: payload.name,
        brief_description: payload.brief_description,
        category: payload.category,
        opportunity_type: payload.opportunity_type,
        location_type: payload.location_type,
        location_address: payload.location_address,
        location_state: payload.location_state,
        min_age: payload.min_age,
        max_age: payload.max_age,
        min_gpa: payload.min_gpa,
        grade_levels: payload.grade_levels,
        cost: payload.cost,
        has_stipend: payload.has_stipend,
        application_deadline: payload.application_deadline,
        application_url: payload.application_url,
        contact_email: payload.contact_email,
        contact_phone: payload.contact_phone,
    };

    let opportunity = data.db.create_opportunity(new_opportunity)?;
    info!("organization {} created opportunity {}", org.uuid, opportunity.uuid);

    Ok(Json(OpportunityResponse { opportunity }))
}

pub async fn list_own_opportunities(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<OpportunityListResponse>, ApiError> {
    if user.role() != UserRole::Organization {
        return Err(ApiError::Forbidden);
    }
    let org = data.db.get_organization_by_user_id(user.get_id())?;
    let opportunities = data.db.get_opportunities_for_organization(org.uuid)?;
    Ok(Json(OpportunityListResponse {
        data: opportunities,
    }))
}

pub async fn update_opportunity(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OpportunityPayload>,
) -> Result<Json<OpportunityResponse>, ApiError> {
    let org = require_approved_org(&data, &user)?;
    validate_opportunity(&payload).map_err(ApiError::Validation)?;

    let mut opportunity = data.db.get_opportunity_by_uuid(id)?;
    if opportunity.organization_id != org.uuid {
        return Err(ApiError::Forbidden);
    }

    opportunity.name = payload.name;
    opportunity.brief_description = payload.brief_description;
    opportunity.category = payload.category;
    opportunity.opportunity_type = payload.opportunity_type;
    opportunity.location_type = payload.location_type;
    opportunity.location_address = payload.location_address;
    opportunity.location_state = payload.location_state;
    opportunity.min_age = payload.min_age;
    opportunity.max_age = payload.max_age;
    opportunity.min_gpa = payload.min_gpa;
    opportunity.grade_levels = payload.grade_levels;
    opportunity.cost = payload.cost;
    opportunity.has_stipend = payload.has_stipend;
    opportunity.application_deadline = payload.application_deadline;
    opportunity.application_url = payload.application_url;
    opportunity.contact_email = payload.contact_email;
    opportunity.contact_phone = payload.contact_phone;

    data.db.update_opportunity(&opportunity)?;
    info!("organization {} updated opportunity {}", org.uuid, id);

    Ok(Json(OpportunityResponse { opportunity }))
}

/// Soft delete. The row stays for admin audit; it just disappears from
/// student queries.
pub async fn delete_opportunity(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let opportunity = data.db.get_opportunity_by_uuid(id)?;

    match user.role() {
        UserRole::Admin => {}
        UserRole::Organization => {
            let org = data.db.get_organization_by_user_id(user.get_id())?;
            if opportunity.organization_id != org.uuid {
                return Err(ApiError::Forbidden);
            }
        }
        UserRole::Student => return Err(ApiError::Forbidden),
    }

    data.db.deactivate_opportunity(&opportunity)?;
    info!("opportunity {} deactivated", id);

    Ok(Json(serde_json::json!({ "message": "Opportunity removed" })))
}

fn validate_opportunity(payload: &OpportunityPayload) -> Result<(), String> {
    if payload.name.trim().is_empty() {
        return Err("name is required".to_string());
    }
    if payload.brief_description.trim().is_empty() {
        return Err("brief description is required".to_string());
    }
    if Category::parse(&payload.category).is_none() {
        return Err(format!("unknown category: {}", payload.category));
    }
    if OpportunityType::parse(&payload.opportunity_type).is_none() {
        return Err(format!(
            "unknown opportunity type: {}",
            payload.opportunity_type
        ));
    }
    let location_type = LocationType::parse(&payload.location_type)
        .ok_or_else(|| format!("unknown location type: {}", payload.location_type))?;
    if location_type.requires_address()
        && payload
            .location_address
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .is_empty()
    {
        return Err("an address is required for in-person and hybrid opportunities".to_string());
    }
    if let (Some(min), Some(max)) = (payload.min_age, payload.max_age) {
        if min > max {
            return Err("minimum age cannot exceed maximum age".to_string());
        }
    }
    for age in [payload.min_age, payload.max_age].into_iter().flatten() {
        if !(10..=25).contains(&age) {
            return Err("age limits must be between 10 and 25".to_string());
        }
    }
    if let Some(gpa) = payload.min_gpa {
        if !(0.0..=5.0).contains(&gpa) {
            return Err("minimum gpa must be between 0.0 and 5.0".to_string());
        }
    }
    if let Some(cost) = payload.cost {
        if cost < 0.0 {
            return Err("cost cannot be negative".to_string());
        }
    }
    for grade in &payload.grade_levels {
        if !GRADE_LEVELS.contains(&grade.as_str()) {
            return Err(format!("invalid grade level: {}", grade));
        }
    }
    Ok(())
}

/// Creation only. Updating an existing opportunity may set (or keep) a past
/// deadline; the discovery clamp already hides it from students.
fn validate_creation_deadline(
    payload: &OpportunityPayload,
    now: DateTime<Utc>,
) -> Result<(), String> {
    if let Some(deadline) = payload.application_deadline {
        if deadline < now {
            return Err("application deadline cannot be in the past".to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn valid_payload() -> OpportunityPayload {
        OpportunityPayload {
            name: "Summer Robotics Lab".to_string(),
            brief_description: "Six-week hands-on robotics program".to_string(),
            category: "stem_innovation".to_string(),
            opportunity_type: "program".to_string(),
            location_type: "online".to_string(),
            location_address: None,
            location_state: None,
            min_age: Some(14),
            max_age: Some(18),
            min_gpa: Some(3.0),
            grade_levels: vec!["9".to_string(), "10".to_string()],
            cost: Some(0.0),
            has_stipend: false,
            application_deadline: Some(Utc::now() + Duration::days(30)),
            application_url: Some("https://example.org/apply".to_string()),
            contact_email: None,
            contact_phone: None,
        }
    }

    #[test]
    fn accepts_a_complete_payload() {
        assert!(validate_opportunity(&valid_payload()).is_ok());
    }

    #[test]
    fn requires_address_for_in_person_and_hybrid() {
        let mut payload = valid_payload();
        payload.location_type = "in_person".to_string();
        assert!(validate_opportunity(&payload).is_err());

        payload.location_address = Some("120 Main St, Springfield".to_string());
        assert!(validate_opportunity(&payload).is_ok());

        payload.location_type = "hybrid".to_string();
        payload.location_address = Some("   ".to_string());
        assert!(validate_opportunity(&payload).is_err());
    }

    #[test]
    fn past_deadline_blocks_creation_only() {
        let now = Utc::now();
        let mut payload = valid_payload();
        payload.application_deadline = Some(now - Duration::hours(1));
        assert!(validate_creation_deadline(&payload, now).is_err());
        // an update may move an existing deadline into the past
        assert!(validate_opportunity(&payload).is_ok());

        payload.application_deadline = None;
        assert!(validate_creation_deadline(&payload, now).is_ok());
    }

    #[test]
    fn rejects_inverted_age_range_and_bad_enums() {
        let mut payload = valid_payload();
        payload.min_age = Some(18);
        payload.max_age = Some(14);
        assert!(validate_opportunity(&payload).is_err());

        let mut payload = valid_payload();
        payload.category = "sports".to_string();
        assert!(validate_opportunity(&payload).is_err());

        let mut payload = valid_payload();
        payload.opportunity_type = "job".to_string();
        assert!(validate_opportunity(&payload).is_err());
    }

    #[test]
    fn rejects_out_of_range_gpa_and_grades() {
        let mut payload = valid_payload();
        payload.min_gpa = Some(6.0);
        assert!(validate_opportunity(&payload).is_err());

        let mut payload = valid_payload();
        payload.grade_levels = vec!["8".to_string()];
        assert!(validate_opportunity(&payload).is_err());
    }
}
