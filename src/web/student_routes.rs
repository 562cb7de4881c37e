use crate::models::opportunities::{Category, OpportunityType};
use crate::models::student_interests::NewStudentInterest;
use crate::models::student_preferences::NewStudentPreference;
use crate::models::students::{NewStudent, Student};
use crate::models::users::{User, UserRole};
use crate::{db::DBError, ApiError, AppState};
use axum::{
    extract::State,
    routing::{get, put},
    Extension, Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Write-time invariants on interest selection. These are not database
/// constraints; the save endpoint is the only writer.
const MIN_SELECTED_INTERESTS: usize = 5;
const MIN_PRIORITY_INTERESTS: usize = 3;
const MAX_PRIORITY_INTERESTS: usize = 5;

const GRADE_LEVELS: [&str; 4] = ["9", "10", "11", "12"];

pub fn router(app_state: Arc<AppState>) -> Router<()> {
    Router::new()
        .route("/student/profile", get(get_profile).put(put_profile))
        .route("/student/interests", put(put_interests))
        .route("/student/preferences", put(put_preferences))
        .with_state(app_state)
}

fn require_student(user: &User) -> Result<(), ApiError> {
    if user.role() != UserRole::Student {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfilePayload {
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub school: String,
    pub grade_level: String,
    pub gpa: Option<f64>,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub profile: Student,
}

pub async fn get_profile(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<ProfileResponse>, ApiError> {
    require_student(&user)?;
    let profile = data.db.get_student_by_user_id(user.get_id())?;
    Ok(Json(ProfileResponse { profile }))
}

pub async fn put_profile(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<ProfilePayload>,
) -> Result<Json<ProfileResponse>, ApiError> {
    require_student(&user)?;
    validate_profile(&payload).map_err(ApiError::Validation)?;

    let user_id = user.get_id();
    let profile = match data.db.get_student_by_user_id(user_id) {
        Ok(mut existing) => {
            existing.name = payload.name;
            existing.date_of_birth = payload.date_of_birth;
            existing.school = payload.school;
            existing.grade_level = payload.grade_level;
            existing.gpa = payload.gpa;
            existing.onboarding_completed = true;
            data.db.update_student(&existing)?;
            existing
        }
        Err(DBError::StudentNotFound) => {
            let new_student = NewStudent {
                user_id,
                name: payload.name,
                date_of_birth: payload.date_of_birth,
                school: payload.school,
                grade_level: payload.grade_level,
                gpa: payload.gpa,
                age_verified: false,
                onboarding_completed: true,
            };
            data.db.create_student(new_student)?
        }
        Err(e) => return Err(e.into()),
    };

    info!("student profile saved for {}", user_id);

    Ok(Json(ProfileResponse { profile }))
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterestSelection {
    pub category: String,
    #[serde(default)]
    pub is_priority: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterestsPayload {
    pub interests: Vec<InterestSelection>,
}

/// Replaces the student's saved interests. The whole set is validated and
/// written in one transaction (delete-then-insert), so partial saves cannot
/// occur and duplicates cannot accumulate.
pub async fn put_interests(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<InterestsPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_student(&user)?;
    validate_interests(&payload.interests).map_err(ApiError::Validation)?;

    let user_id = user.get_id();
    let rows: Vec<NewStudentInterest> = payload
        .interests
        .iter()
        .map(|selection| NewStudentInterest {
            student_user_id: user_id,
            category: selection.category.clone(),
            is_priority: selection.is_priority,
        })
        .collect();

    data.db.replace_student_interests(user_id, &rows)?;

    info!("saved {} interests for {}", rows.len(), user_id);

    Ok(Json(serde_json::json!({ "message": "Interests saved" })))
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreferenceSelection {
    pub preference_type: String,
    pub other_description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreferencesPayload {
    pub preferences: Vec<PreferenceSelection>,
}

pub async fn put_preferences(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<PreferencesPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_student(&user)?;
    validate_preferences(&payload.preferences).map_err(ApiError::Validation)?;

    let user_id = user.get_id();
    let rows: Vec<NewStudentPreference> = payload
        .preferences
        .iter()
        .map(|selection| NewStudentPreference {
            student_user_id: user_id,
            preference_type: selection.preference_type.clone(),
            other_description: selection.other_description.clone(),
        })
        .collect();

    data.db.replace_student_preferences(user_id, &rows)?;

    info!("saved {} preferences for {}", rows.len(), user_id);

    Ok(Json(serde_json::json!({ "message": "Preferences saved" })))
}

fn validate_profile(payload: &ProfilePayload) -> Result<(), String> {
    if payload.name.trim().is_empty() {
        return Err("name is required".to_string());
    }
    if payload.school.trim().is_empty() {
        return Err("school is required".to_string());
    }
    if !GRADE_LEVELS.contains(&payload.grade_level.as_str()) {
        return Err(format!("invalid grade level: {}", payload.grade_level));
    }
    if payload.date_of_birth >= Utc::now().date_naive() {
        return Err("date of birth must be in the past".to_string());
    }
    if let Some(gpa) = payload.gpa {
        if !(0.0..=5.0).contains(&gpa) {
            return Err("gpa must be between 0.0 and 5.0".to_string());
        }
    }
    Ok(())
}

fn validate_interests(interests: &[InterestSelection]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for selection in interests {
        if Category::parse(&selection.category).is_none() {
            return Err(format!("unknown category: {}", selection.category));
        }
        if !seen.insert(selection.category.as_str()) {
            return Err(format!("duplicate category: {}", selection.category));
        }
    }

    if interests.len() < MIN_SELECTED_INTERESTS {
        return Err(format!(
            "select at least {} categories",
            MIN_SELECTED_INTERESTS
        ));
    }

    let priority_count = interests.iter().filter(|s| s.is_priority).count();
    if !(MIN_PRIORITY_INTERESTS..=MAX_PRIORITY_INTERESTS).contains(&priority_count) {
        return Err(format!(
            "mark between {} and {} categories as priority",
            MIN_PRIORITY_INTERESTS, MAX_PRIORITY_INTERESTS
        ));
    }

    Ok(())
}

fn validate_preferences(preferences: &[PreferenceSelection]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for selection in preferences {
        let is_known = OpportunityType::parse(&selection.preference_type).is_some();
        let is_other = selection.preference_type == "other";
        if !is_known && !is_other {
            return Err(format!(
                "unknown opportunity type: {}",
                selection.preference_type
            ));
        }
        if is_other
            && selection
                .other_description
                .as_deref()
                .map(str::trim)
                .unwrap_or("")
                .is_empty()
        {
            return Err("a description is required for the 'other' type".to_string());
        }
        if !seen.insert(selection.preference_type.as_str()) {
            return Err(format!(
                "duplicate opportunity type: {}",
                selection.preference_type
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(category: &str, is_priority: bool) -> InterestSelection {
        InterestSelection {
            category: category.to_string(),
            is_priority,
        }
    }

    fn five_valid(priority_count: usize) -> Vec<InterestSelection> {
        let categories = [
            "stem_innovation",
            "arts_design",
            "community_service",
            "health_medicine",
            "leadership_civics",
        ];
        categories
            .iter()
            .enumerate()
            .map(|(i, c)| selection(c, i < priority_count))
            .collect()
    }

    #[test]
    fn accepts_five_interests_with_three_priorities() {
        assert!(validate_interests(&five_valid(3)).is_ok());
    }

    #[test]
    fn rejects_fewer_than_five_interests() {
        let mut interests = five_valid(3);
        interests.pop();
        assert!(validate_interests(&interests).is_err());
    }

    #[test]
    fn rejects_priority_count_out_of_range() {
        assert!(validate_interests(&five_valid(2)).is_err());
        assert!(validate_interests(&five_valid(5)).is_ok());

        let mut six = five_valid(5);
        six.push(selection("environment_sustainability", true));
        // six priorities exceeds the cap
        assert!(validate_interests(&six).is_err());
    }

    #[test]
    fn rejects_unknown_or_duplicate_categories() {
        let mut interests = five_valid(3);
        interests[0].category = "sports".to_string();
        assert!(validate_interests(&interests).is_err());

        let mut interests = five_valid(3);
        interests[1].category = interests[0].category.clone();
        assert!(validate_interests(&interests).is_err());
    }

    #[test]
    fn preferences_allow_known_types_and_other_with_description() {
        let prefs = vec![
            PreferenceSelection {
                preference_type: "internship".to_string(),
                other_description: None,
            },
            PreferenceSelection {
                preference_type: "other".to_string(),
                other_description: Some("apprenticeships".to_string()),
            },
        ];
        assert!(validate_preferences(&prefs).is_ok());
        // clearing all preferences is a valid save
        assert!(validate_preferences(&[]).is_ok());
    }

    #[test]
    fn preferences_reject_bare_other_and_unknown_types() {
        let bare_other = vec![PreferenceSelection {
            preference_type: "other".to_string(),
            other_description: None,
        }];
        assert!(validate_preferences(&bare_other).is_err());

        let unknown = vec![PreferenceSelection {
            preference_type: "job".to_string(),
            other_description: None,
        }];
        assert!(validate_preferences(&unknown).is_err());
    }

    #[test]
    fn profile_rejects_bad_gpa_and_grade() {
        let base = ProfilePayload {
            name: "Jordan".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2008, 4, 2).unwrap(),
            school: "Riverside High".to_string(),
            grade_level: "10".to_string(),
            gpa: Some(3.6),
        };
        assert!(validate_profile(&base).is_ok());

        let mut bad_gpa = base.clone();
        bad_gpa.gpa = Some(5.5);
        assert!(validate_profile(&bad_gpa).is_err());

        let mut bad_grade = base;
        bad_grade.grade_level = "college".to_string();
        assert!(validate_profile(&bad_grade).is_err());
    }
}
