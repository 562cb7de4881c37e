//! The discovery surface: the personalized student feed, the searchable
//! explore list, and the single-opportunity detail card.

use crate::discovery::{
    attach_org_names, deadline_open, distinct_org_ids, OpportunityFilter, OpportunityWithOrg,
    PageParams,
};
use crate::models::opportunities::Category;
use crate::models::users::{User, UserRole};
use crate::{ApiError, AppState};
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub fn router(app_state: Arc<AppState>) -> Router<()> {
    Router::new()
        .route("/opportunities/student-feed", get(student_feed))
        .route("/opportunities/student-explore", get(student_explore))
        .route("/opportunities/opportunity-card", get(opportunity_card))
        .with_state(app_state)
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExploreQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub has_link: bool,
    #[serde(default)]
    pub has_phone: bool,
}

#[derive(Debug, Serialize)]
pub struct PreferenceSets {
    pub categories: Vec<String>,
    pub preference_types: Vec<String>,
}

#[derive(Serialize)]
pub struct FeedResponse {
    pub data: Vec<OpportunityWithOrg>,
    pub preferences: PreferenceSets,
    pub page: i64,
    pub page_size: i64,
    pub has_more: bool,
}

#[derive(Serialize)]
pub struct ExploreResponse {
    pub data: Vec<OpportunityWithOrg>,
    pub page: i64,
    pub page_size: i64,
    pub has_more: bool,
}

/// Personalized feed. Filters come from the caller's own saved preferences,
/// never from request parameters, so one student cannot view another's feed.
pub async fn student_feed(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<PageQuery>,
) -> Result<Json<FeedResponse>, ApiError> {
    if user.role() != UserRole::Student {
        return Err(ApiError::Forbidden);
    }

    let user_id = user.get_id();
    debug!("student_feed request for {}", user_id);

    let categories: Vec<String> = data
        .db
        .get_student_interests(user_id)?
        .into_iter()
        .map(|i| i.category)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let preference_types: Vec<String> = data
        .db
        .get_student_preferences(user_id)?
        .into_iter()
        .map(|p| p.preference_type)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let filter = OpportunityFilter::for_feed(categories.clone(), preference_types.clone());
    let page = PageParams::new(query.page, query.page_size);

    let rows = data.db.list_opportunities(&filter, page)?;
    let has_more = page.has_more(rows.len());
    let data_rows = resolve_org_names(&data, rows)?;

    Ok(Json(FeedResponse {
        data: data_rows,
        preferences: PreferenceSets {
            categories,
            preference_types,
        },
        page: page.page,
        page_size: page.page_size,
        has_more,
    }))
}

/// Unpersonalized list with request-parameter filters. Any authenticated
/// role may browse.
pub async fn student_explore(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<ExploreQuery>,
) -> Result<Json<ExploreResponse>, ApiError> {
    debug!("student_explore request for {}", user.get_id());

    let category = match query.category {
        Some(ref raw) if !raw.trim().is_empty() => {
            let parsed = Category::parse(raw)
                .ok_or_else(|| ApiError::Validation(format!("unknown category: {}", raw)))?;
            Some(parsed.as_str().to_string())
        }
        _ => None,
    };

    let filter = OpportunityFilter::for_explore(
        category,
        query.search,
        query.location,
        query.has_link,
        query.has_phone,
    );
    let page = PageParams::new(query.page, query.page_size);

    let rows = data.db.list_opportunities(&filter, page)?;
    let has_more = page.has_more(rows.len());
    let data_rows = resolve_org_names(&data, rows)?;

    Ok(Json(ExploreResponse {
        data: data_rows,
        page: page.page,
        page_size: page.page_size,
        has_more,
    }))
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardQuery {
    pub id: Uuid,
}

#[derive(Serialize)]
pub struct OpportunityCardResponse {
    #[serde(flatten)]
    pub opportunity: OpportunityWithOrg,
    /// Whether the deadline has not yet passed (always true when no
    /// deadline is set).
    pub is_open: bool,
}

/// Extended detail for one opportunity. Any authenticated identity may view
/// any opportunity, active or not; there is no ownership check on this read
/// path.
pub async fn opportunity_card(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<CardQuery>,
) -> Result<Json<OpportunityCardResponse>, ApiError> {
    debug!("opportunity_card request for {}", user.get_id());

    let opportunity = data.db.get_opportunity_by_uuid(query.id)?;
    let is_open = deadline_open(opportunity.application_deadline, Utc::now());

    let mut resolved = resolve_org_names(&data, vec![opportunity])?;
    // resolve_org_names returns exactly as many rows as it was given
    let opportunity = resolved.pop().ok_or(ApiError::InternalServerError)?;

    Ok(Json(OpportunityCardResponse {
        opportunity,
        is_open,
    }))
}

/// One batch lookup per page of rows; a missing organization yields
/// `org_name: None` rather than an error.
fn resolve_org_names(
    data: &AppState,
    rows: Vec<crate::models::opportunities::Opportunity>,
) -> Result<Vec<OpportunityWithOrg>, ApiError> {
    let ids = distinct_org_ids(&rows);
    let names: HashMap<Uuid, String> = if ids.is_empty() {
        HashMap::new()
    } else {
        data.db.get_organization_names(&ids)?.into_iter().collect()
    };
    Ok(attach_org_names(rows, &names))
}
