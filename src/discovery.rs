//! The opportunity discovery query: filter composition, pagination rules,
//! and organization name resolution shared by the student-feed and
//! student-explore surfaces.

use crate::models::opportunities::Opportunity;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Conjunctive filter over active opportunities. Empty vecs and `None`
/// fields restrict nothing, so a student with no saved preferences sees the
/// full candidate set rather than an empty feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpportunityFilter {
    pub categories: Vec<String>,
    pub opportunity_types: Vec<String>,
    pub search: Option<String>,
    pub location: Option<String>,
    pub has_link: bool,
    pub has_phone: bool,
}

impl OpportunityFilter {
    /// Feed filter: the caller's own saved interests and type preferences.
    pub fn for_feed(categories: Vec<String>, opportunity_types: Vec<String>) -> Self {
        OpportunityFilter {
            categories,
            opportunity_types,
            ..Default::default()
        }
    }

    /// Explore filter: request parameters only, single optional category.
    pub fn for_explore(
        category: Option<String>,
        search: Option<String>,
        location: Option<String>,
        has_link: bool,
        has_phone: bool,
    ) -> Self {
        OpportunityFilter {
            categories: category.into_iter().collect(),
            opportunity_types: Vec::new(),
            search: non_empty(search),
            location: non_empty(location),
            has_link,
            has_phone,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Escapes LIKE/ILIKE metacharacters so user input always matches literally.
/// Postgres treats backslash as the default escape character.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Offset/limit pagination window. `page` is 1-based; `page_size` is clamped
/// to 1..=100 with a default of 20.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub page_size: i64,
}

impl PageParams {
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        PageParams {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        // page comes straight from the query string; saturate instead of
        // overflowing on absurd values
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    /// A full page is taken to mean more rows may exist. This is a
    /// heuristic, not an exact count, and callers rely on exactly this
    /// behavior.
    pub fn has_more(&self, returned: usize) -> bool {
        returned as i64 == self.page_size
    }
}

/// Whether an opportunity is still accepting applications at `now`. A null
/// deadline never closes.
pub fn deadline_open(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match deadline {
        Some(deadline) => deadline >= now,
        None => true,
    }
}

/// An opportunity row with its organization display name resolved. This is
/// the one shape the discovery endpoints return; resolution failures degrade
/// to a missing name, never an error.
#[derive(Debug, Clone, Serialize)]
pub struct OpportunityWithOrg {
    #[serde(flatten)]
    pub opportunity: Opportunity,
    pub org_name: Option<String>,
}

/// The distinct organization ids referenced on a page, for one batch lookup.
pub fn distinct_org_ids(rows: &[Opportunity]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = rows.iter().map(|o| o.organization_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Attaches resolved names to a page of rows. Idempotent and side-effect
/// free; an id absent from `names` yields `org_name: None`.
pub fn attach_org_names(
    rows: Vec<Opportunity>,
    names: &HashMap<Uuid, String>,
) -> Vec<OpportunityWithOrg> {
    rows.into_iter()
        .map(|opportunity| {
            let org_name = names.get(&opportunity.organization_id).cloned();
            OpportunityWithOrg {
                opportunity,
                org_name,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample_opportunity(org_id: Uuid) -> Opportunity {
        Opportunity {
            id: 1,
            uuid: Uuid::new_v4(),
            organization_id: org_id,
            name: "Youth STEM Camp".to_string(),
            brief_description: "A summer camp".to_string(),
            category: "stem_innovation".to_string(),
            opportunity_type: "program".to_string(),
            location_type: "online".to_string(),
            location_address: None,
            location_state: None,
            min_age: None,
            max_age: None,
            min_gpa: None,
            grade_levels: vec!["9".to_string(), "10".to_string()],
            cost: None,
            has_stipend: false,
            application_deadline: None,
            application_url: None,
            contact_email: None,
            contact_phone: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_preferences_mean_unrestricted() {
        let filter = OpportunityFilter::for_feed(Vec::new(), Vec::new());
        assert_eq!(filter, OpportunityFilter::default());
        assert!(filter.categories.is_empty());
        assert!(filter.opportunity_types.is_empty());
    }

    #[test]
    fn explore_blank_search_is_dropped() {
        let filter = OpportunityFilter::for_explore(
            None,
            Some("   ".to_string()),
            Some(String::new()),
            false,
            false,
        );
        assert_eq!(filter.search, None);
        assert_eq!(filter.location, None);
    }

    #[test]
    fn explore_category_is_a_single_equality() {
        let filter = OpportunityFilter::for_explore(
            Some("arts_design".to_string()),
            Some("robotics".to_string()),
            None,
            false,
            false,
        );
        assert_eq!(filter.categories, vec!["arts_design".to_string()]);
        // search stays ANDed alongside the category, never ORed
        assert_eq!(filter.search.as_deref(), Some("robotics"));
    }

    #[test]
    fn escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn page_params_defaults_and_clamping() {
        let params = PageParams::new(None, None);
        assert_eq!(params, PageParams { page: 1, page_size: 20 });

        assert_eq!(PageParams::new(Some(0), Some(0)).page, 1);
        assert_eq!(PageParams::new(Some(0), Some(0)).page_size, 1);
        assert_eq!(PageParams::new(Some(-3), Some(1000)).page_size, 100);
    }

    #[test]
    fn offset_saturates_for_huge_page_numbers() {
        let params = PageParams::new(Some(i64::MAX), Some(100));
        let offset = params.offset();
        assert!(offset >= 0);
        assert_eq!(offset, i64::MAX);

        // the ordinary arithmetic is unchanged
        assert_eq!(PageParams::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn pages_are_disjoint_windows() {
        let first = PageParams::new(Some(1), Some(10));
        let second = PageParams::new(Some(2), Some(10));
        assert_eq!(first.offset(), 0);
        assert_eq!(second.offset(), first.offset() + first.limit());
        // together the two windows cover exactly the first 20 rows
        assert_eq!(second.offset() + second.limit(), 20);
    }

    #[test]
    fn has_more_is_the_full_page_heuristic() {
        let params = PageParams::new(Some(1), Some(10));
        assert!(params.has_more(10));
        assert!(!params.has_more(9));
        assert!(!params.has_more(0));
    }

    #[test]
    fn deadline_clamp_excludes_only_past_deadlines() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        assert!(!deadline_open(Some(now - Duration::days(1)), now));
        assert!(deadline_open(Some(now + Duration::days(1)), now));
        assert!(deadline_open(Some(now), now));
        assert!(deadline_open(None, now));
    }

    #[test]
    fn missing_org_degrades_to_none() {
        let known = Uuid::new_v4();
        let missing = Uuid::new_v4();
        let rows = vec![sample_opportunity(known), sample_opportunity(missing)];

        let mut names = HashMap::new();
        names.insert(known, "Riverside Science Alliance".to_string());

        let resolved = attach_org_names(rows, &names);
        assert_eq!(
            resolved[0].org_name.as_deref(),
            Some("Riverside Science Alliance")
        );
        assert_eq!(resolved[1].org_name, None);
    }

    #[test]
    fn distinct_org_ids_deduplicates() {
        let org = Uuid::new_v4();
        let other = Uuid::new_v4();
        let rows = vec![
            sample_opportunity(org),
            sample_opportunity(org),
            sample_opportunity(other),
        ];
        let ids = distinct_org_ids(&rows);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&org));
        assert!(ids.contains(&other));
    }
}
