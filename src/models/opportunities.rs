use crate::discovery::{escape_like, OpportunityFilter, PageParams};
use crate::models::schema::opportunities;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum OpportunityError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
}

/// The seven fixed interest categories an opportunity is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    StemInnovation,
    ArtsDesign,
    CommunityService,
    BusinessEntrepreneurship,
    HealthMedicine,
    EnvironmentSustainability,
    LeadershipCivics,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::StemInnovation,
        Category::ArtsDesign,
        Category::CommunityService,
        Category::BusinessEntrepreneurship,
        Category::HealthMedicine,
        Category::EnvironmentSustainability,
        Category::LeadershipCivics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::StemInnovation => "stem_innovation",
            Category::ArtsDesign => "arts_design",
            Category::CommunityService => "community_service",
            Category::BusinessEntrepreneurship => "business_entrepreneurship",
            Category::HealthMedicine => "health_medicine",
            Category::EnvironmentSustainability => "environment_sustainability",
            Category::LeadershipCivics => "leadership_civics",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Category::ALL.iter().copied().find(|c| c.as_str() == s)
    }
}

/// The five fixed opportunity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityType {
    Internship,
    Program,
    Competition,
    Volunteering,
    Scholarship,
}

impl OpportunityType {
    pub const ALL: [OpportunityType; 5] = [
        OpportunityType::Internship,
        OpportunityType::Program,
        OpportunityType::Competition,
        OpportunityType::Volunteering,
        OpportunityType::Scholarship,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityType::Internship => "internship",
            OpportunityType::Program => "program",
            OpportunityType::Competition => "competition",
            OpportunityType::Volunteering => "volunteering",
            OpportunityType::Scholarship => "scholarship",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        OpportunityType::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Online,
    InPerson,
    Hybrid,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Online => "online",
            LocationType::InPerson => "in_person",
            LocationType::Hybrid => "hybrid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(LocationType::Online),
            "in_person" => Some(LocationType::InPerson),
            "hybrid" => Some(LocationType::Hybrid),
            _ => None,
        }
    }

    /// In-person and hybrid opportunities must carry an address.
    pub fn requires_address(&self) -> bool {
        !matches!(self, LocationType::Online)
    }
}

#[derive(Queryable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = opportunities)]
pub struct Opportunity {
    pub id: i32,
    pub uuid: Uuid,
    pub organization_id: Uuid,
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
    pub grade_levels: Vec<String>,
    pub cost: Option<f64>,
    pub has_stipend: bool,
    pub application_deadline: Option<DateTime<Utc>>,
    pub application_url: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Opportunity {
    pub fn get_by_uuid(
        conn: &mut PgConnection,
        lookup_uuid: Uuid,
    ) -> Result<Option<Opportunity>, OpportunityError> {
        opportunities::table
            .filter(opportunities::uuid.eq(lookup_uuid))
            .first::<Opportunity>(conn)
            .optional()
            .map_err(OpportunityError::DatabaseError)
    }

    pub fn get_all_for_organization(
        conn: &mut PgConnection,
        org_uuid: Uuid,
    ) -> Result<Vec<Opportunity>, OpportunityError> {
        opportunities::table
            .filter(opportunities::organization_id.eq(org_uuid))
            .order(opportunities::created_at.desc())
            .load::<Opportunity>(conn)
            .map_err(OpportunityError::DatabaseError)
    }

    /// The discovery query. Every active predicate is ANDed; absent
    /// predicates restrict nothing. The deadline clamp and the canonical
    /// deadline-ascending order live here so feed and explore cannot
    /// diverge.
    pub fn list(
        conn: &mut PgConnection,
        filter: &OpportunityFilter,
        page: PageParams,
    ) -> Result<Vec<Opportunity>, OpportunityError> {
        let now = Utc::now();
        let mut query = opportunities::table.into_boxed();

        query = query.filter(opportunities::is_active.eq(true));
        query = query.filter(
            opportunities::application_deadline
                .is_null()
                .or(opportunities::application_deadline.ge(now)),
        );

        if !filter.categories.is_empty() {
            query = query.filter(opportunities::category.eq_any(filter.categories.clone()));
        }
        if !filter.opportunity_types.is_empty() {
            query = query
                .filter(opportunities::opportunity_type.eq_any(filter.opportunity_types.clone()));
        }
        if let Some(ref search) = filter.search {
            let pattern = format!("%{}%", escape_like(search));
            query = query.filter(
                opportunities::name
                    .ilike(pattern.clone())
                    .or(opportunities::brief_description.ilike(pattern)),
            );
        }
        if let Some(ref location) = filter.location {
            let pattern = format!("%{}%", escape_like(location));
            query = query.filter(opportunities::location_address.ilike(pattern));
        }
        if filter.has_link {
            query = query
                .filter(opportunities::application_url.is_not_null())
                .filter(opportunities::application_url.ne(""));
        }
        if filter.has_phone {
            query = query
                .filter(opportunities::contact_phone.is_not_null())
                .filter(opportunities::contact_phone.ne(""));
        }

        query
            .order(opportunities::application_deadline.asc())
            .offset(page.offset())
            .limit(page.limit())
            .load::<Opportunity>(conn)
            .map_err(OpportunityError::DatabaseError)
    }

    pub fn update(&self, conn: &mut PgConnection) -> Result<(), OpportunityError> {
        diesel::update(opportunities::table)
            .filter(opportunities::id.eq(self.id))
            .set((
                opportunities::name.eq(&self.name),
                opportunities::brief_description.eq(&self.brief_description),
                opportunities::category.eq(&self.category),
                opportunities::opportunity_type.eq(&self.opportunity_type),
                opportunities::location_type.eq(&self.location_type),
                opportunities::location_address.eq(&self.location_address),
                opportunities::location_state.eq(&self.location_state),
                opportunities::min_age.eq(self.min_age),
                opportunities::max_age.eq(self.max_age),
                opportunities::min_gpa.eq(self.min_gpa),
                opportunities::grade_levels.eq(&self.grade_levels),
                opportunities::cost.eq(self.cost),
                opportunities::has_stipend.eq(self.has_stipend),
                opportunities::application_deadline.eq(self.application_deadline),
                opportunities::application_url.eq(&self.application_url),
                opportunities::contact_email.eq(&self.contact_email),
                opportunities::contact_phone.eq(&self.contact_phone),
                opportunities::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(OpportunityError::DatabaseError)
    }

    /// Soft delete. Rows are never removed, only hidden from discovery.
    pub fn deactivate(&self, conn: &mut PgConnection) -> Result<(), OpportunityError> {
        diesel::update(opportunities::table)
            .filter(opportunities::id.eq(self.id))
            .set((
                opportunities::is_active.eq(false),
                opportunities::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(OpportunityError::DatabaseError)
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = opportunities)]
pub struct NewOpportunity {
    pub organization_id: Uuid,
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
    pub grade_levels: Vec<String>,
    pub cost: Option<f64>,
    pub has_stipend: bool,
    pub application_deadline: Option<DateTime<Utc>>,
    pub application_url: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

impl NewOpportunity {
    pub fn insert(&self, conn: &mut PgConnection) -> Result<Opportunity, OpportunityError> {
        diesel::insert_into(opportunities::table)
            .values(self)
            .get_result::<Opportunity>(conn)
            .map_err(OpportunityError::DatabaseError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::parse(category.as_str()), Some(category));
        }
        assert!(Category::parse("sports").is_none());
    }

    #[test]
    fn opportunity_type_round_trip() {
        for ty in OpportunityType::ALL {
            assert_eq!(OpportunityType::parse(ty.as_str()), Some(ty));
        }
        assert!(OpportunityType::parse("job").is_none());
    }

    #[test]
    fn location_type_address_requirement() {
        assert!(!LocationType::Online.requires_address());
        assert!(LocationType::InPerson.requires_address());
        assert!(LocationType::Hybrid.requires_address());
    }
}
