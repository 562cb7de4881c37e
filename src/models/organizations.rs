use crate::models::schema::organizations;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum OrganizationError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
}

/// The single authoritative approval state for an organization. The posting
/// permission is derived from this field alone; there is no separate
/// `approved` boolean to drift out of sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    EmailVerified,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::EmailVerified => "email_verified",
            VerificationStatus::Approved => "approved",
            VerificationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(VerificationStatus::Pending),
            "email_verified" => Some(VerificationStatus::EmailVerified),
            "approved" => Some(VerificationStatus::Approved),
            "rejected" => Some(VerificationStatus::Rejected),
            _ => None,
        }
    }
}

impl From<String> for VerificationStatus {
    fn from(s: String) -> Self {
        VerificationStatus::parse(&s.to_lowercase()).unwrap_or(VerificationStatus::Pending)
    }
}

#[derive(Queryable, Identifiable, AsChangeset, Serialize, Deserialize, Clone, Debug)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = organizations)]
pub struct Organization {
    pub id: i32,
    pub uuid: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub org_type: String,
    pub business_id: Option<String>,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub website: Option<String>,
    pub verification_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    pub fn get_by_uuid(
        conn: &mut PgConnection,
        lookup_uuid: Uuid,
    ) -> Result<Option<Organization>, OrganizationError> {
        organizations::table
            .filter(organizations::uuid.eq(lookup_uuid))
            .first::<Organization>(conn)
            .optional()
            .map_err(OrganizationError::DatabaseError)
    }

    pub fn get_by_user_id(
        conn: &mut PgConnection,
        lookup_user_id: Uuid,
    ) -> Result<Option<Organization>, OrganizationError> {
        organizations::table
            .filter(organizations::user_id.eq(lookup_user_id))
            .first::<Organization>(conn)
            .optional()
            .map_err(OrganizationError::DatabaseError)
    }

    pub fn get_all_by_status(
        conn: &mut PgConnection,
        status: VerificationStatus,
    ) -> Result<Vec<Organization>, OrganizationError> {
        organizations::table
            .filter(organizations::verification_status.eq(status.as_str()))
            .order(organizations::created_at.asc())
            .load::<Organization>(conn)
            .map_err(OrganizationError::DatabaseError)
    }

    /// Batch lookup used by the discovery surface to resolve display names
    /// for a page of opportunities in a single query.
    pub fn get_names_by_uuids(
        conn: &mut PgConnection,
        uuids: &[Uuid],
    ) -> Result<Vec<(Uuid, String)>, OrganizationError> {
        organizations::table
            .filter(organizations::uuid.eq_any(uuids))
            .select((organizations::uuid, organizations::name))
            .load::<(Uuid, String)>(conn)
            .map_err(OrganizationError::DatabaseError)
    }

    pub fn status(&self) -> VerificationStatus {
        self.verification_status.clone().into()
    }

    pub fn is_approved(&self) -> bool {
        self.status() == VerificationStatus::Approved
    }

    pub fn set_status(
        &mut self,
        conn: &mut PgConnection,
        status: VerificationStatus,
    ) -> Result<(), OrganizationError> {
        self.verification_status = status.as_str().to_string();
        diesel::update(organizations::table)
            .filter(organizations::id.eq(self.id))
            .set((
                organizations::verification_status.eq(&self.verification_status),
                organizations::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(OrganizationError::DatabaseError)
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = organizations)]
pub struct NewOrganization {
    pub user_id: Uuid,
    pub name: String,
    pub org_type: String,
    pub business_id: Option<String>,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub website: Option<String>,
    pub verification_status: String,
}

impl NewOrganization {
    pub fn insert(&self, conn: &mut PgConnection) -> Result<Organization, OrganizationError> {
        diesel::insert_into(organizations::table)
            .values(self)
            .get_result::<Organization>(conn)
            .map_err(OrganizationError::DatabaseError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for status in [
            VerificationStatus::Pending,
            VerificationStatus::EmailVerified,
            VerificationStatus::Approved,
            VerificationStatus::Rejected,
        ] {
            assert_eq!(VerificationStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn unknown_status_falls_back_to_pending() {
        assert_eq!(
            VerificationStatus::from("verified".to_string()),
            VerificationStatus::Pending
        );
    }
}
