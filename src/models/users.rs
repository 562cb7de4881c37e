use crate::models::schema::users;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum UserError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Organization,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Organization => "organization",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(UserRole::Student),
            "organization" => Some(UserRole::Organization),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl From<String> for UserRole {
    fn from(s: String) -> Self {
        // Default to the least privileged role
        UserRole::parse(&s.to_lowercase()).unwrap_or(UserRole::Student)
    }
}

#[derive(Queryable, Serialize, Deserialize, Clone, PartialEq)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = users)]
pub struct User {
    id: i32,
    pub uuid: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn get_by_uuid(
        conn: &mut PgConnection,
        lookup_uuid: Uuid,
    ) -> Result<Option<User>, UserError> {
        users::table
            .filter(users::uuid.eq(lookup_uuid))
            .first::<User>(conn)
            .optional()
            .map_err(UserError::DatabaseError)
    }

    pub fn get_by_email(
        conn: &mut PgConnection,
        lookup_email: &str,
    ) -> Result<Option<User>, UserError> {
        users::table
            .filter(users::email.eq(lookup_email.to_lowercase()))
            .first::<User>(conn)
            .optional()
            .map_err(UserError::DatabaseError)
    }

    pub fn get_id(&self) -> Uuid {
        self.uuid
    }

    pub fn role(&self) -> UserRole {
        self.role.clone().into()
    }
}

// Here we've implemented `Debug` manually to avoid accidentally logging the
// password hash.
impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("uuid", &self.uuid)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("password", &"[redacted]")
            .finish()
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub role: String,
}

impl NewUser {
    pub fn new(email: String, password_hash: Option<String>, role: UserRole) -> Self {
        NewUser {
            email: email.to_lowercase(),
            name: None,
            password_hash,
            role: role.as_str().to_string(),
        }
    }

    pub fn with_name_option(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn insert(&self, conn: &mut PgConnection) -> Result<User, UserError> {
        diesel::insert_into(users::table)
            .values(self)
            .get_result::<User>(conn)
            .map_err(UserError::DatabaseError)
    }
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("password_hash", &"[redacted]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trip() {
        for role in [UserRole::Student, UserRole::Organization, UserRole::Admin] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn unknown_role_defaults_to_student() {
        assert_eq!(UserRole::from("superuser".to_string()), UserRole::Student);
        assert!(UserRole::parse("superuser").is_none());
    }
}
