use crate::models::schema::students;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StudentError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
}

/// A student profile. The `user_id` is the owning auth identity; profiles are
/// created during onboarding and never deleted.
#[derive(Queryable, Identifiable, AsChangeset, Serialize, Deserialize, Clone, Debug)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = students)]
pub struct Student {
    pub id: i32,
    pub user_id: Uuid,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub school: String,
    pub grade_level: String,
    pub gpa: Option<f64>,
    pub age_verified: bool,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn get_by_user_id(
        conn: &mut PgConnection,
        lookup_user_id: Uuid,
    ) -> Result<Option<Student>, StudentError> {
        students::table
            .filter(students::user_id.eq(lookup_user_id))
            .first::<Student>(conn)
            .optional()
            .map_err(StudentError::DatabaseError)
    }

    pub fn update(&self, conn: &mut PgConnection) -> Result<(), StudentError> {
        diesel::update(students::table)
            .filter(students::id.eq(self.id))
            .set((
                students::name.eq(&self.name),
                students::date_of_birth.eq(self.date_of_birth),
                students::school.eq(&self.school),
                students::grade_level.eq(&self.grade_level),
                students::gpa.eq(self.gpa),
                students::age_verified.eq(self.age_verified),
                students::onboarding_completed.eq(self.onboarding_completed),
                students::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(StudentError::DatabaseError)
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = students)]
pub struct NewStudent {
    pub user_id: Uuid,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub school: String,
    pub grade_level: String,
    pub gpa: Option<f64>,
    pub age_verified: bool,
    pub onboarding_completed: bool,
}

impl NewStudent {
    pub fn insert(&self, conn: &mut PgConnection) -> Result<Student, StudentError> {
        diesel::insert_into(students::table)
            .values(self)
            .get_result::<Student>(conn)
            .map_err(StudentError::DatabaseError)
    }
}
