use crate::models::schema::student_opportunity_preferences;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StudentPreferenceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
}

/// One opportunity type a student wants to see in their feed. Saved
/// delete-then-insert like interests.
#[derive(Queryable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = student_opportunity_preferences)]
pub struct StudentPreference {
    pub id: i32,
    pub student_user_id: Uuid,
    pub preference_type: String,
    pub other_description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StudentPreference {
    pub fn get_all_for_student(
        conn: &mut PgConnection,
        lookup_user_id: Uuid,
    ) -> Result<Vec<StudentPreference>, StudentPreferenceError> {
        student_opportunity_preferences::table
            .filter(student_opportunity_preferences::student_user_id.eq(lookup_user_id))
            .load::<StudentPreference>(conn)
            .map_err(StudentPreferenceError::DatabaseError)
    }

    pub fn replace_for_student(
        conn: &mut PgConnection,
        user_id: Uuid,
        preferences: &[NewStudentPreference],
    ) -> Result<(), StudentPreferenceError> {
        conn.transaction(|conn| {
            diesel::delete(
                student_opportunity_preferences::table
                    .filter(student_opportunity_preferences::student_user_id.eq(user_id)),
            )
            .execute(conn)?;
            diesel::insert_into(student_opportunity_preferences::table)
                .values(preferences)
                .execute(conn)?;
            Ok(())
        })
        .map_err(StudentPreferenceError::DatabaseError)
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = student_opportunity_preferences)]
pub struct NewStudentPreference {
    pub student_user_id: Uuid,
    pub preference_type: String,
    pub other_description: Option<String>,
}
