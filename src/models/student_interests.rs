use crate::models::schema::student_interests;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StudentInterestError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
}

/// One saved category interest for a student. A save replaces the full set
/// (delete-then-insert), so a student never holds duplicate categories.
#[derive(Queryable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = student_interests)]
pub struct StudentInterest {
    pub id: i32,
    pub student_user_id: Uuid,
    pub category: String,
    pub is_priority: bool,
    pub created_at: DateTime<Utc>,
}

impl StudentInterest {
    pub fn get_all_for_student(
        conn: &mut PgConnection,
        lookup_user_id: Uuid,
    ) -> Result<Vec<StudentInterest>, StudentInterestError> {
        student_interests::table
            .filter(student_interests::student_user_id.eq(lookup_user_id))
            .load::<StudentInterest>(conn)
            .map_err(StudentInterestError::DatabaseError)
    }

    /// Replaces the student's saved interests atomically.
    pub fn replace_for_student(
        conn: &mut PgConnection,
        user_id: Uuid,
        interests: &[NewStudentInterest],
    ) -> Result<(), StudentInterestError> {
        conn.transaction(|conn| {
            diesel::delete(
                student_interests::table.filter(student_interests::student_user_id.eq(user_id)),
            )
            .execute(conn)?;
            diesel::insert_into(student_interests::table)
                .values(interests)
                .execute(conn)?;
            Ok(())
        })
        .map_err(StudentInterestError::DatabaseError)
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = student_interests)]
pub struct NewStudentInterest {
    pub student_user_id: Uuid,
    pub category: String,
    pub is_priority: bool,
}
