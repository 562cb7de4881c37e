pub mod email_verification;
pub mod opportunities;
pub mod organizations;
pub mod schema;
pub mod student_interests;
pub mod student_preferences;
pub mod students;
pub mod users;
