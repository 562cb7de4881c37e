use crate::discovery::{OpportunityFilter, PageParams};
use crate::models::email_verification::{
    EmailVerification, EmailVerificationError, NewEmailVerification,
};
use crate::models::opportunities::{NewOpportunity, Opportunity, OpportunityError};
use crate::models::organizations::{
    NewOrganization, Organization, OrganizationError, VerificationStatus,
};
use crate::models::student_interests::{
    NewStudentInterest, StudentInterest, StudentInterestError,
};
use crate::models::student_preferences::{
    NewStudentPreference, StudentPreference, StudentPreferenceError,
};
use crate::models::students::{NewStudent, Student, StudentError};
use crate::models::users::{NewUser, User, UserError};
use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, Pool},
};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum DBError {
    #[error("Database connection error")]
    ConnectionError,
    #[error("User error: {0}")]
    UserError(#[from] UserError),
    #[error("User not found")]
    UserNotFound,
    #[error("Student error: {0}")]
    StudentError(#[from] StudentError),
    #[error("Student profile not found")]
    StudentNotFound,
    #[error("Student interest error: {0}")]
    StudentInterestError(#[from] StudentInterestError),
    #[error("Student preference error: {0}")]
    StudentPreferenceError(#[from] StudentPreferenceError),
    #[error("Organization error: {0}")]
    OrganizationError(#[from] OrganizationError),
    #[error("Organization not found")]
    OrganizationNotFound,
    #[error("Opportunity error: {0}")]
    OpportunityError(#[from] OpportunityError),
    #[error("Opportunity not found")]
    OpportunityNotFound,
    #[error("Email verification error: {0}")]
    EmailVerificationError(#[from] EmailVerificationError),
    #[error("Email verification not found")]
    EmailVerificationNotFound,
}

pub trait DBConnection {
    // User methods
    fn create_user(&self, new_user: NewUser) -> Result<User, DBError>;
    fn get_user_by_uuid(&self, uuid: Uuid) -> Result<User, DBError>;
    fn get_user_by_email(&self, email: &str) -> Result<User, DBError>;

    // Student methods
    fn create_student(&self, new_student: NewStudent) -> Result<Student, DBError>;
    fn get_student_by_user_id(&self, user_id: Uuid) -> Result<Student, DBError>;
    fn update_student(&self, student: &Student) -> Result<(), DBError>;

    // Interest / preference methods
    fn get_student_interests(&self, user_id: Uuid) -> Result<Vec<StudentInterest>, DBError>;
    fn replace_student_interests(
        &self,
        user_id: Uuid,
        interests: &[NewStudentInterest],
    ) -> Result<(), DBError>;
    fn get_student_preferences(&self, user_id: Uuid)
        -> Result<Vec<StudentPreference>, DBError>;
    fn replace_student_preferences(
        &self,
        user_id: Uuid,
        preferences: &[NewStudentPreference],
    ) -> Result<(), DBError>;

    // Organization methods
    fn create_organization(&self, new_org: NewOrganization) -> Result<Organization, DBError>;
    fn get_organization_by_uuid(&self, uuid: Uuid) -> Result<Organization, DBError>;
    fn get_organization_by_user_id(&self, user_id: Uuid) -> Result<Organization, DBError>;
    fn get_organizations_by_status(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<Organization>, DBError>;
    fn get_organization_names(&self, uuids: &[Uuid]) -> Result<Vec<(Uuid, String)>, DBError>;
    fn set_organization_status(
        &self,
        org: &mut Organization,
        status: VerificationStatus,
    ) -> Result<(), DBError>;

    // Opportunity methods
    fn create_opportunity(&self, new_opportunity: NewOpportunity)
        -> Result<Opportunity, DBError>;
    fn get_opportunity_by_uuid(&self, uuid: Uuid) -> Result<Opportunity, DBError>;
    fn get_opportunities_for_organization(
        &self,
        org_uuid: Uuid,
    ) -> Result<Vec<Opportunity>, DBError>;
    fn list_opportunities(
        &self,
        filter: &OpportunityFilter,
        page: PageParams,
    ) -> Result<Vec<Opportunity>, DBError>;
    fn update_opportunity(&self, opportunity: &Opportunity) -> Result<(), DBError>;
    fn deactivate_opportunity(&self, opportunity: &Opportunity) -> Result<(), DBError>;

    // Email verification methods
    fn create_email_verification(
        &self,
        new_verification: NewEmailVerification,
    ) -> Result<EmailVerification, DBError>;
    fn get_email_verification_by_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<EmailVerification, DBError>;
    fn get_email_verification_by_code(&self, code: Uuid) -> Result<EmailVerification, DBError>;
    fn verify_email(&self, verification: &mut EmailVerification) -> Result<(), DBError>;
}

pub(crate) struct PostgresConnection {
    db: Pool<ConnectionManager<PgConnection>>,
}

impl DBConnection for PostgresConnection {
    fn create_user(&self, new_user: NewUser) -> Result<User, DBError> {
        debug!("Creating new user");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = new_user.insert(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to create user: {:?}", e);
        }
        result
    }

    fn get_user_by_uuid(&self, uuid: Uuid) -> Result<User, DBError> {
        debug!("Getting user by UUID");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        User::get_by_uuid(conn, uuid)?.ok_or(DBError::UserNotFound)
    }

    fn get_user_by_email(&self, email: &str) -> Result<User, DBError> {
        debug!("Getting user by email");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        User::get_by_email(conn, email)?.ok_or(DBError::UserNotFound)
    }

    fn create_student(&self, new_student: NewStudent) -> Result<Student, DBError> {
        debug!("Creating student profile");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = new_student.insert(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to create student profile: {:?}", e);
        }
        result
    }

    fn get_student_by_user_id(&self, user_id: Uuid) -> Result<Student, DBError> {
        debug!("Getting student by user ID");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        Student::get_by_user_id(conn, user_id)?.ok_or(DBError::StudentNotFound)
    }

    fn update_student(&self, student: &Student) -> Result<(), DBError> {
        debug!("Updating student profile");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = student.update(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update student profile: {:?}", e);
        }
        result
    }

    fn get_student_interests(&self, user_id: Uuid) -> Result<Vec<StudentInterest>, DBError> {
        debug!("Getting student interests");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        StudentInterest::get_all_for_student(conn, user_id).map_err(DBError::from)
    }

    fn replace_student_interests(
        &self,
        user_id: Uuid,
        interests: &[NewStudentInterest],
    ) -> Result<(), DBError> {
        debug!("Replacing student interests");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result =
            StudentInterest::replace_for_student(conn, user_id, interests).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to replace student interests: {:?}", e);
        }
        result
    }

    fn get_student_preferences(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<StudentPreference>, DBError> {
        debug!("Getting student opportunity preferences");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        StudentPreference::get_all_for_student(conn, user_id).map_err(DBError::from)
    }

    fn replace_student_preferences(
        &self,
        user_id: Uuid,
        preferences: &[NewStudentPreference],
    ) -> Result<(), DBError> {
        debug!("Replacing student opportunity preferences");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = StudentPreference::replace_for_student(conn, user_id, preferences)
            .map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to replace student preferences: {:?}", e);
        }
        result
    }

    fn create_organization(&self, new_org: NewOrganization) -> Result<Organization, DBError> {
        debug!("Creating organization");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = new_org.insert(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to create organization: {:?}", e);
        }
        result
    }

    fn get_organization_by_uuid(&self, uuid: Uuid) -> Result<Organization, DBError> {
        debug!("Getting organization by UUID");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        Organization::get_by_uuid(conn, uuid)?.ok_or(DBError::OrganizationNotFound)
    }

    fn get_organization_by_user_id(&self, user_id: Uuid) -> Result<Organization, DBError> {
        debug!("Getting organization by user ID");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        Organization::get_by_user_id(conn, user_id)?.ok_or(DBError::OrganizationNotFound)
    }

    fn get_organizations_by_status(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<Organization>, DBError> {
        debug!("Listing organizations by status");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        Organization::get_all_by_status(conn, status).map_err(DBError::from)
    }

    fn get_organization_names(&self, uuids: &[Uuid]) -> Result<Vec<(Uuid, String)>, DBError> {
        debug!("Batch resolving organization names");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        Organization::get_names_by_uuids(conn, uuids).map_err(DBError::from)
    }

    fn set_organization_status(
        &self,
        org: &mut Organization,
        status: VerificationStatus,
    ) -> Result<(), DBError> {
        debug!("Setting organization status to {}", status.as_str());
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = org.set_status(conn, status).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to set organization status: {:?}", e);
        }
        result
    }

    fn create_opportunity(
        &self,
        new_opportunity: NewOpportunity,
    ) -> Result<Opportunity, DBError> {
        debug!("Creating opportunity");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = new_opportunity.insert(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to create opportunity: {:?}", e);
        }
        result
    }

    fn get_opportunity_by_uuid(&self, uuid: Uuid) -> Result<Opportunity, DBError> {
        debug!("Getting opportunity by UUID");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        Opportunity::get_by_uuid(conn, uuid)?.ok_or(DBError::OpportunityNotFound)
    }

    fn get_opportunities_for_organization(
        &self,
        org_uuid: Uuid,
    ) -> Result<Vec<Opportunity>, DBError> {
        debug!("Listing opportunities for organization");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        Opportunity::get_all_for_organization(conn, org_uuid).map_err(DBError::from)
    }

    fn list_opportunities(
        &self,
        filter: &OpportunityFilter,
        page: PageParams,
    ) -> Result<Vec<Opportunity>, DBError> {
        debug!("Running discovery query, page {}", page.page);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = Opportunity::list(conn, filter, page).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Discovery query failed: {:?}", e);
        }
        result
    }

    fn update_opportunity(&self, opportunity: &Opportunity) -> Result<(), DBError> {
        debug!("Updating opportunity");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = opportunity.update(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update opportunity: {:?}", e);
        }
        result
    }

    fn deactivate_opportunity(&self, opportunity: &Opportunity) -> Result<(), DBError> {
        debug!("Deactivating opportunity");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = opportunity.deactivate(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to deactivate opportunity: {:?}", e);
        }
        result
    }

    fn create_email_verification(
        &self,
        new_verification: NewEmailVerification,
    ) -> Result<EmailVerification, DBError> {
        debug!("Creating email verification");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = new_verification.insert(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to create email verification: {:?}", e);
        }
        result
    }

    fn get_email_verification_by_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<EmailVerification, DBError> {
        debug!("Getting email verification by user ID");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        EmailVerification::get_by_user_id(conn, user_id)?
            .ok_or(DBError::EmailVerificationNotFound)
    }

    fn get_email_verification_by_code(&self, code: Uuid) -> Result<EmailVerification, DBError> {
        debug!("Getting email verification by code");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        EmailVerification::get_by_verification_code(conn, code)?
            .ok_or(DBError::EmailVerificationNotFound)
    }

    fn verify_email(&self, verification: &mut EmailVerification) -> Result<(), DBError> {
        debug!("Verifying email");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = verification.verify(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to verify email: {:?}", e);
        }
        result
    }
}

pub(crate) fn setup_db(url: String) -> Arc<dyn DBConnection + Send + Sync> {
    info!("Connecting to database...");
    let manager = ConnectionManager::<PgConnection>::new(url);
    let pool = Pool::builder()
        .max_size(10)
        .test_on_check_out(true)
        .build(manager)
        .expect("Unable to build DB connection pool");
    info!("Connected to database");
    Arc::new(PostgresConnection { db: pool })
}
