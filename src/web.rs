mod discovery_routes;
mod health_routes;
mod login_routes;
mod opportunity_routes;
mod org_routes;
mod student_routes;

pub use discovery_routes::router as discovery_routes;
pub use health_routes::router as health_routes;
pub use login_routes::router as login_routes;
pub use opportunity_routes::router as opportunity_routes;
pub use org_routes::router as org_routes;
pub use student_routes::router as student_routes;
