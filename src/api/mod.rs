//! HTTP surface: router assembly and role-scoped endpoints.

pub mod admin;
pub mod routes;
pub mod users;

pub use routes::build_router;
