//! REST API over the persistence manager and the ranking board

pub mod handler;
pub mod server;

pub use handler::ApiError;
pub use server::{router, AppState, HttpServer};
