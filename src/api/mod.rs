mod error;
mod routes;
mod ws;

pub use error::ApiError;
pub use routes::{app_router, AppState};
