pub mod energy;
pub mod error;
pub mod pages;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use routes::{create_router, AppState};
