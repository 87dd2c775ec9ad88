// --- File: crates/connect_common/src/lib.rs ---

pub mod error; // Error handling
pub mod http; // HTTP utilities
pub mod logging; // Logging utilities
pub mod pagination; // offset/limit/all paging

// Re-export error types and utilities for easier access
pub use error::{
    config_error, external_service_error, internal_error, validation_error, DashboardError,
    HttpStatusCode,
};

// Re-export HTTP utilities for easier access
pub use http::{client::HTTP_CLIENT, error_response};

pub use pagination::{page_links, paginate, PageLink, PaginationQuery};
