// --- File: crates/connect_stripe/src/lib.rs ---

pub mod client;
pub mod countries;
pub mod doc;
pub mod error;
pub mod fields;
pub mod forms;
pub mod guards;
pub mod handlers;
pub mod index;
pub mod logic;
pub mod models;
pub mod pages;
pub mod routes;
pub mod session;
pub mod view;
pub mod webhook;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod handlers_test;

// Re-export for main backend
pub use client::{ConnectApi, StripeConnectClient};
pub use countries::{CountryTable, CountryTableError};
pub use error::{ConnectError, StripeError};
pub use handlers::ConnectState;
pub use index::{ConnectIndex, MemoryIndex};
pub use routes::routes;
