//! Google Sheets audit-trail client.
//!
//! Authenticates with a service-account key (RS256 JWT exchanged for a
//! short-lived OAuth2 access token) and talks to the Sheets v4 values API:
//! appending audit rows to the log worksheet and reading the product list
//! from the products worksheet.

pub mod auth;
pub mod client;

pub use auth::{AuthError, ServiceAccountKey, TokenSource};
pub use client::{SheetsClient, SheetsError};
