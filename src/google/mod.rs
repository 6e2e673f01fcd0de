//! Google Sheets access with a service account.
//!
//! ## Flow
//!
//! ```text
//! service account JSON ──► signed JWT (RS256) ──► oauth2 token endpoint
//!                                                        │
//!                                   access token (cached until expiry)
//!                                                        ▼
//!                                         Sheets v4 `values` endpoints
//! ```

mod credentials;
mod sheets;
mod token;

pub use credentials::{CredentialSource, ServiceAccountKey};
pub use sheets::{GoogleSheetsClient, SheetsApi};
pub use token::{TokenProvider, SHEETS_SCOPE};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("service account credentials unavailable: {0}")]
    Credentials(String),

    #[error("oauth token exchange failed: {0}")]
    Token(String),

    #[error("sheets request failed: {0}")]
    Network(String),

    #[error("sheets API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected sheets response: {0}")]
    Parse(String),
}
