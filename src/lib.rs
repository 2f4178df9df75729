//! Client library for the PICH storefront's sheet-backed API.
//!
//! The remote "database" is a spreadsheet behind an Apps Script
//! endpoint: reads return positional rows, inserts are form posts, and
//! nothing is enforced server-side. This crate pins down the one piece
//! of contractual behavior in that arrangement — the session and
//! authentication flow — plus the catalog/cart read paths the
//! storefront screens render.
//!
//! - [`session::SessionManager`] owns the session lifecycle
//!   (restore/authenticate/register/logout) with serialized mutations.
//! - [`session::store::SessionStore`] persists at most one session
//!   record across restarts, failing open on corrupt state.
//! - [`remote::SheetClient`] is the HTTP adapter for the users sheet;
//!   [`remote::RecordStore`] is the seam tests fake it through.
//! - [`catalog::CatalogClient`] reads products and cart lines.

pub mod catalog;
pub mod config;
pub mod error;
pub mod record;
pub mod remote;
pub mod session;

pub use config::ClientConfig;
pub use error::ClientError;
pub use record::{RecordId, UserRecord};
pub use remote::{RecordStore, SheetClient};
pub use session::{SessionManager, SessionState};
