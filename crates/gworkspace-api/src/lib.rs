//! Clients for Google Workspace APIs.
//!
//! The crate is split into three layers:
//!
//! - [`auth`] - the [`CredentialStore`] seam and the OAuth implementation
//!   that hands out bearer tokens per scope
//! - [`transport`] - the [`Transport`] seam, the reqwest-backed
//!   [`HttpTransport`] and pagination draining
//! - one client per API, each holding only an `Arc<dyn Transport>`
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐ ┌─────────────┐ ┌─────────────┐ ┌──────────┐
//! │ CalendarClient │ │ SheetsClient│ │ DriveClient │ │   ...    │
//! └───────┬────────┘ └──────┬──────┘ └──────┬──────┘ └────┬─────┘
//!         └─────────────────┴───────┬───────┴─────────────┘
//!                                   ▼
//!                         ┌──────────────────┐
//!                         │ dyn Transport    │ ◄── FakeTransport in tests
//!                         └────────┬─────────┘
//!                                  ▼
//!                         ┌──────────────────┐
//!                         │ HttpTransport    │
//!                         └────────┬─────────┘
//!                                  ▼ valid_token(scope)
//!                         ┌──────────────────────┐
//!                         │ dyn CredentialStore  │
//!                         └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gworkspace_api::{AuthConfig, CalendarClient, HttpTransport, OAuthCredentialStore};
//!
//! let store = Arc::new(OAuthCredentialStore::new(config)?);
//! let transport = Arc::new(HttpTransport::new(store)?);
//! let calendar = CalendarClient::new(transport).with_time_zone_name("Europe/Paris")?;
//! let calendars = calendar.list_calendars().await?;
//! ```

pub mod auth;
pub mod books;
pub mod calendar;
pub mod contacts;
pub mod docs;
pub mod drive;
pub mod error;
pub mod sheets;
pub mod tasks;
pub mod transport;

// Re-export main types at crate root
pub use auth::{AuthConfig, CredentialStore, OAuthCredentialStore, OAuthCredentials, StaticToken};
pub use books::{BooksClient, SearchOptions, VolumeSearch};
pub use calendar::{Calendar, CalendarClient, Event, ExpansionErrorPolicy};
pub use contacts::{ContactGroup, ContactsClient, NewContact, Person};
pub use docs::{DocsClient, Document};
pub use drive::{DriveClient, DriveFiles, FileQuery, FileWithId, PermissionRole, PermissionType};
pub use error::{ApiError, ApiErrorCode, ApiResult};
pub use sheets::{Sheet, SheetsClient, Spreadsheet, ValueInputOption};
pub use tasks::{Task, TaskList, TasksClient};
pub use transport::{BoxFuture, HttpTransport, Page, Request, Service, Transport, drain_pages};
