//! Typed, blocking client for the TestRail v2 REST API.
//!
//! # Overview
//! Maps TestRail's loosely-typed JSON payloads onto typed entities and runs
//! every endpoint through one dispatcher. The dispatcher handles auth,
//! query parameters, JSON or multipart bodies and response decoding.
//!
//! # Design
//! - `TestRailClient` builds `HttpRequest` values and decodes `HttpResponse`
//!   values; the round-trip itself belongs to a `Transport` (`UreqTransport`
//!   by default, a recording mock in tests).
//! - Entities implement `Model`, the single place where JSON hydration and
//!   serialization rules live.
//! - Each public operation is one blocking round-trip. There are no retries,
//!   caching or internal concurrency.
//!
//! ```no_run
//! use testrail_core::{ResultStatus, TestRailClient, TestResult};
//!
//! let client = TestRailClient::new("https://example.testrail.io", "qa@example.com", "api-key")
//!     .with_project_id(1);
//! for run in client.get_runs(None)? {
//!     println!("{}", run.name);
//! }
//! client.add_result_for_case(12, 345, &TestResult::with_status(ResultStatus::Passed))?;
//! # Ok::<(), testrail_core::Error>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod model;
mod resources;
pub mod transport;
pub mod types;

pub use client::{ApiResponse, Call, TestRailClient};
pub use config::ClientConfig;
pub use error::{BoxError, Error, Result};
pub use filter::{join_ids, CreatedFilter, QueryFilter, QueryParams, StatusFilter};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use model::{Model, ModelId, Timestamp};
pub use transport::UreqTransport;
pub use types::{
    Attachment, AttachmentFile, CaseType, Configuration, FieldType, GroupConfig, Priority,
    ResultFieldConfig, ResultFieldContext, ResultFieldOptions, ResultFields, ResultStatus, Run,
    Section, Status, Template, TestResult, User,
};
