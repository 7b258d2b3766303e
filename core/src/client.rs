//! Uniform request dispatch for every TestRail endpoint.
//!
//! # Design
//! A request is split into three steps. `build_request` turns a `Call` into
//! an `HttpRequest` and does no I/O. The `Transport` performs the
//! round-trip. `decode_response` maps the `HttpResponse` to JSON or hands it
//! back raw. Resource methods (see `resources.rs`) compose these with the
//! project-id guard and model hydration.

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{api_base_url, ClientConfig};
use crate::error::{Error, Result};
use crate::filter::QueryParams;
use crate::http::{
    basic_auth, encode_multipart, multipart_content_type, HttpMethod, HttpRequest, HttpResponse,
    Transport, APPLICATION_JSON, AUTHORIZATION, CONTENT_TYPE,
};
use crate::model::ModelId;
use crate::transport::UreqTransport;
use crate::types::AttachmentFile;

/// Multipart field name TestRail expects uploads under.
pub const ATTACHMENT_FIELD: &str = "attachment";

/// One API call, before it is turned into an `HttpRequest`.
///
/// `path` is resource-relative with ids already interpolated, e.g.
/// `get_run/42`.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
    pub query: QueryParams,
    pub attachment: Option<AttachmentFile>,
}

impl Call {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path.into())
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path.into())
    }

    fn new(method: HttpMethod, path: String) -> Self {
        Self {
            method,
            path,
            body: None,
            query: QueryParams::new(),
            attachment: None,
        }
    }

    pub fn json(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn attachment(mut self, file: AttachmentFile) -> Self {
        self.attachment = Some(file);
        self
    }
}

/// Decoded outcome of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// The body parsed as JSON.
    Json(Value),
    /// The body was empty or not JSON (deletes, some uploads).
    Raw(HttpResponse),
}

impl ApiResponse {
    /// The JSON payload, or `UnexpectedResponse` for a raw response.
    pub fn into_json(self) -> Result<Value> {
        match self {
            ApiResponse::Json(value) => Ok(value),
            ApiResponse::Raw(_) => Err(Error::UnexpectedResponse {
                expected: "a JSON body",
            }),
        }
    }
}

/// Blocking client for the TestRail v2 API.
///
/// Credentials are fixed for the client's lifetime and sent with every
/// call. The default project id is the only mutable state; changing it needs
/// `&mut self`, so a client shared across threads cannot have it changed
/// underneath a call.
#[derive(Clone)]
pub struct TestRailClient<T = UreqTransport> {
    base_url: String,
    login: String,
    token: String,
    project_id: Option<ModelId>,
    transport: T,
}

impl TestRailClient<UreqTransport> {
    /// Client on the default ureq transport.
    pub fn new(url: &str, login: &str, token: &str) -> Self {
        Self::with_transport(url, login, token, UreqTransport::new())
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let mut client = Self::new(&config.url, &config.login, &config.token);
        client.project_id = config.project_id;
        client
    }
}

impl<T: Transport> TestRailClient<T> {
    pub fn with_transport(url: &str, login: &str, token: &str, transport: T) -> Self {
        Self {
            base_url: api_base_url(url),
            login: login.to_string(),
            token: token.to_string(),
            project_id: None,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn project_id(&self) -> Option<ModelId> {
        self.project_id
    }

    /// Set the project used when a call does not pass one explicitly.
    pub fn set_project_id(&mut self, project_id: ModelId) -> &mut Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn with_project_id(mut self, project_id: ModelId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Explicit id first, then the client default, else `MissingProjectId`.
    pub fn resolve_project_id(&self, project_id: Option<ModelId>) -> Result<ModelId> {
        project_id.or(self.project_id).ok_or(Error::MissingProjectId)
    }

    /// Build the `HttpRequest` for `call` without performing any I/O.
    pub fn build_request(&self, call: &Call) -> Result<HttpRequest> {
        let mut headers = vec![(
            AUTHORIZATION.to_string(),
            basic_auth(&self.login, &self.token),
        )];

        let body = match (&call.attachment, call.method) {
            (Some(file), _) => {
                let boundary = format!("testrail-{}", Uuid::new_v4().simple());
                headers.push((CONTENT_TYPE.to_string(), multipart_content_type(&boundary)));
                Some(encode_multipart(ATTACHMENT_FIELD, file, &boundary))
            }
            (None, HttpMethod::Post) => {
                let empty = Value::Object(Default::default());
                let json = call.body.as_ref().unwrap_or(&empty);
                headers.push((CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string()));
                Some(serde_json::to_vec(json).map_err(Error::Serialize)?)
            }
            (None, HttpMethod::Get) => None,
        };

        Ok(HttpRequest {
            method: call.method,
            url: format!("{}{}", self.base_url, call.path),
            query: call.query.clone(),
            headers,
            body,
        })
    }

    /// Map a response to JSON, falling back to the raw response when the
    /// body is empty or not JSON. Non-2xx statuses are errors.
    pub fn decode_response(response: HttpResponse) -> Result<ApiResponse> {
        if !response.is_success() {
            warn!(status = response.status, "TestRail returned an error status");
            return Err(Error::Api {
                status: response.status,
                message: error_message(&response.body),
            });
        }
        match serde_json::from_slice::<Value>(&response.body) {
            Ok(value) => Ok(ApiResponse::Json(value)),
            Err(_) => {
                debug!(
                    status = response.status,
                    len = response.body.len(),
                    "response is not JSON, returning it raw"
                );
                Ok(ApiResponse::Raw(response))
            }
        }
    }

    /// Build, send and decode one call.
    pub fn request(&self, call: Call) -> Result<ApiResponse> {
        let request = self.build_request(&call)?;
        debug!(
            method = call.method.as_str(),
            path = %call.path,
            params = call.query.len(),
            attachment = call.attachment.is_some(),
            "dispatching TestRail request"
        );
        let response = self.transport.execute(request).map_err(Error::Transport)?;
        Self::decode_response(response)
    }
}

impl<T> std::fmt::Debug for TestRailClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestRailClient")
            .field("base_url", &self.base_url)
            .field("login", &self.login)
            .field("token", &"<redacted>")
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

/// TestRail error bodies look like `{"error": "..."}`; anything else is
/// reported verbatim.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}
