//! In-memory stand-in for a subset of the TestRail v2 API.
//!
//! TestRail routes every call through `index.php?/api/v2/<verb>/<ids>`, with
//! filters appended as `&key=value`. The router therefore has a single route
//! and dispatches on the parsed query string.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, RawQuery, State},
    http::{header, HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};

const API_PREFIX: &str = "/api/v2/";
const ATTACHMENT_FIELD: &str = "attachment";
const NO_FILE: &str = "No file attached or upload size was exceeded.";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub id: u64,
    pub is_active: bool,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Status {
    pub color_bright: u32,
    pub color_dark: u32,
    pub color_medium: u32,
    pub id: u64,
    pub is_final: bool,
    pub is_system: bool,
    pub is_untested: bool,
    pub label: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Section {
    pub depth: u32,
    pub description: Option<String>,
    pub display_order: u32,
    pub id: u64,
    pub name: String,
    pub parent_id: Option<u64>,
    pub suite_id: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Run {
    pub id: u64,
    pub project_id: u64,
    pub suite_id: Option<u64>,
    pub name: String,
    pub description: Option<String>,
    pub include_all: bool,
    pub is_completed: bool,
    pub completed_on: Option<i64>,
    pub created_on: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestResult {
    pub id: u64,
    pub test_id: u64,
    pub status_id: Option<u32>,
    pub comment: Option<String>,
    pub version: Option<String>,
    pub elapsed: Option<String>,
    pub defects: Option<String>,
    pub created_by: u64,
    pub created_on: i64,
    pub attachment_ids: Vec<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Attachment {
    pub id: u64,
    pub name: String,
    pub filename: String,
    pub size: u64,
    pub created_on: i64,
    pub result_id: u64,
    pub user_id: u64,
}

#[derive(Deserialize)]
struct NewSection {
    name: String,
    description: Option<String>,
    parent_id: Option<u64>,
    suite_id: Option<u64>,
}

#[derive(Deserialize)]
struct UpdateSection {
    name: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct NewRun {
    name: String,
    description: Option<String>,
    suite_id: Option<u64>,
    #[serde(default = "default_true")]
    include_all: bool,
}

#[derive(Deserialize)]
struct NewResult {
    status_id: Option<u32>,
    comment: Option<String>,
    version: Option<String>,
    elapsed: Option<String>,
    defects: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Everything the mock remembers between calls.
#[derive(Debug, Default)]
pub struct Store {
    pub users: Vec<User>,
    pub statuses: Vec<Status>,
    /// Section id -> (project id, section).
    pub sections: BTreeMap<u64, (u64, Section)>,
    pub runs: BTreeMap<u64, Run>,
    /// Result id -> (run id, result).
    pub results: BTreeMap<u64, (u64, TestResult)>,
    /// Attachment id -> (test id, metadata, file content).
    pub attachments: BTreeMap<u64, (u64, Attachment, Bytes)>,
    next_id: u64,
}

impl Store {
    /// Two users and TestRail's five system statuses.
    pub fn seeded() -> Self {
        let users = vec![
            User {
                email: "alexis@example.com".to_string(),
                id: 1,
                is_active: true,
                name: "Alexis Gonzalez".to_string(),
            },
            User {
                email: "jordan@example.com".to_string(),
                id: 2,
                is_active: false,
                name: "Jordan Lee".to_string(),
            },
        ];
        let statuses = [
            (1, "passed", "Passed", true, false),
            (2, "blocked", "Blocked", true, false),
            (3, "untested", "Untested", false, true),
            (4, "retest", "Retest", false, false),
            (5, "failed", "Failed", true, false),
        ]
        .into_iter()
        .map(|(id, name, label, is_final, is_untested)| Status {
            color_bright: 12709313,
            color_dark: 6667107,
            color_medium: 9820525,
            id,
            is_final,
            is_system: true,
            is_untested,
            label: label.to_string(),
            name: name.to_string(),
        })
        .collect();
        Self {
            users,
            statuses,
            next_id: 1,
            ..Self::default()
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::seeded()));
    Router::new()
        .route("/index.php", get(dispatch).post(dispatch))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// A parsed `?/api/v2/<verb>/<ids>&<params>` query.
#[derive(Debug, PartialEq, Eq)]
pub struct ApiPath {
    pub verb: String,
    pub ids: Vec<u64>,
    pub params: Vec<(String, String)>,
}

impl ApiPath {
    pub fn parse(query: &str) -> Option<Self> {
        let (path, rest) = query.split_once('&').unwrap_or((query, ""));
        let mut segments = path.strip_prefix(API_PREFIX)?.split('/');
        let verb = segments.next().filter(|verb| !verb.is_empty())?.to_string();
        let ids = segments
            .map(|segment| segment.parse().ok())
            .collect::<Option<Vec<u64>>>()?;
        let params = url::form_urlencoded::parse(rest.as_bytes())
            .into_owned()
            .collect();
        Some(Self { verb, ids, params })
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

async fn dispatch(
    State(db): State<Db>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("Basic "));
    if !authorized {
        return error(
            StatusCode::UNAUTHORIZED,
            "Authentication failed: invalid or missing user/password or session cookie.",
        );
    }

    let Some(path) = query.as_deref().and_then(ApiPath::parse) else {
        return error(StatusCode::BAD_REQUEST, "Invalid API path");
    };
    tracing::debug!(verb = %path.verb, ids = ?path.ids, "mock TestRail request");

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let post = method == Method::POST;

    let mut store = db.write().await;
    match (post, path.verb.as_str(), path.ids.as_slice()) {
        (false, "get_users", []) => ok(&store.users),
        (false, "get_user", [id]) => match store.users.iter().find(|u| u.id == *id) {
            Some(user) => ok(user),
            None => error(StatusCode::BAD_REQUEST, "Field :user_id is not a valid user."),
        },
        (false, "get_user_by_email", []) => {
            let email = path.param("email").unwrap_or_default();
            match store.users.iter().find(|u| u.email == email) {
                Some(user) => ok(user),
                None => error(StatusCode::BAD_REQUEST, "Field :email is not a valid email address."),
            }
        }
        (false, "get_statuses", []) => ok(&store.statuses),

        (false, "get_sections", [project_id]) => {
            let suite_id = path.param("suite_id").and_then(|s| s.parse::<u64>().ok());
            let sections: Vec<&Section> = store
                .sections
                .values()
                .filter(|(project, s)| {
                    project == project_id && (suite_id.is_none() || s.suite_id == suite_id)
                })
                .map(|(_, s)| s)
                .collect();
            ok(sections)
        }
        (false, "get_section", [id]) => match store.sections.get(id) {
            Some((_, section)) => ok(section),
            None => invalid("section_id", "section"),
        },
        (true, "add_section", [project_id]) => {
            let input: NewSection = match parse_body(&body) {
                Ok(input) => input,
                Err(response) => return response,
            };
            let id = store.allocate_id();
            let depth = input
                .parent_id
                .and_then(|parent| store.sections.get(&parent))
                .map_or(0, |(_, parent)| parent.depth + 1);
            let section = Section {
                depth,
                description: input.description,
                display_order: store.sections.len() as u32 + 1,
                id,
                name: input.name,
                parent_id: input.parent_id,
                suite_id: input.suite_id,
            };
            store.sections.insert(id, (*project_id, section.clone()));
            ok(section)
        }
        (true, "update_section", [id]) => {
            let input: UpdateSection = match parse_body(&body) {
                Ok(input) => input,
                Err(response) => return response,
            };
            match store.sections.get_mut(id) {
                Some((_, section)) => {
                    if let Some(name) = input.name {
                        section.name = name;
                    }
                    if let Some(description) = input.description {
                        section.description = Some(description);
                    }
                    ok(&*section)
                }
                None => invalid("section_id", "section"),
            }
        }
        (true, "delete_section", [id]) => match store.sections.remove(id) {
            Some(_) => empty(),
            None => invalid("section_id", "section"),
        },

        (false, "get_runs", [project_id]) => {
            let runs: Vec<&Run> = store
                .runs
                .values()
                .filter(|run| run.project_id == *project_id)
                .collect();
            ok(json!({
                "offset": 0,
                "limit": 250,
                "size": runs.len(),
                "_links": {"next": null, "prev": null},
                "runs": runs,
            }))
        }
        (false, "get_run", [id]) => match store.runs.get(id) {
            Some(run) => ok(run),
            None => invalid("run_id", "test run"),
        },
        (true, "add_run", [project_id]) => {
            let input: NewRun = match parse_body(&body) {
                Ok(input) => input,
                Err(response) => return response,
            };
            let id = store.allocate_id();
            let run = Run {
                id,
                project_id: *project_id,
                suite_id: input.suite_id,
                name: input.name,
                description: input.description,
                include_all: input.include_all,
                is_completed: false,
                completed_on: None,
                created_on: now(),
            };
            store.runs.insert(id, run.clone());
            ok(run)
        }
        (true, "close_run", [id]) => match store.runs.get_mut(id) {
            Some(run) => {
                run.is_completed = true;
                run.completed_on = Some(now());
                ok(&*run)
            }
            None => invalid("run_id", "test run"),
        },
        (true, "delete_run", [id]) => match store.runs.remove(id) {
            Some(_) => {
                store.results.retain(|_, (run_id, _)| run_id != id);
                empty()
            }
            None => invalid("run_id", "test run"),
        },

        (true, "add_result_for_case", [run_id, case_id]) => {
            match store.runs.get(run_id) {
                None => return invalid("run_id", "test run"),
                Some(run) if run.is_completed => {
                    return error(StatusCode::BAD_REQUEST, "Field :run_id refers to a completed test run.")
                }
                Some(_) => {}
            }
            let input: NewResult = match parse_body(&body) {
                Ok(input) => input,
                Err(response) => return response,
            };
            let id = store.allocate_id();
            let result = TestResult {
                id,
                test_id: 1000 + case_id,
                status_id: input.status_id,
                comment: input.comment,
                version: input.version,
                elapsed: input.elapsed,
                defects: input.defects,
                created_by: 1,
                created_on: now(),
                attachment_ids: Vec::new(),
            };
            store.results.insert(id, (*run_id, result.clone()));
            ok(result)
        }
        (false, "get_results_for_run", [run_id]) => {
            if !store.runs.contains_key(run_id) {
                return invalid("run_id", "test run");
            }
            let statuses: Option<Vec<u32>> = path
                .param("status_id")
                .map(|ids| ids.split(',').filter_map(|id| id.parse().ok()).collect());
            let limit = path
                .param("limit")
                .and_then(|limit| limit.parse::<usize>().ok())
                .unwrap_or(usize::MAX);
            let results: Vec<&TestResult> = store
                .results
                .values()
                .filter(|(run, _)| run == run_id)
                .map(|(_, result)| result)
                .filter(|result| match (&statuses, result.status_id) {
                    (None, _) => true,
                    (Some(wanted), Some(status)) => wanted.contains(&status),
                    (Some(_), None) => false,
                })
                .take(limit)
                .collect();
            ok(results)
        }
        (true, "add_attachment_to_result", [result_id]) => {
            let Some(test_id) = store.results.get(result_id).map(|(_, r)| r.test_id) else {
                return invalid("result_id", "test result");
            };
            let (filename, content) = match read_upload(content_type, body).await {
                Ok(upload) => upload,
                Err(response) => return response,
            };
            let id = store.allocate_id();
            let attachment = Attachment {
                id,
                name: filename.clone(),
                filename,
                size: content.len() as u64,
                created_on: now(),
                result_id: *result_id,
                user_id: 1,
            };
            if let Some((_, result)) = store.results.get_mut(result_id) {
                result.attachment_ids.push(id);
            }
            store.attachments.insert(id, (test_id, attachment, content));
            ok(json!({ "attachment_id": id }))
        }
        (false, "get_attachments_for_test", [test_id]) => {
            let attachments: Vec<&Attachment> = store
                .attachments
                .values()
                .filter(|(test, _, _)| test == test_id)
                .map(|(_, attachment, _)| attachment)
                .collect();
            ok(attachments)
        }
        (false, "get_attachment", [id]) => match store.attachments.get(id) {
            Some((_, _, content)) => (
                [(header::CONTENT_TYPE, "application/octet-stream")],
                content.clone(),
            )
                .into_response(),
            None => invalid("attachment_id", "attachment"),
        },

        (_, verb, _) => error(StatusCode::BAD_REQUEST, &format!("Unknown method '{verb}'")),
    }
}

/// Pull the `attachment` file part out of a multipart body, returning its
/// filename and content.
async fn read_upload(content_type: &str, body: Bytes) -> Result<(String, Bytes), Response> {
    let bad_request = |message: String| error(StatusCode::BAD_REQUEST, &message);
    let request = Request::builder()
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .map_err(|e| bad_request(e.to_string()))?;
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|rejection| bad_request(rejection.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.body_text()))?
    {
        if field.name() != Some(ATTACHMENT_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            break;
        };
        let content = field.bytes().await.map_err(|e| bad_request(e.body_text()))?;
        return Ok((filename, content));
    }
    Err(error(StatusCode::BAD_REQUEST, NO_FILE))
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, Response> {
    serde_json::from_slice(body)
        .map_err(|e| error(StatusCode::BAD_REQUEST, &format!("Invalid request body: {e}")))
}

fn ok<T: Serialize>(value: T) -> Response {
    Json(value).into_response()
}

fn empty() -> Response {
    StatusCode::OK.into_response()
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn invalid(field: &str, what: &str) -> Response {
    error(
        StatusCode::BAD_REQUEST,
        &format!("Field :{field} is not a valid {what}."),
    )
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verb_and_ids() {
        let path = ApiPath::parse("/api/v2/add_result_for_case/3/40").unwrap();
        assert_eq!(path.verb, "add_result_for_case");
        assert_eq!(path.ids, [3, 40]);
        assert!(path.params.is_empty());
    }

    #[test]
    fn parses_trailing_params() {
        let path = ApiPath::parse("/api/v2/get_results_for_run/2&status_id=1%2C5&limit=3").unwrap();
        assert_eq!(path.verb, "get_results_for_run");
        assert_eq!(path.param("status_id"), Some("1,5"));
        assert_eq!(path.param("limit"), Some("3"));
    }

    #[test]
    fn rejects_foreign_paths() {
        assert!(ApiPath::parse("/api/v1/get_users").is_none());
        assert!(ApiPath::parse("/api/v2/").is_none());
        assert!(ApiPath::parse("/api/v2/get_run/abc").is_none());
    }

    #[test]
    fn seeded_store_has_system_statuses() {
        let store = Store::seeded();
        let names: Vec<&str> = store.statuses.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["passed", "blocked", "untested", "retest", "failed"]);
        assert_eq!(store.users.len(), 2);
    }

    #[test]
    fn section_serializes_nulls() {
        let section = Section {
            depth: 0,
            description: None,
            display_order: 1,
            id: 1,
            name: "Prerequisites".to_string(),
            parent_id: None,
            suite_id: Some(1),
        };
        let json = serde_json::to_value(&section).unwrap();
        assert!(json["description"].is_null());
        assert_eq!(json["suite_id"], 1);
    }

    #[test]
    fn new_run_defaults_include_all() {
        let input: NewRun = serde_json::from_str(r#"{"name":"Nightly"}"#).unwrap();
        assert!(input.include_all);
        assert!(input.suite_id.is_none());
    }

    #[test]
    fn new_section_requires_name() {
        let result: Result<NewSection, _> = serde_json::from_str(r#"{"suite_id":1}"#);
        assert!(result.is_err());
    }
}
