//! Connection settings for a TestRail instance.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::ModelId;

pub const ENV_URL: &str = "TESTRAIL_URL";
pub const ENV_LOGIN: &str = "TESTRAIL_LOGIN";
pub const ENV_TOKEN: &str = "TESTRAIL_TOKEN";
pub const ENV_PROJECT_ID: &str = "TESTRAIL_PROJECT_ID";

/// Server root, credentials and an optional default project.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub url: String,
    pub login: String,
    pub token: String,
    #[serde(default)]
    pub project_id: Option<ModelId>,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, login: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            login: login.into(),
            token: token.into(),
            project_id: None,
        }
    }

    /// Read `TESTRAIL_URL`, `TESTRAIL_LOGIN`, `TESTRAIL_TOKEN` and the
    /// optional `TESTRAIL_PROJECT_ID` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required =
            |key: &str| lookup(key).ok_or_else(|| Error::Config(format!("{key} is not set")));
        let project_id = match lookup(ENV_PROJECT_ID) {
            Some(raw) => Some(raw.trim().parse::<ModelId>().map_err(|e| {
                Error::Config(format!("{ENV_PROJECT_ID} must be an integer: {e}"))
            })?),
            None => None,
        };
        Ok(Self {
            url: required(ENV_URL)?,
            login: required(ENV_LOGIN)?,
            token: required(ENV_TOKEN)?,
            project_id,
        })
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("login", &self.login)
            .field("token", &"<redacted>")
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// Normalize a server root into TestRail's API base: trailing `/` plus the
/// fixed `index.php?/api/v2/` prefix.
pub fn api_base_url(root: &str) -> String {
    let mut base = root.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    base.push_str("index.php?/api/v2/");
    base
}
