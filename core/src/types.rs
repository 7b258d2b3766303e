//! TestRail entities.
//!
//! # Design
//! Fields the API always returns are plain values; fields it may omit are
//! `Option`. Foreign keys stay opaque `ModelId`s. Nested entities (group
//! configs, result-field configs) are owned by their parent and serialize in
//! order. Enumerated codes convert to and from their integer through serde
//! `from`/`into`, so the mapping lives in one place per enum.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Model, ModelId, Timestamp};

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Status of a test result. TestRail reserves ids 1-5; custom statuses
/// start at 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum ResultStatus {
    Passed,
    Blocked,
    Untested,
    Retest,
    Failed,
    Custom(u32),
}

impl From<u32> for ResultStatus {
    fn from(id: u32) -> Self {
        match id {
            1 => ResultStatus::Passed,
            2 => ResultStatus::Blocked,
            3 => ResultStatus::Untested,
            4 => ResultStatus::Retest,
            5 => ResultStatus::Failed,
            other => ResultStatus::Custom(other),
        }
    }
}

impl From<ResultStatus> for u32 {
    fn from(status: ResultStatus) -> Self {
        match status {
            ResultStatus::Passed => 1,
            ResultStatus::Blocked => 2,
            ResultStatus::Untested => 3,
            ResultStatus::Retest => 4,
            ResultStatus::Failed => 5,
            ResultStatus::Custom(id) => id,
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u32::from(*self))
    }
}

/// Type of a custom result field (`type_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum FieldType {
    String,
    Integer,
    Text,
    Url,
    Checkbox,
    Dropdown,
    User,
    Date,
    Milestone,
    Steps,
    StepResults,
    MultiSelect,
    Other(u32),
}

impl From<u32> for FieldType {
    fn from(id: u32) -> Self {
        match id {
            1 => FieldType::String,
            2 => FieldType::Integer,
            3 => FieldType::Text,
            4 => FieldType::Url,
            5 => FieldType::Checkbox,
            6 => FieldType::Dropdown,
            7 => FieldType::User,
            8 => FieldType::Date,
            9 => FieldType::Milestone,
            10 => FieldType::Steps,
            11 => FieldType::StepResults,
            12 => FieldType::MultiSelect,
            other => FieldType::Other(other),
        }
    }
}

impl From<FieldType> for u32 {
    fn from(field_type: FieldType) -> Self {
        match field_type {
            FieldType::String => 1,
            FieldType::Integer => 2,
            FieldType::Text => 3,
            FieldType::Url => 4,
            FieldType::Checkbox => 5,
            FieldType::Dropdown => 6,
            FieldType::User => 7,
            FieldType::Date => 8,
            FieldType::Milestone => 9,
            FieldType::Steps => 10,
            FieldType::StepResults => 11,
            FieldType::MultiSelect => 12,
            FieldType::Other(id) => id,
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub id: ModelId,
    pub is_active: bool,
    pub name: String,
}

impl Model for User {
    const NAME: &'static str = "User";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub color_bright: u32,
    pub color_dark: u32,
    pub color_medium: u32,
    pub id: ModelId,
    pub is_final: bool,
    pub is_system: bool,
    pub is_untested: bool,
    pub label: String,
    pub name: String,
}

impl Model for Status {
    const NAME: &'static str = "Status";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: ModelId,
    pub is_default: bool,
    pub name: String,
}

impl Model for Template {
    const NAME: &'static str = "Template";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseType {
    pub id: ModelId,
    pub is_default: bool,
    pub name: String,
}

impl Model for CaseType {
    const NAME: &'static str = "CaseType";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priority {
    pub id: ModelId,
    pub is_default: bool,
    pub name: String,
    pub priority: u32,
    pub short_name: String,
}

impl Model for Priority {
    const NAME: &'static str = "Priority";
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// A section groups test cases inside a suite. Only `name` is needed to
/// create one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub depth: Option<u32>,
    pub description: Option<String>,
    pub display_order: Option<u32>,
    pub id: Option<ModelId>,
    pub parent_id: Option<ModelId>,
    pub suite_id: Option<ModelId>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Model for Section {
    const NAME: &'static str = "Section";
}

// ---------------------------------------------------------------------------
// Configurations
// ---------------------------------------------------------------------------

/// A single configuration inside a group, e.g. "Chrome" in "Browsers".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub group_id: ModelId,
    pub id: ModelId,
    pub name: String,
}

impl Model for GroupConfig {
    const NAME: &'static str = "GroupConfig";
}

/// A configuration group and its configurations, in server order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub configs: Vec<GroupConfig>,
    pub id: ModelId,
    pub name: String,
    pub project_id: ModelId,
}

impl Model for Configuration {
    const NAME: &'static str = "Configuration";
}

// ---------------------------------------------------------------------------
// Result fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFieldContext {
    pub is_global: bool,
    pub project_ids: Option<Vec<ModelId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFieldOptions {
    pub format: Option<String>,
    pub has_actual: Option<bool>,
    pub has_expected: Option<bool>,
    pub is_required: bool,
}

/// Options of a result field for one context (global or a set of projects).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFieldConfig {
    pub context: ResultFieldContext,
    pub id: ModelId,
    pub options: ResultFieldOptions,
}

/// Descriptor of a custom result field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFields {
    pub configs: Vec<ResultFieldConfig>,
    pub description: Option<String>,
    pub display_order: u32,
    pub id: ModelId,
    pub label: String,
    pub name: String,
    pub system_name: String,
    pub type_id: FieldType,
}

impl Model for ResultFields {
    const NAME: &'static str = "ResultFields";
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A test result. Every field is optional because callers build one from
/// scratch for `add_result*`; the server fills in the rest.
///
/// Keys TestRail sends that are not declared here (custom `custom_*` result
/// fields) are kept in `custom_fields` and sent back on create.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: Option<ModelId>,
    pub test_id: Option<ModelId>,
    pub case_id: Option<ModelId>,
    pub status_id: Option<ResultStatus>,
    pub comment: Option<String>,
    pub version: Option<String>,
    pub elapsed: Option<String>,
    pub defects: Option<String>,
    pub assignedto_id: Option<ModelId>,
    pub created_by: Option<ModelId>,
    pub created_on: Option<Timestamp>,
    pub attachment_ids: Option<Vec<ModelId>>,
    #[serde(flatten)]
    pub custom_fields: BTreeMap<String, Value>,
}

impl TestResult {
    pub fn with_status(status: ResultStatus) -> Self {
        Self {
            status_id: Some(status),
            ..Self::default()
        }
    }
}

impl Model for TestResult {
    const NAME: &'static str = "Result";

    fn custom_keys(&self) -> Vec<&str> {
        self.custom_fields.keys().map(String::as_str).collect()
    }
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

/// A test run. Undeclared keys (custom status counters, custom fields) land
/// in `custom_fields`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub name: String,
    pub id: Option<ModelId>,
    pub suite_id: Option<ModelId>,
    pub description: Option<String>,
    pub milestone_id: Option<ModelId>,
    pub assignedto_id: Option<ModelId>,
    pub include_all: Option<bool>,
    pub case_ids: Option<Vec<ModelId>>,
    pub config_ids: Option<Vec<ModelId>>,
    pub config: Option<String>,
    pub is_completed: Option<bool>,
    pub completed_on: Option<Timestamp>,
    pub created_on: Option<Timestamp>,
    pub created_by: Option<ModelId>,
    pub project_id: Option<ModelId>,
    pub plan_id: Option<ModelId>,
    pub passed_count: Option<u32>,
    pub blocked_count: Option<u32>,
    pub untested_count: Option<u32>,
    pub retest_count: Option<u32>,
    pub failed_count: Option<u32>,
    pub url: Option<String>,
    #[serde(flatten)]
    pub custom_fields: BTreeMap<String, Value>,
}

impl Run {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Model for Run {
    const NAME: &'static str = "Run";

    fn custom_keys(&self) -> Vec<&str> {
        self.custom_fields.keys().map(String::as_str).collect()
    }
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: ModelId,
    pub name: String,
    pub filename: Option<String>,
    pub size: Option<u64>,
    pub created_on: Option<Timestamp>,
    pub project_id: Option<ModelId>,
    pub case_id: Option<ModelId>,
    pub result_id: Option<ModelId>,
    pub user_id: Option<ModelId>,
}

impl Model for Attachment {
    const NAME: &'static str = "Attachment";
}

/// File to upload with `add_attachment_to_result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl AttachmentFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}
