//! Typed endpoint methods, one per TestRail API call.
//!
//! Every method is a thin composition of the dispatcher: resolve ids, build
//! a `Call`, hydrate the response. Methods that need a project take an
//! optional explicit id and fall back to the client default. Without either
//! they fail with `MissingProjectId` before any request is made.
//!
//! Deletes return `true` once the call succeeds; TestRail's (empty) body is
//! discarded.

use serde_json::{json, Map, Value};

use crate::client::{ApiResponse, Call, TestRailClient};
use crate::error::{Error, Result};
use crate::filter::{self, CreatedFilter, QueryFilter, QueryParams, StatusFilter};
use crate::http::Transport;
use crate::model::{from_json_list, Model, ModelId};
use crate::types::{
    Attachment, AttachmentFile, CaseType, Configuration, GroupConfig, Priority, ResultFields, Run,
    Section, Status, Template, TestResult, User,
};

impl<T: Transport> TestRailClient<T> {
    // -----------------------------------------------------------------------
    // Attachments
    // -----------------------------------------------------------------------

    /// Upload a file to a result. Returns the new attachment id when the
    /// server reports one; an empty or non-JSON success body yields `None`.
    pub fn add_attachment_to_result(
        &self,
        result_id: ModelId,
        file: &AttachmentFile,
    ) -> Result<Option<ModelId>> {
        let call = Call::post(format!("add_attachment_to_result/{result_id}")).attachment(file.clone());
        match self.request(call)? {
            ApiResponse::Json(payload) => Ok(payload.get("attachment_id").and_then(Value::as_u64)),
            ApiResponse::Raw(_) => Ok(None),
        }
    }

    pub fn get_attachments_for_case(&self, case_id: ModelId) -> Result<Vec<Attachment>> {
        self.fetch_list(Call::get(format!("get_attachments_for_case/{case_id}")), "attachments")
    }

    pub fn get_attachments_for_test(&self, test_id: ModelId) -> Result<Vec<Attachment>> {
        self.fetch_list(Call::get(format!("get_attachments_for_test/{test_id}")), "attachments")
    }

    pub fn get_attachment(&self, attachment_id: ModelId) -> Result<Attachment> {
        self.fetch(Call::get(format!("get_attachment/{attachment_id}")))
    }

    pub fn delete_attachment(&self, attachment_id: ModelId) -> Result<bool> {
        self.delete(format!("delete_attachment/{attachment_id}"))
    }

    // -----------------------------------------------------------------------
    // Case types
    // -----------------------------------------------------------------------

    pub fn get_case_types(&self) -> Result<Vec<CaseType>> {
        self.fetch_list(Call::get("get_case_types"), "case_types")
    }

    // -----------------------------------------------------------------------
    // Configurations
    // -----------------------------------------------------------------------

    pub fn get_configs(&self, project_id: Option<ModelId>) -> Result<Vec<Configuration>> {
        let project_id = self.resolve_project_id(project_id)?;
        self.fetch_list(Call::get(format!("get_configs/{project_id}")), "configs")
    }

    pub fn add_config_group(&self, name: &str, project_id: Option<ModelId>) -> Result<Configuration> {
        let project_id = self.resolve_project_id(project_id)?;
        self.fetch(Call::post(format!("add_config_group/{project_id}")).json(json!({ "name": name })))
    }

    pub fn add_config(&self, name: &str, config_group_id: ModelId) -> Result<GroupConfig> {
        self.fetch(Call::post(format!("add_config/{config_group_id}")).json(json!({ "name": name })))
    }

    pub fn update_config_group(&self, name: &str, config_group_id: ModelId) -> Result<Configuration> {
        self.fetch(
            Call::post(format!("update_config_group/{config_group_id}")).json(json!({ "name": name })),
        )
    }

    pub fn update_config(&self, name: &str, config_id: ModelId) -> Result<GroupConfig> {
        self.fetch(Call::post(format!("update_config/{config_id}")).json(json!({ "name": name })))
    }

    pub fn delete_config_group(&self, config_group_id: ModelId) -> Result<bool> {
        self.delete(format!("delete_config_group/{config_group_id}"))
    }

    pub fn delete_config(&self, config_id: ModelId) -> Result<bool> {
        self.delete(format!("delete_config/{config_id}"))
    }

    // -----------------------------------------------------------------------
    // Priorities
    // -----------------------------------------------------------------------

    pub fn get_priorities(&self) -> Result<Vec<Priority>> {
        self.fetch_list(Call::get("get_priorities"), "priorities")
    }

    // -----------------------------------------------------------------------
    // Results
    // -----------------------------------------------------------------------

    pub fn get_results(
        &self,
        test_id: ModelId,
        filter: Option<&StatusFilter>,
    ) -> Result<Vec<TestResult>> {
        let call = Call::get(format!("get_results/{test_id}")).query(query_of(filter));
        self.fetch_list(call, "results")
    }

    pub fn get_results_for_case(
        &self,
        run_id: ModelId,
        case_id: ModelId,
        filter: Option<&StatusFilter>,
    ) -> Result<Vec<TestResult>> {
        let call =
            Call::get(format!("get_results_for_case/{run_id}/{case_id}")).query(query_of(filter));
        self.fetch_list(call, "results")
    }

    pub fn get_results_for_run(
        &self,
        run_id: ModelId,
        filter: Option<&CreatedFilter>,
    ) -> Result<Vec<TestResult>> {
        let call = Call::get(format!("get_results_for_run/{run_id}")).query(query_of(filter));
        self.fetch_list(call, "results")
    }

    pub fn add_result(&self, test_id: ModelId, result: &TestResult) -> Result<TestResult> {
        let body = result.to_json(false)?;
        self.fetch(Call::post(format!("add_result/{test_id}")).json(body))
    }

    pub fn add_result_for_case(
        &self,
        run_id: ModelId,
        case_id: ModelId,
        result: &TestResult,
    ) -> Result<TestResult> {
        let body = result.to_json(false)?;
        self.fetch(Call::post(format!("add_result_for_case/{run_id}/{case_id}")).json(body))
    }

    /// Bulk-add results keyed by test id (`test_id` must be set on each).
    pub fn add_results(&self, run_id: ModelId, results: &[TestResult]) -> Result<Vec<TestResult>> {
        let call = Call::post(format!("add_results/{run_id}")).json(bulk_body(results)?);
        self.fetch_list(call, "results")
    }

    /// Bulk-add results keyed by case id (`case_id` must be set on each).
    pub fn add_results_for_cases(
        &self,
        run_id: ModelId,
        results: &[TestResult],
    ) -> Result<Vec<TestResult>> {
        let call = Call::post(format!("add_results_for_cases/{run_id}")).json(bulk_body(results)?);
        self.fetch_list(call, "results")
    }

    // -----------------------------------------------------------------------
    // Result fields
    // -----------------------------------------------------------------------

    pub fn get_result_fields(&self) -> Result<Vec<ResultFields>> {
        self.fetch_list(Call::get("get_result_fields"), "result_fields")
    }

    // -----------------------------------------------------------------------
    // Runs
    // -----------------------------------------------------------------------

    pub fn get_run(&self, run_id: ModelId) -> Result<Run> {
        self.fetch(Call::get(format!("get_run/{run_id}")))
    }

    pub fn get_runs(&self, project_id: Option<ModelId>) -> Result<Vec<Run>> {
        let project_id = self.resolve_project_id(project_id)?;
        self.fetch_list(Call::get(format!("get_runs/{project_id}")), "runs")
    }

    pub fn add_run(&self, run: &Run, project_id: Option<ModelId>) -> Result<Run> {
        let project_id = self.resolve_project_id(project_id)?;
        let body = run.to_json(false)?;
        self.fetch(Call::post(format!("add_run/{project_id}")).json(body))
    }

    /// Send the fields set on `run`; absent fields stay unchanged remotely.
    pub fn update_run(&self, run: &Run) -> Result<Run> {
        let run_id = run.id.ok_or(Error::MissingEntityId { entity: Run::NAME })?;
        let body = run.to_json(false)?;
        self.fetch(Call::post(format!("update_run/{run_id}")).json(body))
    }

    pub fn close_run(&self, run_id: ModelId) -> Result<Run> {
        self.fetch(Call::post(format!("close_run/{run_id}")))
    }

    pub fn delete_run(&self, run_id: ModelId) -> Result<bool> {
        self.delete(format!("delete_run/{run_id}"))
    }

    // -----------------------------------------------------------------------
    // Sections
    // -----------------------------------------------------------------------

    pub fn get_section(&self, section_id: ModelId) -> Result<Section> {
        self.fetch(Call::get(format!("get_section/{section_id}")))
    }

    pub fn get_sections(
        &self,
        project_id: Option<ModelId>,
        suite_id: Option<ModelId>,
    ) -> Result<Vec<Section>> {
        let project_id = self.resolve_project_id(project_id)?;
        let mut query = QueryParams::new();
        filter::push(&mut query, "suite_id", suite_id);
        self.fetch_list(Call::get(format!("get_sections/{project_id}")).query(query), "sections")
    }

    pub fn add_section(&self, section: &Section, project_id: Option<ModelId>) -> Result<Section> {
        let project_id = self.resolve_project_id(project_id)?;
        let body = section.to_json(false)?;
        self.fetch(Call::post(format!("add_section/{project_id}")).json(body))
    }

    pub fn update_section(
        &self,
        section_id: ModelId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Section> {
        let mut body = Map::new();
        body.insert("name".to_string(), json!(name));
        if let Some(description) = description {
            body.insert("description".to_string(), json!(description));
        }
        self.fetch(Call::post(format!("update_section/{section_id}")).json(body))
    }

    pub fn delete_section(&self, section_id: ModelId) -> Result<bool> {
        self.delete(format!("delete_section/{section_id}"))
    }

    // -----------------------------------------------------------------------
    // Statuses and templates
    // -----------------------------------------------------------------------

    pub fn get_statuses(&self) -> Result<Vec<Status>> {
        self.fetch_list(Call::get("get_statuses"), "statuses")
    }

    pub fn get_templates(&self, project_id: Option<ModelId>) -> Result<Vec<Template>> {
        let project_id = self.resolve_project_id(project_id)?;
        self.fetch_list(Call::get(format!("get_templates/{project_id}")), "templates")
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    pub fn get_user(&self, user_id: ModelId) -> Result<User> {
        self.fetch(Call::get(format!("get_user/{user_id}")))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<User> {
        let query = vec![("email".to_string(), email.to_string())];
        self.fetch(Call::get("get_user_by_email").query(query))
    }

    pub fn get_users(&self) -> Result<Vec<User>> {
        self.fetch_list(Call::get("get_users"), "users")
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn fetch<M: Model>(&self, call: Call) -> Result<M> {
        M::from_json(self.request(call)?.into_json()?)
    }

    fn fetch_list<M: Model>(&self, call: Call, key: &str) -> Result<Vec<M>> {
        let payload = self.request(call)?.into_json()?;
        from_json_list(unwrap_page(payload, key)?)
    }

    fn delete(&self, path: String) -> Result<bool> {
        self.request(Call::post(path))?;
        Ok(true)
    }
}

fn query_of<F: QueryFilter>(filter: Option<&F>) -> QueryParams {
    filter.map(F::to_query).unwrap_or_default()
}

fn bulk_body(results: &[TestResult]) -> Result<Value> {
    let results = results
        .iter()
        .map(|result| result.to_json(false).map(Value::Object))
        .collect::<Result<Vec<_>>>()?;
    Ok(json!({ "results": results }))
}

/// Accept a bare array or TestRail's paginated envelope, which nests the
/// array under the resource name next to `offset`, `limit`, `size`, `_links`.
fn unwrap_page(payload: Value, key: &str) -> Result<Value> {
    match payload {
        items @ Value::Array(_) => Ok(items),
        Value::Object(mut map) => match map.remove(key) {
            Some(items @ Value::Array(_)) => Ok(items),
            _ => Err(Error::UnexpectedResponse {
                expected: "a JSON array or paginated list",
            }),
        },
        _ => Err(Error::UnexpectedResponse {
            expected: "a JSON array or paginated list",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwrap_page_passes_arrays_through() {
        assert_eq!(unwrap_page(json!([1, 2]), "runs").unwrap(), json!([1, 2]));
    }

    #[test]
    fn unwrap_page_extracts_envelope() {
        let page = json!({
            "offset": 0,
            "limit": 250,
            "size": 1,
            "_links": {"next": null, "prev": null},
            "runs": [{"id": 1}],
        });
        assert_eq!(unwrap_page(page, "runs").unwrap(), json!([{"id": 1}]));
    }

    #[test]
    fn unwrap_page_rejects_other_shapes() {
        assert!(unwrap_page(json!({"sections": []}), "runs").is_err());
        assert!(unwrap_page(json!("text"), "runs").is_err());
    }

    #[test]
    fn query_of_absent_filter_is_empty() {
        assert!(query_of::<StatusFilter>(None).is_empty());
    }

    #[test]
    fn bulk_body_omits_absent_fields() {
        let results = [
            TestResult {
                test_id: Some(1),
                ..TestResult::with_status(crate::types::ResultStatus::Passed)
            },
            TestResult {
                test_id: Some(2),
                comment: Some("flaky".to_string()),
                ..TestResult::default()
            },
        ];
        assert_eq!(
            bulk_body(&results).unwrap(),
            json!({"results": [
                {"test_id": 1, "status_id": 1},
                {"test_id": 2, "comment": "flaky"},
            ]})
        );
    }
}
