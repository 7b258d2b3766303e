//! End-to-end lifecycle against the live mock server.
//!
//! Starts the mock on a random port and drives the real `UreqTransport`
//! through users, sections, runs, results and attachments, so request
//! building and response decoding are checked over actual HTTP.

use std::net::SocketAddr;

use testrail_core::{
    ApiResponse, AttachmentFile, Call, CreatedFilter, Error, ResultStatus, Run, Section,
    TestRailClient, TestResult,
};

fn start_mock() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

#[test]
fn run_lifecycle() {
    let addr = start_mock();
    let client = TestRailClient::new(&format!("http://{addr}"), "login", "token").with_project_id(1);

    // Users and statuses are seeded.
    let users = client.get_users().unwrap();
    assert_eq!(users.len(), 2);
    let jordan = client.get_user_by_email("jordan@example.com").unwrap();
    assert_eq!(jordan.id, 2);
    assert!(!jordan.is_active);

    let statuses = client.get_statuses().unwrap();
    assert_eq!(statuses.len(), 5);
    assert!(statuses.iter().any(|s| s.name == "failed" && s.is_final));

    // Sections.
    let mut section = Section::new("Checkout");
    section.suite_id = Some(3);
    let created = client.add_section(&section, None).unwrap();
    let section_id = created.id.unwrap();
    assert_eq!(created.name, "Checkout");
    assert_eq!(created.depth, Some(0));

    let renamed = client
        .update_section(section_id, "Checkout flow", Some("Cart to receipt"))
        .unwrap();
    assert_eq!(renamed.name, "Checkout flow");
    assert_eq!(renamed.description.as_deref(), Some("Cart to receipt"));

    let sections = client.get_sections(None, Some(3)).unwrap();
    assert_eq!(sections.len(), 1);
    assert!(client.get_sections(None, Some(4)).unwrap().is_empty());

    // Runs come back through the paginated envelope.
    let run = client.add_run(&Run::new("Nightly"), None).unwrap();
    let run_id = run.id.unwrap();
    assert_eq!(run.is_completed, Some(false));
    assert_eq!(run.include_all, Some(true));

    let runs = client.get_runs(None).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].name, "Nightly");

    // Results.
    let passed = client
        .add_result_for_case(run_id, 10, &TestResult::with_status(ResultStatus::Passed))
        .unwrap();
    let mut failure = TestResult::with_status(ResultStatus::Failed);
    failure.comment = Some("timeout on submit".to_string());
    let failed = client.add_result_for_case(run_id, 11, &failure).unwrap();
    assert_eq!(passed.status_id, Some(ResultStatus::Passed));
    assert_eq!(failed.test_id, Some(1011));

    let filter = CreatedFilter {
        status_ids: Some(vec![ResultStatus::Failed]),
        ..CreatedFilter::default()
    };
    let only_failed = client.get_results_for_run(run_id, Some(&filter)).unwrap();
    assert_eq!(only_failed.len(), 1);
    assert_eq!(only_failed[0].comment.as_deref(), Some("timeout on submit"));
    assert_eq!(client.get_results_for_run(run_id, None).unwrap().len(), 2);

    // Attachments go up as multipart and come back byte for byte.
    let content: Vec<u8> = vec![0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0xff, 0x00];
    let file = AttachmentFile::new("screenshot.png", content.clone());
    let attachment_id = client
        .add_attachment_to_result(failed.id.unwrap(), &file)
        .unwrap()
        .unwrap();

    let attachments = client.get_attachments_for_test(1011).unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].id, attachment_id);
    assert_eq!(attachments[0].filename.as_deref(), Some("screenshot.png"));
    assert_eq!(attachments[0].size, Some(content.len() as u64));
    assert_eq!(attachments[0].result_id, failed.id);

    match client.request(Call::get(format!("get_attachment/{attachment_id}"))).unwrap() {
        ApiResponse::Raw(raw) => assert_eq!(raw.body, content),
        other => panic!("expected raw file content, got {other:?}"),
    }

    // Close, then delete.
    let closed = client.close_run(run_id).unwrap();
    assert_eq!(closed.is_completed, Some(true));
    assert!(closed.completed_on.is_some());

    let err = client
        .add_result_for_case(run_id, 12, &TestResult::with_status(ResultStatus::Passed))
        .unwrap_err();
    assert!(matches!(err, Error::Api { status: 400, .. }), "got {err:?}");

    assert!(client.delete_run(run_id).unwrap());
    match client.get_run(run_id).unwrap_err() {
        Error::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Field :run_id is not a valid test run.");
        }
        other => panic!("expected Api error, got {other:?}"),
    }

    assert!(client.delete_section(section_id).unwrap());
    assert!(client.get_section(section_id).is_err());
}

#[test]
fn missing_project_id_never_reaches_the_server() {
    let addr = start_mock();
    let client = TestRailClient::new(&format!("http://{addr}"), "login", "token");

    let err = client.get_runs(None).unwrap_err();
    assert!(matches!(err, Error::MissingProjectId));
    assert!(err.is_configuration());

    // An explicit id works without a default.
    assert!(client.get_runs(Some(7)).unwrap().is_empty());
}

#[test]
fn unknown_user_is_an_api_error() {
    let addr = start_mock();
    let client = TestRailClient::new(&format!("http://{addr}"), "login", "token");

    let err = client.get_user(99).unwrap_err();
    assert!(matches!(err, Error::Api { status: 400, .. }), "got {err:?}");
}
