//! Agent loop integration tests
//!
//! Drives the orchestrator against a scripted model and a recording backend.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_test::{assert_err, assert_ok};

use common::{agent_with, start_json, step_json, MockBackend, MockModel};
use waypoint::core::{Extraction, Step, StepHistory, Tool, WaypointError};
use waypoint::llm::GenerateOptions;
use waypoint::tools::ToolExecutor;

const GOAL: &str = "go to browserbase.com and tell me what it is about";

#[tokio::test]
async fn test_start_navigates_to_selected_url() {
    let model = Arc::new(MockModel::new(vec![Ok(start_json("https://www.browserbase.com"))]));
    let backend = Arc::new(MockBackend::default());
    let agent = agent_with(model.clone(), backend.clone());

    let step = assert_ok!(agent.start("go to browserbase.com", "s1").await);

    assert_eq!(step.tool, Tool::Goto);
    assert!(step.instruction.contains("browserbase.com"));
    assert_eq!(step.text, format!("Navigating to {}", step.instruction));
    assert_eq!(backend.calls(), vec!["navigate https://www.browserbase.com"]);
    assert_eq!(model.requests()[0].schema_name, "starting_url");
}

#[tokio::test]
async fn test_options_reach_every_model_call() {
    let model = Arc::new(MockModel::new(vec![
        Ok(start_json("https://www.browserbase.com")),
        Ok(step_json("Done", "", "CLOSE", "")),
    ]));
    let backend = Arc::new(MockBackend::default());
    let agent = agent_with(model.clone(), backend).with_options(GenerateOptions {
        temperature: Some(0.2),
        ..Default::default()
    });

    assert_ok!(agent.run(GOAL, "s1", |_, _| {}).await);

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].schema_name, "starting_url");
    assert_eq!(requests[1].schema_name, "step");
    for request in &requests {
        assert_eq!(request.options.temperature, Some(0.2));
    }
}

#[tokio::test]
async fn test_run_to_close() {
    let model = Arc::new(MockModel::new(vec![
        Ok(start_json("https://www.browserbase.com")),
        Ok(step_json(
            "Read the headline",
            "The landing page states what the product is",
            "EXTRACT",
            "the main headline of the page",
        )),
        Ok(step_json("Done", "The headline answers the goal", "CLOSE", "")),
    ]));
    let backend = Arc::new(MockBackend::default());
    let agent = agent_with(model.clone(), backend.clone());

    let announced = std::sync::Mutex::new(Vec::new());
    let outcome = assert_ok!(
        agent
            .run(GOAL, "s1", |n, step| announced.lock().unwrap().push((n, step.tool)))
            .await
    );

    let tools: Vec<Tool> = outcome.history.iter().map(|s| s.tool).collect();
    assert_eq!(tools, vec![Tool::Goto, Tool::Extract, Tool::Close]);
    assert_eq!(
        announced.into_inner().unwrap(),
        vec![(1, Tool::Goto), (2, Tool::Extract), (3, Tool::Close)]
    );
    assert_eq!(
        outcome.last_extraction,
        Some(Extraction::Text(backend.extract_text.clone()))
    );
    assert_eq!(backend.close_count(), 1);
    assert!(agent.executor().is_closed("s1"));
}

#[tokio::test]
async fn test_extraction_reaches_next_round_only() {
    let model = Arc::new(MockModel::new(vec![
        Ok(start_json("https://www.browserbase.com")),
        Ok(step_json("Read headline", "", "EXTRACT", "the headline")),
        Ok(step_json("Wait", "Let the page settle", "WAIT", "10")),
        Ok(step_json("Done", "", "CLOSE", "")),
    ]));
    let backend = Arc::new(MockBackend::default());
    let agent = agent_with(model.clone(), backend.clone());

    let outcome = assert_ok!(agent.run(GOAL, "s1", |_, _| {}).await);

    let carried = format!("The result of the previous extraction is: {}.", backend.extract_text);
    assert!(!model.request_text(1).contains("The result of the previous"));
    assert!(model.request_text(2).contains(&carried));
    // WAIT produced nothing, so the round after it starts clean
    assert!(!model.request_text(3).contains("The result of the previous"));
    assert!(outcome.last_extraction.is_none());
}

#[tokio::test]
async fn test_observation_rendered_into_next_round() {
    let model = Arc::new(MockModel::new(vec![
        Ok(start_json("https://www.browserbase.com")),
        Ok(step_json("Find cookie banner", "", "OBSERVE", "find the accept cookies button")),
        Ok(step_json("Done", "", "CLOSE", "")),
    ]));
    let backend = Arc::new(MockBackend::default());
    let agent = agent_with(model.clone(), backend.clone());

    assert_ok!(agent.run(GOAL, "s1", |_, _| {}).await);

    let text = model.request_text(2);
    assert!(text.contains("The result of the previous observation is:"));
    assert!(text.contains("Accept cookies button"));
    assert!(text.contains("xpath=/html/body/div[2]/button[1]"));
}

#[tokio::test]
async fn test_step_limit_fails_and_closes_once() {
    let model = Arc::new(MockModel::new(vec![
        Ok(start_json("https://www.browserbase.com")),
        Ok(step_json("Wait", "", "WAIT", "10")),
        Ok(step_json("Wait again", "", "WAIT", "10")),
        Ok(step_json("Wait forever", "", "WAIT", "10")),
    ]));
    let backend = Arc::new(MockBackend::default());
    let agent = agent_with(model.clone(), backend.clone()).with_max_steps(Some(2));

    let err = assert_err!(agent.run(GOAL, "s1", |_, _| {}).await);

    assert!(matches!(err, WaypointError::StepLimitExceeded(2)));
    // Starting URL plus two planning rounds
    assert_eq!(model.requests().len(), 3);
    assert_eq!(backend.close_count(), 1);
}

#[tokio::test]
async fn test_schema_error_fails_and_closes() {
    let model = Arc::new(MockModel::new(vec![
        Ok(start_json("https://www.browserbase.com")),
        Ok(serde_json::json!({ "text": "Click", "tool": "CLICK" })),
    ]));
    let backend = Arc::new(MockBackend::default());
    let agent = agent_with(model, backend.clone());

    let err = assert_err!(agent.run(GOAL, "s1", |_, _| {}).await);

    assert!(matches!(err, WaypointError::SchemaValidation(_)));
    assert_eq!(backend.close_count(), 1);
    assert!(agent.executor().is_closed("s1"));
}

#[tokio::test]
async fn test_tool_failure_closes_exactly_once() {
    let model = Arc::new(MockModel::new(vec![
        Ok(start_json("https://www.browserbase.com")),
        Ok(step_json("Accept cookies", "", "ACT", "click the accept cookies button")),
    ]));
    let backend = Arc::new(MockBackend {
        fail_act: true,
        ..Default::default()
    });
    let agent = agent_with(model, backend.clone());

    let err = assert_err!(agent.run(GOAL, "s1", |_, _| {}).await);

    assert!(err.is_execution());
    assert!(err.to_string().contains("click the accept cookies button"));
    assert_eq!(backend.close_count(), 1);
}

#[tokio::test]
async fn test_model_outage_fails_and_closes() {
    let model = Arc::new(MockModel::new(vec![
        Ok(start_json("https://www.browserbase.com")),
        Err(WaypointError::model("connection refused")),
    ]));
    let backend = Arc::new(MockBackend::default());
    let agent = agent_with(model, backend.clone());

    let err = assert_err!(agent.run(GOAL, "s1", |_, _| {}).await);

    assert!(matches!(err, WaypointError::ModelUnavailable(_)));
    assert_eq!(backend.close_count(), 1);
}

#[tokio::test]
async fn test_screenshot_only_after_navigation() {
    let model = Arc::new(MockModel::new(vec![
        Ok(step_json("Open site", "", "GOTO", "https://www.browserbase.com")),
        Ok(step_json("Read headline", "", "EXTRACT", "the headline")),
    ]));
    let backend = Arc::new(MockBackend::default());
    let agent = agent_with(model.clone(), backend.clone());

    let empty = StepHistory::new();
    assert_ok!(agent.next_step(GOAL, "s1", &empty, None).await);
    assert!(!model.request_has_image(0));
    assert_eq!(backend.count("screenshot"), 0);

    let navigated = StepHistory::from(vec![Step::goto("https://www.browserbase.com", "")]);
    assert_ok!(agent.next_step(GOAL, "s1", &navigated, None).await);
    assert!(model.request_has_image(1));
    assert_eq!(backend.count("screenshot"), 1);
}

#[tokio::test]
async fn test_prompt_includes_url_and_transcript() {
    let model = Arc::new(MockModel::new(vec![Ok(step_json("Done", "", "CLOSE", ""))]));
    let backend = Arc::new(MockBackend::default());
    let agent = agent_with(model.clone(), backend);

    let history = StepHistory::from(vec![Step::goto("https://www.browserbase.com", "named in goal")]);
    assert_ok!(agent.next_step(GOAL, "s1", &history, None).await);

    let text = model.request_text(0);
    assert!(text.contains("(URL: https://www.browserbase.com/)"));
    assert!(text.contains(&format!("with the goal being \"{}\"", GOAL)));
    assert!(text.contains("Step 1:\n- Action: Navigating to https://www.browserbase.com"));
    assert!(text.contains("- Tool Used: GOTO"));
}

#[tokio::test]
async fn test_cookie_consent_does_not_end_goal() {
    let model = Arc::new(MockModel::new(vec![Ok(step_json(
        "Search for the product page",
        "Cookies are accepted but the goal still needs the product description",
        "ACT",
        "click the Product link in the navigation bar",
    ))]));
    let backend = Arc::new(MockBackend::default());
    let agent = agent_with(model.clone(), backend.clone());

    let history = StepHistory::from(vec![
        Step::goto("https://www.browserbase.com", ""),
        Step::new(
            "Accept cookies",
            "A consent banner covers the page",
            Tool::Act,
            "click the Accept all cookies button",
        ),
    ]);

    let step = assert_ok!(agent.next_step(GOAL, "s1", &history, None).await);

    assert_ne!(step.tool, Tool::Close);
    assert!(!step.is_terminal());
    assert!(model.request_text(0).contains("- Instruction: click the Accept all cookies button"));
    assert_eq!(backend.close_count(), 0);
}

#[tokio::test]
async fn test_next_step_on_closed_session() {
    let model = Arc::new(MockModel::new(Vec::new()));
    let backend = Arc::new(MockBackend::default());
    let agent = agent_with(model.clone(), backend);

    assert_ok!(agent.close("s1").await);
    let err = assert_err!(agent.next_step(GOAL, "s1", &StepHistory::new(), None).await);

    assert!(matches!(err, WaypointError::SessionLifecycle { .. }));
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn test_close_is_at_most_once() {
    let backend = Arc::new(MockBackend::default());
    let agent = agent_with(Arc::new(MockModel::default()), backend.clone());

    assert_ok!(agent.close("s1").await);
    let err = assert_err!(agent.close("s1").await);

    assert!(matches!(err, WaypointError::SessionLifecycle { .. }));
    assert_eq!(backend.close_count(), 1);
}

#[tokio::test]
async fn test_wait_suspends_without_payload() {
    let backend = Arc::new(MockBackend::default());
    let executor = ToolExecutor::new(backend.clone(), Duration::from_secs(2));
    let step = Step::new("Wait for results", "", Tool::Wait, "500");

    let started = Instant::now();
    let output = assert_ok!(executor.execute_step("s1", &step).await);
    let elapsed = started.elapsed();

    assert!(output.is_none());
    assert!(elapsed >= Duration::from_millis(500));
    assert!(elapsed < Duration::from_millis(1500));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_extract_returns_page_text_unmodified() {
    let backend = Arc::new(MockBackend {
        extract_text: "  Price: $19.99\n".to_string(),
        ..Default::default()
    });
    let executor = ToolExecutor::new(backend.clone(), Duration::from_secs(2));
    let step = Step::new("Read the price", "", Tool::Extract, "the price of the item");

    let output = assert_ok!(executor.execute_step("s1", &step).await);

    assert_eq!(output, Some(Extraction::Text("  Price: $19.99\n".to_string())));
    assert_eq!(backend.calls(), vec!["extract the price of the item"]);
}

#[tokio::test]
async fn test_navigation_deadline_closes_session() {
    let backend = Arc::new(MockBackend {
        navigation_delay: Duration::from_millis(500),
        ..Default::default()
    });
    let executor = ToolExecutor::new(backend.clone(), Duration::from_millis(50));

    let err = assert_err!(
        executor
            .execute_step("s1", &Step::goto("https://slow.example.com", ""))
            .await
    );

    assert!(err.is_execution());
    assert!(err.to_string().contains("50ms"));
    assert_eq!(backend.close_count(), 1);
    assert!(executor.is_closed("s1"));
}
