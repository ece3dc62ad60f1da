//! Audit trail tests: the API and the launch pipeline write events that
//! can be read back through `/api/v1/audit`.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use tokio::time::sleep;

use common::TestFixture;

/// Let the audit writer drain its channel.
async fn flush_audit() {
    sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn test_campaign_creation_is_audited() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_campaign("Spring", Some(3)).await;
    flush_audit().await;

    let response = fixture
        .get("/api/v1/audit?event_type=campaign_created")
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["total"], 1);

    let event = &response.body["events"][0];
    assert_eq!(event["campaign_id"], id.as_str());
    assert_eq!(event["user_id"], "anonymous");
    assert_eq!(event["data"]["type"], "campaign_created");
    assert_eq!(event["data"]["name"], "Spring");
    assert_eq!(event["data"]["queue_order"], 3);
    assert_eq!(event["data"]["platforms"][0], "meta");
    assert_eq!(event["data"]["platforms"][1], "tiktok");
}

#[tokio::test]
async fn test_launch_writes_stage_events() {
    let fixture = TestFixture::new().await;
    fixture.tracking_link_ready().await;
    let id = fixture.create_campaign("Spring", None).await;
    fixture.post_empty("/api/v1/queue/process").await;
    flush_audit().await;

    let response = fixture
        .get(&format!("/api/v1/audit?campaign_id={}&limit=1000", id))
        .await;
    assert_status!(response, StatusCode::OK);

    let types: Vec<&str> = response.body["events"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["event_type"].as_str())
        .collect();

    for expected in [
        "campaign_created",
        "campaign_claimed",
        "article_submitted",
        "tracking_link_acquired",
        "creative_generated",
        "platform_launch_succeeded",
        "campaign_status_changed",
    ] {
        assert!(
            types.contains(&expected),
            "missing {} in {:?}",
            expected,
            types
        );
    }

    let succeeded = types
        .iter()
        .filter(|t| **t == "platform_launch_succeeded")
        .count();
    assert_eq!(succeeded, 2);
}

#[tokio::test]
async fn test_retry_is_audited_with_user() {
    let fixture = TestFixture::new().await;
    fixture.tracking_link_ready().await;
    fixture.creatives.set_next_error("model overloaded").await;
    let id = fixture.create_campaign("Spring", None).await;
    fixture.post_empty("/api/v1/queue/process").await;
    fixture
        .post_empty(&format!("/api/v1/campaigns/{}/retry", id))
        .await;
    flush_audit().await;

    let response = fixture
        .get("/api/v1/audit?event_type=campaign_retried")
        .await;
    assert_eq!(response.body["total"], 1);
    let event = &response.body["events"][0];
    assert_eq!(event["user_id"], "anonymous");
    assert_eq!(event["data"]["retry_count"], 1);

    let response = fixture
        .get("/api/v1/audit?event_type=campaign_failed")
        .await;
    assert_eq!(response.body["total"], 1);
    assert_eq!(response.body["events"][0]["data"]["step"], "GENERATING_AI");
}

#[tokio::test]
async fn test_audit_query_filters_and_pagination() {
    let fixture = TestFixture::new().await;
    for name in ["One", "Two", "Three"] {
        fixture.create_campaign(name, None).await;
    }
    flush_audit().await;

    let response = fixture.get("/api/v1/audit?limit=2&offset=0").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["events"].as_array().unwrap().len(), 2);
    assert_eq!(response.body["total"], 3);
    assert_eq!(response.body["limit"], 2);
    assert_eq!(response.body["offset"], 0);

    let response = fixture.get("/api/v1/audit?limit=2&offset=2").await;
    assert_eq!(response.body["events"].as_array().unwrap().len(), 1);

    let response = fixture.get("/api/v1/audit?user_id=someone-else").await;
    assert_eq!(response.body["total"], 0);

    let response = fixture
        .get("/api/v1/audit?event_type=stop_loss_violation_raised")
        .await;
    assert!(response.body["events"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_audit_limit_is_capped() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/audit?limit=50000").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["limit"], 1000);
}

#[tokio::test]
async fn test_audit_filters_by_campaign_status_and_platform() {
    let fixture = TestFixture::new().await;
    fixture.tracking_link_ready().await;
    fixture.creatives.set_next_error("model overloaded").await;
    let id = fixture.create_campaign("Spring", None).await;
    fixture.post_empty("/api/v1/queue/process").await;
    flush_audit().await;

    let response = fixture
        .get(&format!(
            "/api/v1/audit?campaign_id={}&status=GENERATING_AI",
            id
        ))
        .await;
    assert_status!(response, StatusCode::OK);
    let events = response.body["events"].as_array().unwrap();
    // Into the stage, then out of it to FAILED.
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["data"]["from_status"], "GENERATING_AI");
    assert_eq!(events[0]["data"]["to_status"], "FAILED");
    assert_eq!(events[1]["data"]["to_status"], "GENERATING_AI");

    let response = fixture.get("/api/v1/audit?platform=meta").await;
    assert_eq!(response.body["total"], 0);

    let response = fixture.get("/api/v1/audit?status=NOT_A_STATUS").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
}
