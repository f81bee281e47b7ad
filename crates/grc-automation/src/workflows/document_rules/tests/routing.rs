use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::http::{CAPABILITIES_HEADER, TENANT_HEADER};
use crate::workflows::document_rules::router::workflow_rule_router;

fn json_request(method: &str, uri: &str, tenant: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(TENANT_HEADER, tenant)
        .header(CAPABILITIES_HEADER, "rules:read,rules:write,rules:execute")
        .body(Body::from(serde_json::to_vec(&body).expect("encode body")))
        .expect("request")
}

fn empty_request(method: &str, uri: &str, tenant: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(TENANT_HEADER, tenant)
        .header(CAPABILITIES_HEADER, "rules:read,rules:write,rules:execute")
        .body(Body::empty())
        .expect("request")
}

fn draft_body() -> Value {
    json!({
        "rule_name": "Auto-approve finance",
        "rule_type": "auto_approval",
        "conditions": { "kind": "field_equals", "field": "department", "value": "finance" },
        "actions": [{ "kind": "approve" }],
        "priority": 40
    })
}

#[tokio::test]
async fn create_then_list_round_trips_through_http() {
    let (service, _, _) = build_service();
    let router = workflow_rule_router(Arc::new(service));

    let response = router
        .clone()
        .oneshot(json_request("POST", "/api/v1/workflow-rules", "acme", draft_body()))
        .await
        .expect("create response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json_body(response).await;
    assert_eq!(created["is_enabled"], json!(true));
    assert_eq!(created["tenant_id"], json!("acme"));

    let response = router
        .clone()
        .oneshot(empty_request("GET", "/api/v1/workflow-rules", "acme"))
        .await
        .expect("list response");
    assert_eq!(response.status(), StatusCode::OK);
    let listed = read_json_body(response).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let response = router
        .oneshot(empty_request("GET", "/api/v1/workflow-rules", "globex"))
        .await
        .expect("foreign list response");
    let listed = read_json_body(response).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn invalid_priority_is_unprocessable() {
    let (service, _, _) = build_service();
    let router = workflow_rule_router(Arc::new(service));
    let mut body = draft_body();
    body["priority"] = json!(150);

    let response = router
        .oneshot(json_request("POST", "/api/v1/workflow-rules", "acme", body))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .is_some_and(|message| message.contains("priority")));
}

#[tokio::test]
async fn missing_tenant_header_is_a_bad_request() {
    let (service, _, _) = build_service();
    let router = workflow_rule_router(Arc::new(service));

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/workflow-rules")
                .header(CAPABILITIES_HEADER, "rules:read")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_without_confirmation_is_rejected() {
    let (service, _, _) = build_service();
    let created = service
        .create_rule(&admin("acme"), approval_draft())
        .expect("rule created");
    let router = workflow_rule_router(Arc::new(service));
    let uri = format!("/api/v1/workflow-rules/{}", created.id.0);

    let response = router
        .clone()
        .oneshot(empty_request("DELETE", &uri, "acme"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = router
        .oneshot(empty_request("DELETE", &format!("{uri}?confirm=true"), "acme"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn toggle_accepts_an_empty_body() {
    let (service, _, _) = build_service();
    let created = service
        .create_rule(&admin("acme"), approval_draft())
        .expect("rule created");
    let router = workflow_rule_router(Arc::new(service));

    let response = router
        .oneshot(empty_request(
            "POST",
            &format!("/api/v1/workflow-rules/{}/toggle", created.id.0),
            "acme",
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let toggled = read_json_body(response).await;
    assert_eq!(toggled["is_enabled"], json!(false));
}

#[tokio::test]
async fn automation_endpoint_dispatches_on_action() {
    let (service, _, _) = build_service();
    let created = service
        .create_rule(&admin("acme"), approval_draft())
        .expect("rule created");
    let router = workflow_rule_router(Arc::new(service));
    let document = serde_json::to_value(document("acme")).expect("document json");

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/workflow-automation",
            "acme",
            json!({ "action": "execute_rule", "rule_id": created.id.0, "document": document }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["action"], json!("execute_rule"));
    assert_eq!(payload["execution"]["execution_status"], json!("success"));
    assert_eq!(payload["document"]["status"], json!("approved"));

    let response = router
        .oneshot(empty_request(
            "GET",
            &format!("/api/v1/workflow-executions?rule_id={}", created.id.0),
            "acme",
        ))
        .await
        .expect("response");
    let log = read_json_body(response).await;
    assert_eq!(log.as_array().map(Vec::len), Some(1));
}
