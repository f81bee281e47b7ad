//! Integration scenarios for document workflow automation driven through the HTTP router.
//!
//! Rules are managed and executed only through `workflow_rule_router`, the same surface the API
//! service mounts, so these scenarios cover header parsing, capability checks, and persistence.

mod common {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use axum::response::Response;
    use axum::Router;
    use grc_automation::audit::InMemoryAuditLog;
    use grc_automation::http::{CAPABILITIES_HEADER, TENANT_HEADER};
    use grc_automation::workflows::document_rules::{
        workflow_rule_router, DocumentWorkflowService, InMemoryWorkflowRepository,
    };
    use serde_json::{json, Value};

    pub(super) const ALL_RULE_CAPABILITIES: &str = "rules:read,rules:write,rules:execute";

    pub(super) fn router() -> (Router, Arc<InMemoryAuditLog>) {
        let audit = Arc::new(InMemoryAuditLog::default());
        let service = DocumentWorkflowService::new(
            Arc::new(InMemoryWorkflowRepository::default()),
            audit.clone(),
        );
        (workflow_rule_router(Arc::new(service)), audit)
    }

    pub(super) fn request(
        method: &str,
        uri: &str,
        tenant: &str,
        capabilities: &str,
        body: Option<Value>,
    ) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(TENANT_HEADER, tenant)
            .header(CAPABILITIES_HEADER, capabilities);
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).expect("encode body")))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        }
    }

    pub(super) async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    pub(super) fn document(tenant: &str, status: &str) -> Value {
        json!({
            "id": "doc-42",
            "tenant_id": tenant,
            "app_code": "policy_hub",
            "title": "Access Control Standard",
            "status": status,
            "tags": ["iso27001"],
            "version": 4,
            "attributes": { "department": "security", "risk_score": 72 }
        })
    }
}

use axum::http::StatusCode;
use grc_automation::tenant::TenantId;
use serde_json::json;
use tower::ServiceExt;

use common::*;

#[tokio::test]
async fn document_event_runs_rules_in_priority_order() {
    let (router, audit) = router();

    let drafts = [
        json!({
            "rule_name": "Tag high risk",
            "rule_type": "auto_tagging",
            "conditions": { "kind": "field_in_range", "field": "risk_score", "min": 50 },
            "actions": [{ "kind": "add_tags", "tags": ["high-risk"] }],
            "priority": 30
        }),
        json!({
            "rule_name": "Approve security standards",
            "rule_type": "auto_approval",
            "conditions": { "kind": "all", "conditions": [
                { "kind": "field_equals", "field": "department", "value": "security" },
                { "kind": "status_is", "status": "pending_approval" }
            ]},
            "actions": [{ "kind": "approve", "approver": "ciso" }],
            "priority": 90,
            "app_code": "policy_hub"
        }),
        json!({
            "rule_name": "Other app only",
            "rule_type": "auto_tagging",
            "actions": [{ "kind": "add_tags", "tags": ["elsewhere"] }],
            "priority": 100,
            "app_code": "vendor_portal"
        }),
    ];
    for draft in drafts {
        let response = router
            .clone()
            .oneshot(request(
                "POST",
                "/api/v1/workflow-rules",
                "acme",
                ALL_RULE_CAPABILITIES,
                Some(draft),
            ))
            .await
            .expect("create response");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = router
        .clone()
        .oneshot(request(
            "GET",
            "/api/v1/workflow-rules?app_code=policy_hub",
            "acme",
            ALL_RULE_CAPABILITIES,
            None,
        ))
        .await
        .expect("list response");
    let listed = json_body(response).await;
    let names: Vec<&str> = listed
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|rule| rule["rule_name"].as_str())
        .collect();
    assert_eq!(names, vec!["Approve security standards", "Tag high risk"]);

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/workflow-events",
            "acme",
            ALL_RULE_CAPABILITIES,
            Some(json!({
                "document": document("acme", "pending_approval"),
                "trigger_event": "document_submitted",
                "mode": "all_matches"
            })),
        ))
        .await
        .expect("event response");
    assert_eq!(response.status(), StatusCode::OK);
    let runs = json_body(response).await;
    let runs = runs.as_array().expect("runs array");
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0]["execution"]["execution_status"], "success");
    assert_eq!(runs[1]["document"]["status"], "approved");
    let tags = runs[1]["document"]["tags"].as_array().expect("tags");
    assert!(tags.contains(&json!("high-risk")));
    assert!(!tags.contains(&json!("elsewhere")));

    let response = router
        .oneshot(request(
            "GET",
            "/api/v1/workflow-executions",
            "acme",
            ALL_RULE_CAPABILITIES,
            None,
        ))
        .await
        .expect("executions response");
    let executions = json_body(response).await;
    assert_eq!(executions.as_array().map(Vec::len), Some(2));
    for execution in executions.as_array().expect("array") {
        assert_eq!(execution["trigger_event"], "document_submitted");
        assert!(execution["execution_duration_ms"].as_i64().expect("duration") >= 0);
    }

    let tenant = TenantId::parse("acme").expect("valid tenant");
    assert_eq!(audit.entries_for(&tenant).len(), 3);
}

#[tokio::test]
async fn read_only_callers_cannot_manage_or_execute_rules() {
    let (router, _) = router();

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/workflow-rules",
            "acme",
            "rules:read",
            Some(json!({ "rule_name": "Nope", "rule_type": "auto_tagging" })),
        ))
        .await
        .expect("create response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/workflow-events",
            "acme",
            "rules:read",
            Some(json!({
                "document": document("acme", "draft"),
                "trigger_event": "document_updated"
            })),
        ))
        .await
        .expect("event response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router
        .oneshot(request(
            "GET",
            "/api/v1/workflow-rules",
            "",
            ALL_RULE_CAPABILITIES,
            None,
        ))
        .await
        .expect("list response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn documents_of_another_tenant_are_refused() {
    let (router, _) = router();

    let response = router
        .oneshot(request(
            "POST",
            "/api/v1/workflow-automation",
            "acme",
            ALL_RULE_CAPABILITIES,
            Some(json!({
                "action": "suggest_tags",
                "document": document("globex", "draft")
            })),
        ))
        .await
        .expect("automation response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
