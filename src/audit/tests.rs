use std::sync::Arc;

use axum::{Json, Router, http::StatusCode, routing::post};
use parking_lot::Mutex;
use tokio::net::TcpListener;

use super::*;
use crate::biometric::{Modality, SubjectProfile};
use crate::decision::{DecisionPolicy, decide};
use crate::matcher::{MatchDecision, MatchMode, MatchWinner};
use crate::verifier::VerifyContext;

fn matched_decision() -> MatchDecision {
    MatchDecision {
        modality: Modality::Face,
        matched: true,
        winner: Some(MatchWinner {
            template_id: "tpl-1".to_string(),
            subject: SubjectProfile::new("stu-1", "Katherine Johnson"),
            score: 0.8,
            confidence: 80.0,
            distance: Some(0.2),
            exact: false,
        }),
        candidates_compared: 4,
        errors: Vec::new(),
        best_observed: None,
        mode: MatchMode::Sequential,
        cancelled: false,
        probe_digest: "cd".repeat(32),
    }
}

fn record() -> AuditRecord {
    let decision = matched_decision();
    let verdict = decide(&decision, &DecisionPolicy::new(50.0));
    let context = VerifyContext::for_session("sess-9", Some("MATH200".to_string()));
    AuditRecord::new(&context, &decision, &verdict)
}

async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[test]
fn test_record_carries_outcome_not_payload() {
    let record = record();

    assert_eq!(record.subject_id.as_deref(), Some("stu-1"));
    assert_eq!(record.confidence, Some(80.0));
    assert_eq!(record.candidates_compared, 4);
    assert_eq!(record.error_count, 0);
    assert_eq!(record.mode, "sequential");

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["sessionId"], "sess-9");
    assert_eq!(json["courseId"], "MATH200");
    assert_eq!(json["modality"], "face");
    assert!(json.get("payload").is_none());
    assert!(json.get("descriptor").is_none());
}

#[test]
fn test_record_ids_are_unique() {
    assert_ne!(record().record_id, record().record_id);
}

#[tokio::test]
async fn test_http_sink_posts_json() {
    let received: Arc<Mutex<Vec<serde_json::Value>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_state = Arc::clone(&received);
    let router = Router::new().route(
        "/attendance",
        post(move |Json(body): Json<serde_json::Value>| {
            let sink_state = Arc::clone(&sink_state);
            async move {
                sink_state.lock().push(body);
                StatusCode::CREATED
            }
        }),
    );
    let base = spawn(router).await;
    let sink = HttpAuditSink::new(format!("{}/attendance", base)).unwrap();

    let record = record();
    sink.record(record.clone()).await.unwrap();

    let bodies = received.lock().clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["recordId"], record.record_id.to_string());
    assert_eq!(bodies[0]["subjectId"], "stu-1");
}

#[tokio::test]
async fn test_http_sink_reports_status() {
    let router = Router::new().route("/attendance", post(|| async { StatusCode::BAD_GATEWAY }));
    let base = spawn(router).await;
    let sink = HttpAuditSink::new(format!("{}/attendance", base)).unwrap();

    let err = sink.record(record()).await.unwrap_err();

    assert!(matches!(err, AuditError::Status { status: 502 }));
}

#[tokio::test]
async fn test_http_sink_unreachable() {
    let sink = HttpAuditSink::new("http://127.0.0.1:1/attendance").unwrap();

    let err = sink.record(record()).await.unwrap_err();

    assert!(matches!(err, AuditError::Transport { .. }));
}

#[tokio::test]
async fn test_noop_sink_accepts_everything() {
    assert!(NoopAuditSink.record(record()).await.is_ok());
}
