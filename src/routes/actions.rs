use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::services::journal::ActionEntry;
use crate::AppState;

const DEFAULT_LIMIT: usize = 50;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_actions))
        .route("/incomplete", get(list_incomplete))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ActionsResponse {
    pub count: usize,
    pub actions: Vec<ActionEntry>,
}

fn respond(entries: Vec<ActionEntry>, limit: Option<usize>) -> Json<ActionsResponse> {
    let actions: Vec<ActionEntry> = entries
        .into_iter()
        .take(limit.unwrap_or(DEFAULT_LIMIT))
        .collect();
    Json(ActionsResponse {
        count: actions.len(),
        actions,
    })
}

/// Most recent actions first.
async fn list_actions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<ActionsResponse> {
    respond(state.journal.recent(), query.limit)
}

/// Actions with a failed or skipped step, for manual reconciliation.
async fn list_incomplete(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<ActionsResponse> {
    respond(state.journal.incomplete(), query.limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::journal::{ActionJournal, ActionKind, Step, StepOutcome};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app(journal: Arc<ActionJournal>) -> Router {
        let state = Arc::new(AppState {
            journal,
            started_at: chrono::Utc::now(),
        });
        Router::new()
            .route("/health", get(crate::routes::health::health_check))
            .nest("/api/actions", router())
            .with_state(state)
    }

    async fn get_json(app: Router, uri: &str) -> serde_json::Value {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn seeded_journal() -> Arc<ActionJournal> {
        let journal = Arc::new(ActionJournal::new(10));
        let ok = journal.begin(ActionKind::Assign, "1");
        journal.record(ok, Step::Record, StepOutcome::Succeeded);
        let broken = journal.begin(ActionKind::Complete, "2");
        journal.record(broken, Step::Record, StepOutcome::Succeeded);
        journal.record(
            broken,
            Step::Event,
            StepOutcome::Failed("calendar down".to_string()),
        );
        journal
    }

    #[tokio::test]
    async fn lists_recent_actions() {
        let body = get_json(app(seeded_journal()), "/api/actions").await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["actions"][0]["action"], "complete");
        assert_eq!(body["actions"][1]["thread_id"], "1");
    }

    #[tokio::test]
    async fn limit_caps_results() {
        let body = get_json(app(seeded_journal()), "/api/actions?limit=1").await;
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn lists_incomplete_actions() {
        let body = get_json(app(seeded_journal()), "/api/actions/incomplete").await;
        assert_eq!(body["count"], 1);
        let steps = body["actions"][0]["steps"].as_array().unwrap();
        assert_eq!(steps[1]["step"], "event");
        assert_eq!(steps[1]["outcome"]["status"], "failed");
        assert_eq!(steps[1]["outcome"]["detail"], "calendar down");
    }

    #[tokio::test]
    async fn health_reports_incomplete_count() {
        let body = get_json(app(seeded_journal()), "/health").await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["incomplete_actions"], 1);
    }
}
