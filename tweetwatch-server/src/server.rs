use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, State, rejection::{JsonRejection, PathRejection}},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use axum_server::{Handle, Server};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use tweetwatch_ai::ClassifyResponse;
use tweetwatch_core::Error;
use tweetwatch_core::models::BlacklistEntry;
use tweetwatch_core::services::AnalysisReport;

use crate::context::AppState;

pub const OWNER_HEADER: &str = "x-owner-id";

/// Error body returned by every endpoint: `{ "error": msg }`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Classification(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            // Storage internals stay in the log.
            e if status == StatusCode::INTERNAL_SERVER_ERROR => {
                error!("Request failed: {}", e);
                "internal server error".to_string()
            }
            Error::InvalidInput(m)
            | Error::Auth(m)
            | Error::Forbidden(m)
            | Error::NotFound(m)
            | Error::Classification(m) => m.clone(),
            e => e.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Account on whose behalf the request runs, from the `x-owner-id` header.
#[derive(Debug, Clone, Copy)]
pub struct Owner(pub Uuid);

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(OWNER_HEADER)
            .ok_or_else(|| Error::Auth("missing owner identity".into()))?;
        let id = raw
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| Error::Auth("malformed owner identity".into()))?;
        Ok(Owner(id))
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    username: Option<String>,
    tweet: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyTextRequest {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UnblacklistResponse {
    pub entry_id: Uuid,
    /// False when the entry was already cleared.
    pub changed: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: u64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze))
        .route("/api/classify", post(classify))
        .route("/api/entries", get(list_entries))
        .route("/api/blacklist", get(list_blacklist).delete(clear_blacklist))
        .route("/api/blacklist/{entry_id}", delete(unblacklist))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

fn body_error(rejection: JsonRejection) -> ApiError {
    ApiError(Error::InvalidInput(rejection.body_text()))
}

fn required(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}

async fn analyze(
    State(state): State<AppState>,
    Owner(owner): Owner,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let Json(req) = payload.map_err(body_error)?;
    let (Some(username), Some(tweet)) = (required(req.username), required(req.tweet)) else {
        return Err(Error::InvalidInput("Username and tweet are required".into()).into());
    };
    let report = state.service.analyze(owner, &username, &tweet).await?;
    Ok(Json(report))
}

async fn classify(
    State(state): State<AppState>,
    payload: Result<Json<ClassifyTextRequest>, JsonRejection>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let Json(req) = payload.map_err(body_error)?;
    let text = required(req.text).ok_or_else(|| Error::InvalidInput("text is required".into()))?;
    let result = state.service.classify(&text).await?;
    Ok(Json(ClassifyResponse::from(result)))
}

async fn list_blacklist(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<Json<Vec<BlacklistEntry>>, ApiError> {
    Ok(Json(state.tracker().list_blacklist(owner).await?))
}

async fn list_entries(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<Json<Vec<BlacklistEntry>>, ApiError> {
    Ok(Json(state.tracker().list_entries(owner).await?))
}

async fn unblacklist(
    State(state): State<AppState>,
    Owner(owner): Owner,
    entry_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<UnblacklistResponse>, ApiError> {
    let Path(entry_id) =
        entry_id.map_err(|e| ApiError(Error::InvalidInput(e.body_text())))?;
    let changed = state.tracker().unblacklist(owner, entry_id).await?;
    Ok(Json(UnblacklistResponse { entry_id, changed }))
}

async fn clear_blacklist(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<Json<ClearResponse>, ApiError> {
    let cleared = state.tracker().clear_all(owner).await?;
    Ok(Json(ClearResponse { cleared }))
}

/// Serves `state` on `addr` until ctrl-c, then drains in-flight requests.
pub async fn serve(addr: &str, state: AppState) -> Result<(), Error> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Config(format!("invalid server address '{}': {}", addr, e)))?;
    let app = router(state);

    let handle = Handle::new();
    let handle_clone = handle.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
        }
        info!("Shutdown requested; draining connections");
        handle_clone.graceful_shutdown(Some(Duration::from_secs(10)));
    });

    info!("TweetWatch API listening on http://{}", addr);
    Server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;
    info!("HTTP server shut down.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    use tweetwatch_core::models::SentimentLabel;
    use tweetwatch_core::services::{SentimentService, TrackerConfig};
    use tweetwatch_core::test_utils::helpers::{FixedClassifier, memory_tracker};

    use super::*;

    fn app(label: SentimentLabel) -> Router {
        let (tracker, _bus, _repo) = memory_tracker(TrackerConfig::default()).unwrap();
        let service = SentimentService::new(Arc::new(FixedClassifier::new(label)), Arc::new(tracker));
        router(AppState::new(Arc::new(service)))
    }

    async fn call(app: &Router, method: Method, uri: &str, owner: Option<Uuid>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(owner) = owner {
            req = req.header(OWNER_HEADER, owner.to_string());
        }
        let req = match body {
            Some(v) => req
                .header("content-type", "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    #[tokio::test]
    async fn analyze_escalates_on_third_negative() {
        let app = app(SentimentLabel::Negative);
        let owner = Uuid::new_v4();
        let body = json!({ "username": "@Troll", "tweet": "awful" });

        for _ in 0..2 {
            let (status, json) = call(&app, Method::POST, "/api/analyze", Some(owner), Some(body.clone())).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json["tracking"]["escalated"], false);
        }
        let (_, json) = call(&app, Method::POST, "/api/analyze", Some(owner), Some(body)).await;
        assert_eq!(json["author_handle"], "troll");
        assert_eq!(json["tracking"]["escalated"], true);
        assert_eq!(json["tracking"]["entry"]["negative_count"], 3);
        assert_eq!(json["tracking"]["entry"]["last_negative_text"], "awful");

        let (status, list) = call(&app, Method::GET, "/api/blacklist", Some(owner), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().map(|a| a.len()), Some(1));

        let (_, other) = call(&app, Method::GET, "/api/blacklist", Some(Uuid::new_v4()), None).await;
        assert_eq!(other, json!([]));
    }

    #[tokio::test]
    async fn missing_fields_are_400() {
        let app = app(SentimentLabel::Negative);
        let (status, json) = call(&app, Method::POST, "/api/analyze", Some(Uuid::new_v4()), Some(json!({ "username": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Username and tweet are required");
    }

    #[tokio::test]
    async fn missing_or_bad_owner_is_401() {
        let app = app(SentimentLabel::Negative);
        let (status, json) = call(&app, Method::GET, "/api/entries", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(json["error"].is_string());

        let req = Request::builder()
            .uri("/api/entries")
            .header(OWNER_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unblacklist_and_clear_round_trip() {
        let app = app(SentimentLabel::Negative);
        let owner = Uuid::new_v4();
        for handle in ["a", "a", "a", "b", "b", "b"] {
            call(&app, Method::POST, "/api/analyze", Some(owner), Some(json!({ "username": handle, "tweet": "bad" }))).await;
        }
        let (_, list) = call(&app, Method::GET, "/api/blacklist", Some(owner), None).await;
        let id = list[0]["entry_id"].as_str().unwrap().to_string();

        let (status, _) = call(&app, Method::DELETE, &format!("/api/blacklist/{}", id), Some(Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let uri = format!("/api/blacklist/{}", id);
        let (status, json) = call(&app, Method::DELETE, &uri, Some(owner), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["changed"], true);
        let (_, json) = call(&app, Method::DELETE, &uri, Some(owner), None).await;
        assert_eq!(json["changed"], false);

        let (status, _) = call(&app, Method::DELETE, &format!("/api/blacklist/{}", Uuid::new_v4()), Some(owner), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, json) = call(&app, Method::DELETE, "/api/blacklist", Some(owner), None).await;
        assert_eq!(json["cleared"], 1);
        let (_, entries) = call(&app, Method::GET, "/api/entries", Some(owner), None).await;
        assert_eq!(entries.as_array().map(|a| a.len()), Some(2));
    }

    #[tokio::test]
    async fn bad_entry_id_is_400() {
        let app = app(SentimentLabel::Negative);
        let (status, _) = call(&app, Method::DELETE, "/api/blacklist/42", Some(Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn classify_needs_no_owner() {
        let app = app(SentimentLabel::Positive);
        let (status, json) = call(&app, Method::POST, "/api/classify", None, Some(json!({ "text": "love it" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["label"], "positive");
        let parsed: ClassifyResponse = serde_json::from_value(json).unwrap();
        assert!(parsed.into_result().is_ok());
    }

    #[test]
    fn error_statuses() {
        assert_eq!(ApiError(Error::Classification("x".into())).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError(Error::Forbidden("x".into())).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError(Error::Config("x".into())).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
