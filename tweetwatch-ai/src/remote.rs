use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};
use url::Url;

use tweetwatch_common::error::Error;
use tweetwatch_common::models::SentimentResult;
use tweetwatch_common::traits::SentimentClassifier;

use crate::models::{ClassifyRequest, ClassifyResponse};

/// Classifier that delegates to a remote HTTP endpoint.
///
/// The endpoint receives `{"text": ...}` and answers with
/// `{"label", "score", "confidence"}` or `{"error"}`.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    endpoint: Url,
    client: Client,
}

impl HttpClassifier {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, Error> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("invalid classifier url '{}': {}", endpoint, e)))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Turns a raw response body into a validated result.
pub fn parse_body(status: reqwest::StatusCode, body: &str) -> Result<SentimentResult, Error> {
    let parsed: ClassifyResponse = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(e) => {
            error!("Classifier returned non-JSON response (status {}): {:?}", status, e);
            return Err(Error::Classification(format!(
                "malformed classifier response (status {})",
                status
            )));
        }
    };

    if !status.is_success() {
        if let ClassifyResponse::Error { error } = parsed {
            return Err(Error::Classification(error));
        }
        return Err(Error::Classification(format!("classifier answered with status {}", status)));
    }

    parsed.into_result()
}

#[async_trait]
impl SentimentClassifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<SentimentResult, Error> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&ClassifyRequest { text: text.to_string() })
            .send()
            .await
            .map_err(|e| Error::Classification(format!("classifier unavailable: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Classification(format!("failed reading classifier response: {}", e)))?;
        debug!("Raw classifier response ({}): {}", status, body);

        parse_body(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use tweetwatch_common::models::SentimentLabel;

    async fn spawn_fake(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/classify", addr)
    }

    #[test]
    fn rejects_invalid_url() {
        assert!(matches!(
            HttpClassifier::new("not a url", Duration::from_secs(1)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn parse_body_handles_error_statuses() {
        let r = parse_body(reqwest::StatusCode::BAD_REQUEST, r#"{"error":"text is required"}"#);
        match r {
            Err(Error::Classification(msg)) => assert_eq!(msg, "text is required"),
            other => panic!("unexpected {:?}", other),
        }
        let r = parse_body(reqwest::StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert!(matches!(r, Err(Error::Classification(_))));
    }

    #[test]
    fn parse_body_rejects_out_of_range_confidence() {
        let r = parse_body(reqwest::StatusCode::OK, r#"{"label":"positive","score":0.4,"confidence":3.0}"#);
        assert!(matches!(r, Err(Error::Classification(_))));
    }

    #[tokio::test]
    async fn classify_round_trips_through_remote() {
        let router = Router::new().route(
            "/classify",
            post(|Json(req): Json<ClassifyRequest>| async move {
                assert_eq!(req.text, "awful service");
                Json(serde_json::json!({"label": "negative", "score": -0.8, "confidence": 0.84}))
            }),
        );
        let url = spawn_fake(router).await;
        let c = HttpClassifier::new(&url, Duration::from_secs(2)).unwrap();

        let r = c.classify("awful service").await.unwrap();
        assert_eq!(r.label, SentimentLabel::Negative);
        assert!((r.score + 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn classify_surfaces_remote_error() {
        let router = Router::new().route(
            "/classify",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"error": "model offline"})),
                )
            }),
        );
        let url = spawn_fake(router).await;
        let c = HttpClassifier::new(&url, Duration::from_secs(2)).unwrap();

        match c.classify("anything").await {
            Err(Error::Classification(msg)) => assert_eq!(msg, "model offline"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn classify_fails_when_unreachable() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let c = HttpClassifier::new(&format!("http://{}/classify", addr), Duration::from_millis(500)).unwrap();
        assert!(matches!(c.classify("hi").await, Err(Error::Classification(_))));
    }
}
