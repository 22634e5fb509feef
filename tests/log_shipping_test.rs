//! Log shipping integration tests
//!
//! The log endpoint is a wiremock server; mocks mounted with `.expect(0)`
//! fail the test on drop if the client contacts them.

mod common;

use alloy_telemetry::log::{INGEST_PATH, UNKNOWN_REQUEST_ID};
use alloy_telemetry::{
    CallContext, Config, Level, LogRecord, RateLimiter, TelemetryClient, TelemetryError,
};
use common::{log_client, unreachable_endpoint, EchoResponder};
use opentelemetry::KeyValue;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mount a mock that fails the test if any request reaches it
async fn forbid_requests(server: &MockServer) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

async fn echo_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(INGEST_PATH))
        .and(header("content-type", "application/json"))
        .respond_with(EchoResponder)
        .mount(&server)
        .await;
    server
}

mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_levels_never_reach_network() {
        let server = MockServer::start().await;
        forbid_requests(&server).await;
        let client = log_client(&server.uri());
        let cx = CallContext::new();

        for level in ["loud", "", "information", "6", "trace", "TRACE"] {
            let err = client.add_log(&cx, level, "hello", &[]).await.unwrap_err();
            assert!(matches!(err, TelemetryError::Validation(_)), "{level:?}");
        }
        for code in [-1_i32, -2, 6, 99, -99] {
            let err = client.add_log(&cx, code, "hello", &[]).await.unwrap_err();
            assert!(matches!(err, TelemetryError::Validation(_)), "{code}");
        }
    }

    #[tokio::test]
    async fn test_empty_message_rejected_for_every_level() {
        let server = MockServer::start().await;
        forbid_requests(&server).await;
        let client = log_client(&server.uri());

        for level in Level::ALL {
            let err = client
                .add_log(&CallContext::new(), level, "", &[])
                .await
                .unwrap_err();
            assert!(matches!(err, TelemetryError::Validation(_)));
            assert_eq!(err.to_string(), "log message cannot be empty");
        }
    }

    #[tokio::test]
    async fn test_zero_rate_limit_with_cancelled_context() {
        let server = MockServer::start().await;
        forbid_requests(&server).await;
        let client = TelemetryClient::builder(Config {
            log_endpoint: server.uri(),
            ..Config::default()
        })
        .rate_limiter(RateLimiter::new(0.0, 0))
        .build()
        .unwrap();

        let cx = CallContext::new();
        cx.cancel();

        let err = client
            .add_log(&cx, Level::Info, "hello", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, TelemetryError::RateLimitExceeded(_)));
        assert!(err.response().is_none());
    }

    #[tokio::test]
    async fn test_wait_beyond_deadline_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INGEST_PATH))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        let client = log_client(&server.uri());
        client.set_rate_limit(0.5, 1);

        // Consumes the only token; the next one is two seconds away
        client
            .add_log(&CallContext::new(), Level::Info, "first", &[])
            .await
            .unwrap();

        let cx = CallContext::new().with_timeout(Duration::from_millis(50));
        let started = std::time::Instant::now();
        let err = client
            .add_log(&cx, Level::Info, "second", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, TelemetryError::RateLimitExceeded(_)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_echo_round_trip() {
        let server = echo_server().await;
        let client = log_client(&server.uri());
        let cx = CallContext::new().with_request_id("abc-123");

        let response = client.add_log(&cx, Level::Info, "hello", &[]).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);

        let record: LogRecord = response.json().await.unwrap();
        assert_eq!(record.message, "hello");
        assert_eq!(record.request_id, "abc-123");
        assert_eq!(record.level, Level::Info);
        assert_eq!(record.service_name, "addi");
        assert!(!record.is_secret);
        assert!(chrono::DateTime::parse_from_rfc3339(&record.timestamp).is_ok());
        assert!(record.attributes.is_empty());
    }

    #[tokio::test]
    async fn test_wire_format_fields() {
        let server = echo_server().await;
        let client = log_client(&server.uri());

        let response = client
            .add_log(
                &CallContext::new(),
                "WARN",
                "disk almost full",
                &[KeyValue::new("disk.free_mb", 12_i64)],
            )
            .await
            .unwrap();

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["level"], "warn");
        assert_eq!(body["message"], "disk almost full");
        assert_eq!(body["is_secret"], false);
        assert_eq!(body["service_name"], "addi");
        assert_eq!(body["request_id"], UNKNOWN_REQUEST_ID);
        assert_eq!(body["attributes"]["disk.free_mb"], 12);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_numeric_level_codes_accepted() {
        let server = echo_server().await;
        let client = log_client(&server.uri());

        let response = client
            .add_log(&CallContext::new(), 3_i8, "boom", &[])
            .await
            .unwrap();
        let record: LogRecord = response.json().await.unwrap();
        assert_eq!(record.level, Level::Error);
    }

    #[tokio::test]
    async fn test_bad_request_returns_transport_error_with_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INGEST_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad record"))
            .expect(1)
            .mount(&server)
            .await;
        let client = log_client(&server.uri());

        let err = client
            .add_log(&CallContext::new(), Level::Error, "hello", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, TelemetryError::Transport(_)));
        assert_eq!(
            err.to_string(),
            "failed to send log record, status code: 400"
        );
        assert_eq!(err.response().map(|r| r.status().as_u16()), Some(400));

        let response = err.into_response().expect("response kept");
        assert_eq!(response.text().await.unwrap(), "bad record");
    }

    #[tokio::test]
    async fn test_redirect_status_counts_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INGEST_PATH))
            .respond_with(ResponseTemplate::new(304))
            .mount(&server)
            .await;
        let client = log_client(&server.uri());

        let err = client
            .add_log(&CallContext::new(), Level::Info, "hello", &[])
            .await
            .unwrap_err();
        assert_eq!(err.response().map(|r| r.status().as_u16()), Some(304));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_returns_transport_error_without_response() {
        let client = log_client(&unreachable_endpoint());

        let err = client
            .add_log(&CallContext::new(), Level::Info, "hello", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, TelemetryError::Transport(_)));
        assert!(err.response().is_none());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn test_client_timeout_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let client = TelemetryClient::builder(Config {
            log_endpoint: server.uri(),
            ..Config::default()
        })
        .http_client(http_client)
        .build()
        .unwrap();

        let err = client
            .add_log(&CallContext::new(), Level::Info, "slow", &[])
            .await
            .unwrap_err();

        match err {
            TelemetryError::Transport(transport) => {
                assert!(transport.is_timeout());
                assert!(transport.response().is_none());
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_during_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;
        let client = log_client(&server.uri());
        let cx = CallContext::new().with_timeout(Duration::from_millis(100));

        let err = client
            .add_log(&cx, Level::Info, "slow", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, TelemetryError::Transport(_)));
        assert!(err.response().is_none());
        assert!(err.to_string().contains("context deadline exceeded"));
    }

    #[tokio::test]
    async fn test_set_rate_limit_updates_limiter() {
        let client = log_client("http://localhost:3100");

        client.set_rate_limit(5.0, 15);
        assert_eq!(client.rate_limit(), (5.0, 15));

        client.set_rate_limit(0.0, 0);
        assert_eq!(client.rate_limit(), (5.0, 15));

        client.set_rate_limit(-1.0, 30);
        assert_eq!(client.rate_limit(), (5.0, 30));
    }
}
