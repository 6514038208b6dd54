//! Integration tests for the HTTP transport and session against wiremock.

use std::sync::Arc;

use tether_client::transport::HttpTransport;
use tether_client::{criteria, ClientConfig, Session};
use tether_core::capability::ControlType;
use tether_core::error::{ErrorCode, TwinError};
use tether_core::json::Value;
use tether_core::protocol::Method;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> Arc<HttpTransport> {
    Arc::new(HttpTransport::new(&ClientConfig::default().pool).expect("client builds"))
}

fn envelope(value: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "sessionId": "abc",
        "status": 0,
        "value": value,
    }))
}

/// Run blocking client code off the async runtime that hosts the mock server.
async fn blocking<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    tokio::task::spawn_blocking(f).await.expect("blocking task panicked")
}

#[tokio::test(flavor = "multi_thread")]
async fn open_and_close_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .and(body_json(serde_json::json!({
            "desiredCapabilities": {"applicationName": "notepad"},
            "sessionSetup": {},
        })))
        .respond_with(envelope(serde_json::json!({"applicationName": "notepad"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/session/abc"))
        .respond_with(envelope(serde_json::Value::Null))
        .expect(1)
        .mount(&server)
        .await;

    let url = server.uri();
    let (id, app, closed) = blocking(move || {
        let session = Session::new(transport(), &url);
        session
            .open_application("notepad", None, Default::default())
            .expect("open succeeds");
        let id = session.id();
        let app = session.application_name();
        session.close().expect("close succeeds");
        (id, app, session.is_closed())
    })
    .await;

    assert_eq!(id.as_deref(), Some("abc"));
    assert_eq!(app.as_deref(), Some("notepad"));
    assert!(closed);
}

#[tokio::test(flavor = "multi_thread")]
async fn search_decodes_remote_elements() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/session/abc/desktop/children"))
        .respond_with(envelope(serde_json::json!([
            {
                "class": "Element",
                "uuid": "w1",
                "name": "Untitled - Notepad",
                "controlType": "Window",
                "controlPatterns": ["transform"],
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let url = server.uri();
    let (uuid, control_type, name) = blocking(move || {
        let session = Session::attach(transport(), &url, "abc", Default::default());
        let windows = session
            .desktop()
            .children(Some(&criteria::of_type(ControlType::Window)))
            .expect("search succeeds");
        assert_eq!(windows.len(), 1);
        let window = &windows[0];
        (
            window.uuid().map(str::to_string),
            window.control_type(),
            window.cached_name().map(str::to_string),
        )
    })
    .await;

    assert_eq!(uuid.as_deref(), Some("w1"));
    assert_eq!(control_type, Some(ControlType::Window));
    assert_eq!(name.as_deref(), Some("Untitled - Notepad"));
}

#[tokio::test(flavor = "multi_thread")]
async fn error_envelope_becomes_remote_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/session/abc/element/gone"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "sessionId": "abc",
            "status": 10,
            "value": {
                "message": "Element no longer exists",
                "class": "StaleElementException",
                "stackTrace": [],
            },
        })))
        .mount(&server)
        .await;

    let url = server.uri();
    let err = blocking(move || {
        let session = Session::attach(transport(), &url, "abc", Default::default());
        session
            .request(Method::Get, "element/gone", None)
            .expect_err("server reported an error")
    })
    .await;

    assert!(err.is_stale());
    match err {
        TwinError::Remote(remote) => {
            assert_eq!(remote.code, ErrorCode::StaleElementReference);
            assert_eq!(remote.message.as_deref(), Some("Element no longer exists"));
            assert_eq!(remote.class_name.as_deref(), Some("StaleElementException"));
        }
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_trace_ends_at_caller() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/session/abc/element/e1/click"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "sessionId": "abc",
            "status": 12,
            "value": {
                "message": "Element is disabled",
                "stackTrace": [
                    {"className": "Twin.Element", "methodName": "Click", "fileName": "Element.cs", "lineNumber": 88},
                ],
            },
        })))
        .mount(&server)
        .await;

    let url = server.uri();
    let (err, line) = blocking(move || {
        let session = Session::attach(transport(), &url, "abc", Default::default());
        let line = line!() + 1;
        let err = session.request(Method::Post, "element/e1/click", None);
        (err.expect_err("server reported an error"), line)
    })
    .await;

    let remote = match err {
        TwinError::Remote(remote) => remote,
        other => panic!("expected remote error, got {:?}", other),
    };
    assert_eq!(remote.code, ErrorCode::InvalidElementState);
    assert_eq!(remote.stack_trace.len(), 2);
    assert_eq!(remote.stack_trace[0].method_name.as_deref(), Some("Click"));
    let local = &remote.stack_trace[1];
    assert!(
        local.file_name.as_deref().is_some_and(|f| f.ends_with("http.rs")),
        "local frame points at {:?}",
        local.file_name
    );
    assert_eq!(local.line_number, Some(line));
}

#[tokio::test(flavor = "multi_thread")]
async fn plain_404_is_unknown_command() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/session/abc/nowhere"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let url = server.uri();
    let err = blocking(move || {
        let session = Session::attach(transport(), &url, "abc", Default::default());
        session
            .request(Method::Get, "nowhere", None)
            .expect_err("404 must fail")
    })
    .await;

    assert_eq!(err.remote_code(), Some(ErrorCode::UnknownCommand));
}

#[tokio::test(flavor = "multi_thread")]
async fn options_reads_allow_header() {
    let server = MockServer::start().await;

    Mock::given(method("OPTIONS"))
        .and(path("/session/abc/element/e1/value"))
        .respond_with(ResponseTemplate::new(200).insert_header("Allow", "GET, POST"))
        .mount(&server)
        .await;

    let url = server.uri();
    let allowed = blocking(move || {
        let session = Session::attach(transport(), &url, "abc", Default::default());
        session.options("element/e1/value").expect("options succeeds")
    })
    .await;

    assert_eq!(allowed, vec!["GET".to_string(), "POST".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn clipboard_round_trip_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/session/abc/clipboard"))
        .and(body_json(serde_json::json!({"type": "text", "text": "hi"})))
        .respond_with(envelope(serde_json::Value::Null))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/session/abc/clipboard"))
        .respond_with(envelope(serde_json::json!({"type": "text", "text": "hi"})))
        .mount(&server)
        .await;

    let url = server.uri();
    let text = blocking(move || {
        let session = Session::attach(transport(), &url, "abc", Default::default());
        let clipboard = session.clipboard();
        clipboard.set_text("hi").expect("set succeeds");
        clipboard.text().expect("get succeeds")
    })
    .await;

    assert_eq!(text.as_deref(), Some("hi"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_server_is_transport_error() {
    let err = blocking(|| {
        let session = Session::attach(transport(), "http://127.0.0.1:1", "abc", Default::default());
        session
            .request(Method::Get, "element/active", None::<&Value>)
            .expect_err("nothing listens on port 1")
    })
    .await;

    assert!(matches!(err, TwinError::Transport { .. }));
}
