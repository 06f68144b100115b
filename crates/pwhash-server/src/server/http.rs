//! HTTP adapter around [`Service::dispatch`].
//!
//! Every request, whatever its verb or path, is handled by one fallback
//! handler that decodes the form fields and hands verb, path and form to the
//! service. Routing, admission and draining all happen inside the service; this
//! layer only translates between HTTP and [`Reply`].

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderValue, Method, Request, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use pwhash::{Form, Reply, Service};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::Span;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Builds the application router. All paths fall through to [`dispatch`].
pub fn app(service: Arc<Service>) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(request_span)),
        )
        .with_state(service)
}

async fn dispatch(
    State(service): State<Arc<Service>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let form = decode_form(uri.query(), &headers, &body);
    let reply = service.dispatch(method.as_str(), uri.path(), &form);
    into_response(reply)
}

/// Span for one request. Records the path only: the query string may carry
/// form fields such as the password.
fn request_span(request: &Request<Body>) -> Span {
    tracing::debug_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        version = ?request.version(),
    )
}

/// Collects form fields from the url-encoded body, then the query string.
/// The first value seen for a key is kept, so body fields win over query
/// fields and repeated keys resolve to their first occurrence. Undecodable
/// input is logged and skipped, so the handler reports the missing fields.
fn decode_form(query: Option<&str>, headers: &HeaderMap, body: &[u8]) -> Form {
    let mut form = Form::new();

    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with(FORM_CONTENT_TYPE));

    if is_form && !body.is_empty() {
        match serde_urlencoded::from_bytes::<Vec<(String, String)>>(body) {
            Ok(pairs) => keep_first(&mut form, pairs),
            Err(e) => tracing::warn!("Ignoring undecodable form body: {e}"),
        }
    }

    if let Some(query) = query {
        match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
            Ok(pairs) => keep_first(&mut form, pairs),
            Err(e) => tracing::warn!("Ignoring undecodable query string: {e}"),
        }
    }

    form
}

fn keep_first(form: &mut Form, pairs: Vec<(String, String)>) {
    for (key, value) in pairs {
        form.entry(key).or_insert(value);
    }
}

fn into_response(reply: Reply) -> Response {
    let status = StatusCode::from_u16(reply.status().as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let allow = reply.allow();
    let (_, body) = reply.into_parts();

    let mut response = (status, Json(body)).into_response();
    if let Some(verbs) = allow {
        if let Ok(value) = HeaderValue::from_str(&verbs.join(", ")) {
            response.headers_mut().insert(header::ALLOW, value);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use core::time::Duration;
    use pwhash::ServiceConfig;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn service() -> Arc<Service> {
        Arc::new(Service::new(ServiceConfig {
            hash_delay: Duration::from_millis(50),
            ..ServiceConfig::default()
        }))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_form(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn form_body_submission_round_trip() {
        let svc = service();

        let (status, _, body) = send(app(Arc::clone(&svc)), post_form("/hash", "password=angryMonkey")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "id": 1 }));

        let (status, _, body) = send(app(Arc::clone(&svc)), get("/hash/1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], 404);

        svc.worker().drain().await;

        let (status, _, body) = send(app(Arc::clone(&svc)), get("/hash/1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "id": 1,
                "digest": "ZEHhWB65gUlzdVwtDQArEyx+KVLzp/aTaRaPlBzYRIFj6vjFdqEb0Q5B8zVKCZ0vKbZPZklJz0Fd7su2A+gf7Q=="
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn query_string_fields_are_accepted() {
        let svc = service();
        let request = Request::post("/hash?password=pw").body(Body::empty()).unwrap();
        let (status, _, body) = send(app(svc), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "id": 1 }));
    }

    #[tokio::test(start_paused = true)]
    async fn body_without_form_content_type_is_ignored() {
        let svc = service();
        let request = Request::post("/hash")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("password=pw"))
            .unwrap();
        let (status, _, body) = send(app(svc), request).await;
        assert_eq!(status, StatusCode::PRECONDITION_FAILED);
        assert_eq!(body["error"], 412);
    }

    #[tokio::test(start_paused = true)]
    async fn unsupported_verb_advertises_allowed_verbs() {
        let svc = service();
        let request = Request::delete("/hash/1").body(Body::empty()).unwrap();
        let (status, headers, body) = send(app(svc), request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(headers[header::ALLOW], "GET, POST");
        assert_eq!(body["allow"], json!(["GET", "POST"]));
    }

    #[test]
    fn first_occurrence_of_a_field_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));

        let form = decode_form(None, &headers, b"password=a&password=");
        assert_eq!(form["password"], "a");

        let form = decode_form(Some("password=&password=b"), &HeaderMap::new(), b"");
        assert_eq!(form["password"], "");

        let form = decode_form(Some("password=query&user=q"), &headers, b"password=body");
        assert_eq!(form["password"], "body");
        assert_eq!(form["user"], "q");
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_password_field_is_accepted() {
        let svc = service();
        let (status, _, body) = send(app(svc), post_form("/hash", "password=a&password=")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "id": 1 }));
    }

    #[test]
    fn request_span_leaves_query_out() {
        let request = Request::post("/hash?password=secret").body(Body::empty()).unwrap();

        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            let span = request_span(&request);
            let fields = span.metadata().expect("span enabled").fields();
            assert!(fields.field("path").is_some());
            assert!(fields.field("uri").is_none());
            assert!(fields.iter().all(|f| !f.name().contains("query")));
        });
    }

    #[tokio::test(start_paused = true)]
    async fn stats_and_shutdown() {
        let svc = service();

        send(app(Arc::clone(&svc)), post_form("/hash", "password=a")).await;
        send(app(Arc::clone(&svc)), post_form("/hash", "password=b")).await;

        let (status, _, body) = send(app(Arc::clone(&svc)), get("/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert!(body["average"].is_u64());

        let (status, _, body) = send(app(Arc::clone(&svc)), post_form("/shutdown", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "shutting down" }));
        assert!(svc.gate().is_ready());

        let (status, _, body) = send(app(Arc::clone(&svc)), get("/stats")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], 503);
    }
}
