//! Failure injection and in-process middleware tests.

use std::sync::atomic::Ordering;

use axum::{
    body::{Body, Bytes},
    http::{header, request::Parts, Request, StatusCode},
    middleware::{from_fn, Next},
    response::Response,
};
use tower::ServiceExt;

use path_proxy::http::OutboundRequestSpec;
use path_proxy::{BoxError, ContextPattern, HttpProxy, PostData, ProxyConfig};

mod common;

async fn body_of(response: Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

#[tokio::test]
async fn test_non_json_upstream_gives_500_with_raw_body() {
    let backend = common::start_fixed_backend("200 OK", "not json").await;
    let config = ProxyConfig::builder("/api")
        .target(format!("http://{}", backend))
        .build()
        .unwrap();
    let (proxy, shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{}/api/x", proxy))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/html;charset=utf-8");
    assert_eq!(res.text().await.unwrap(), "not json");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_upstream_gives_empty_500() {
    let dead = common::closed_port().await;
    let config = ProxyConfig::builder("/api")
        .target(format!("http://{}", dead))
        .build()
        .unwrap();
    let (proxy, shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{}/api/x", proxy))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.bytes().await.unwrap().is_empty());

    shutdown.trigger();
}

#[tokio::test]
async fn test_failing_router_does_not_poison_later_requests() {
    let (backend, recorder) = common::start_echo_backend().await;
    let config = ProxyConfig::builder("/api")
        .target(format!("http://{}", backend))
        .router_fn(|req: &Parts| -> Result<Option<String>, BoxError> {
            if req.headers.contains_key("x-explode") {
                Err("router exploded".into())
            } else {
                Ok(None)
            }
        })
        .build()
        .unwrap();
    let (proxy, shutdown) = common::start_proxy(config).await;
    let client = common::client();

    let failed = client
        .get(format!("http://{}/api/x", proxy))
        .header("x-explode", "1")
        .send()
        .await
        .unwrap();
    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(failed.bytes().await.unwrap().is_empty());
    assert_eq!(recorder.calls(), 0);

    let ok = client
        .get(format!("http://{}/api/x", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(recorder.calls(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_failing_on_proxy_req_never_reaches_upstream() {
    let (backend, recorder) = common::start_echo_backend().await;
    let config = ProxyConfig::builder("/api")
        .target(format!("http://{}", backend))
        .on_proxy_req(
            |_: &mut OutboundRequestSpec, _: &Parts| -> Result<(), BoxError> {
                Err("refused".into())
            },
        )
        .build()
        .unwrap();
    let (app, fallback_hits) = common::with_counting_fallback(HttpProxy::new(config));

    let response = app
        .oneshot(Request::builder().uri("/api/x").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_of(response).await.is_empty());
    assert_eq!(recorder.calls(), 0);
    assert_eq!(fallback_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_out_of_context_calls_next_exactly_once() {
    let (backend, recorder) = common::start_echo_backend().await;
    let config = ProxyConfig::builder(vec!["/api".to_string(), "/ajax".to_string()])
        .target(format!("http://{}", backend))
        .build()
        .unwrap();
    let (app, fallback_hits) = common::with_counting_fallback(HttpProxy::new(config));

    let response = app
        .oneshot(Request::builder().uri("/assets/app.js").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&body_of(response).await[..], b"local");
    assert_eq!(fallback_hits.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.calls(), 0);
}

#[tokio::test]
async fn test_glob_exclusion_falls_through() {
    let (backend, recorder) = common::start_echo_backend().await;
    let config = ProxyConfig::builder(vec!["/api/**".to_string(), "!/**/secret.json".to_string()])
        .target(format!("http://{}", backend))
        .build()
        .unwrap();
    let (app, fallback_hits) = common::with_counting_fallback(HttpProxy::new(config));

    let excluded = app
        .clone()
        .oneshot(Request::builder().uri("/api/conf/secret.json").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(&body_of(excluded).await[..], b"local");

    let proxied = app
        .oneshot(Request::builder().uri("/api/conf/public.json").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(proxied.status(), StatusCode::OK);

    assert_eq!(fallback_hits.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.uris(), vec!["/api/conf/public.json".to_string()]);
}

#[tokio::test]
async fn test_predicate_context_failure_gives_500() {
    let (backend, recorder) = common::start_echo_backend().await;
    let config = ProxyConfig::builder(ContextPattern::predicate(
        |_: &str, _: &Parts| -> Result<bool, BoxError> { Err("predicate exploded".into()) },
    ))
    .target(format!("http://{}", backend))
    .build()
    .unwrap();
    let (app, fallback_hits) = common::with_counting_fallback(HttpProxy::new(config));

    let response = app
        .oneshot(Request::builder().uri("/anything").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(fallback_hits.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.calls(), 0);
}

async fn buffer_body(request: Request<Body>, next: Next) -> Response {
    let (mut parts, _) = request.into_parts();
    parts
        .extensions
        .insert(PostData(Bytes::from_static(b"{\"buffered\":true}")));
    next.run(Request::from_parts(parts, Body::empty())).await
}

#[tokio::test]
async fn test_post_data_replaces_consumed_stream() {
    let (backend, recorder) = common::start_echo_backend().await;
    let config = ProxyConfig::builder("/api")
        .target(format!("http://{}", backend))
        .build()
        .unwrap();
    let (app, _) = common::with_counting_fallback(HttpProxy::new(config));
    let app = app.layer(from_fn(buffer_body));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/form")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"original\":true}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&body_of(response).await[..], b"{\"buffered\":true}");
    assert_eq!(&recorder.last().unwrap().body[..], b"{\"buffered\":true}");
}
