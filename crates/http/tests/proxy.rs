use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{self, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use bookshelf_http::proxy::{HeaderPolicy, Proxy};
use bookshelf_kernel::settings::{ProxySettings, Settings};
use bookshelf_kernel::{Module, ModuleRegistry};
use tower::ServiceExt;

#[derive(Debug, Clone)]
struct Seen {
    method: Method,
    path_and_query: String,
    headers: HeaderMap,
    body: Vec<u8>,
}

type Log = Arc<Mutex<Vec<Seen>>>;

/// Records every request and answers with its body. The status comes from
/// `x-reply-status` when the caller sets it.
async fn echo(State(log): State<Log>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, usize::MAX).await.unwrap().to_vec();
    let status = parts
        .headers
        .get("x-reply-status")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u16>().ok())
        .and_then(|v| StatusCode::from_u16(v).ok())
        .unwrap_or(StatusCode::OK);

    log.lock().unwrap().push(Seen {
        method: parts.method,
        path_and_query: parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_default(),
        headers: parts.headers,
        body: body.clone(),
    });

    (
        status,
        [
            ("x-upstream", "echo"),
            ("set-cookie", "refreshToken=r1; HttpOnly; Path=/"),
        ],
        body,
    )
        .into_response()
}

async fn spawn_upstream() -> (String, Log) {
    let log = Log::default();
    let router = Router::new().fallback(echo).with_state(log.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}"), log)
}

fn front(origin: &str, policy: HeaderPolicy) -> Router {
    let proxy = Proxy::new(reqwest::Client::new(), origin, "api", policy);
    Router::new().nest("/api", proxy.router())
}

async fn send(router: Router, request: http::Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, headers, body)
}

#[tokio::test]
async fn forwards_every_method_with_path_and_query() {
    let (origin, log) = spawn_upstream().await;
    let router = front(&origin, HeaderPolicy::StripHostAndLength);

    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    for method in &methods {
        let request = http::Request::builder()
            .method(method.clone())
            .uri("/api/books/search?title=dune%20messiah&page=1&size=28")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(router.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
    }

    let seen = log.lock().unwrap();
    assert_eq!(seen.len(), methods.len());
    for (record, method) in seen.iter().zip(methods.iter()) {
        assert_eq!(&record.method, method);
        assert_eq!(
            record.path_and_query,
            "/api/books/search?title=dune%20messiah&page=1&size=28"
        );
    }
}

#[tokio::test]
async fn bare_prefix_maps_to_upstream_prefix_root() {
    let (origin, log) = spawn_upstream().await;
    let router = front(&origin, HeaderPolicy::StripHostAndLength);

    let request = http::Request::get("/api").body(Body::empty()).unwrap();
    send(router, request).await;

    assert_eq!(log.lock().unwrap()[0].path_and_query, "/api/");
}

#[tokio::test]
async fn host_and_content_length_are_not_forwarded() {
    let (origin, log) = spawn_upstream().await;
    let router = front(&origin, HeaderPolicy::StripHostAndLength);

    let request = http::Request::post("/api/auth/login")
        .header("host", "front.example")
        .header("content-length", "999")
        .header("content-type", "application/json")
        .header("authorization", "Bearer abc")
        .header("cookie", "refreshToken=r0")
        .body(Body::from(r#"{"id":"a","pw":"b"}"#))
        .unwrap();
    send(router, request).await;

    let seen = log.lock().unwrap();
    let headers = &seen[0].headers;
    let upstream_host = origin.trim_start_matches("http://");
    assert_eq!(headers.get("host").unwrap(), upstream_host);
    assert_eq!(headers.get("content-length").unwrap(), "19");
    assert_eq!(headers.get("content-type").unwrap(), "application/json");
    assert_eq!(headers.get("authorization").unwrap(), "Bearer abc");
    assert_eq!(headers.get("cookie").unwrap(), "refreshToken=r0");
}

#[tokio::test]
async fn get_and_head_send_no_body() {
    let (origin, log) = spawn_upstream().await;
    let router = front(&origin, HeaderPolicy::StripHostAndLength);

    for method in [Method::GET, Method::HEAD] {
        let request = http::Request::builder()
            .method(method)
            .uri("/api/books")
            .body(Body::from("should be dropped"))
            .unwrap();
        send(router.clone(), request).await;
    }

    let seen = log.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|record| record.body.is_empty()));
}

#[tokio::test]
async fn bodies_arrive_byte_identical() {
    let (origin, log) = spawn_upstream().await;
    let router = front(&origin, HeaderPolicy::StripHostAndLength);

    let json = br#"{"title":"Dune","categoryId":3}"#.to_vec();
    let binary: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let payloads = [Vec::new(), json, binary];

    for payload in &payloads {
        let request = http::Request::put("/api/books/update/7")
            .body(Body::from(payload.clone()))
            .unwrap();
        let (_, _, echoed) = send(router.clone(), request).await;
        assert_eq!(&echoed, payload);
    }

    let seen = log.lock().unwrap();
    for (record, payload) in seen.iter().zip(payloads.iter()) {
        assert_eq!(&record.body, payload);
    }
}

#[tokio::test]
async fn upstream_status_and_headers_are_relayed() {
    let (origin, _) = spawn_upstream().await;
    let router = front(&origin, HeaderPolicy::StripHostAndLength);

    let request = http::Request::get("/api/auth/user-info")
        .header("x-reply-status", "401")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(router.clone(), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers.get("x-upstream").unwrap(), "echo");
    assert_eq!(
        headers.get("set-cookie").unwrap(),
        "refreshToken=r1; HttpOnly; Path=/"
    );

    let request = http::Request::delete("/api/books/delete/3")
        .header("x-reply-status", "500")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(router, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn allow_list_limits_forwarded_headers() {
    let (origin, log) = spawn_upstream().await;
    let allowed = vec!["authorization".to_string()];
    let policy = HeaderPolicy::from_settings(Some(allowed.as_slice())).unwrap();
    let router = front(&origin, policy);

    let request = http::Request::get("/api/categories")
        .header("authorization", "Bearer abc")
        .header("cookie", "refreshToken=r0")
        .body(Body::empty())
        .unwrap();
    send(router, request).await;

    let seen = log.lock().unwrap();
    assert_eq!(seen[0].headers.get("authorization").unwrap(), "Bearer abc");
    assert!(seen[0].headers.get("cookie").is_none());
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let router = front(&origin, HeaderPolicy::StripHostAndLength);

    let request = http::Request::get("/api/books").body(Body::empty()).unwrap();
    let (status, _, body) = send(router, request).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"]["code"], "upstream_unavailable");
}

struct ApiProxy(Proxy);

#[async_trait]
impl Module for ApiProxy {
    fn name(&self) -> &'static str {
        "proxy"
    }

    fn mount_path(&self) -> String {
        format!("/{}", self.0.prefix())
    }

    fn routes(&self) -> Router {
        self.0.router()
    }
}

fn server_router(origin: &str) -> Router {
    let proxy = Proxy::from_settings(&ProxySettings {
        upstream_origin: origin.to_string(),
        ..ProxySettings::default()
    })
    .unwrap();
    let mut registry = ModuleRegistry::new();
    registry.register(Arc::new(ApiProxy(proxy)));
    bookshelf_http::build_router(&registry, &Settings::default())
}

#[tokio::test]
async fn server_router_mounts_proxy_and_health_check() {
    let (origin, log) = spawn_upstream().await;
    let router = server_router(&origin);

    let (status, headers, body) = send(
        router.clone(),
        http::Request::get("/healthz").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
    assert!(headers.get("x-request-id").is_some());

    let (status, _, _) = send(
        router,
        http::Request::get("/api/books?page=0&size=12")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(log.lock().unwrap()[0].path_and_query, "/api/books?page=0&size=12");
}

#[tokio::test]
async fn server_router_adds_no_headers_upstream() {
    let (origin, log) = spawn_upstream().await;
    let router = server_router(&origin);

    send(
        router,
        http::Request::get("/api/books")
            .header("accept", "application/json")
            .header("authorization", "Bearer t1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    let seen = log.lock().unwrap()[0].headers.clone();
    assert!(seen.get("x-request-id").is_none());
    let mut names: Vec<&str> = seen.keys().map(|name| name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["accept", "authorization", "host"]);
}

#[tokio::test]
async fn server_router_relays_exactly_the_upstream_headers() {
    let (origin, _log) = spawn_upstream().await;
    let router = server_router(&origin);

    let direct = reqwest::get(format!("{origin}/api/books")).await.unwrap();
    let expected = direct.headers().clone();

    let (_, relayed, _) = send(
        router,
        http::Request::get("/api/books").body(Body::empty()).unwrap(),
    )
    .await;

    assert!(relayed.get("x-request-id").is_none());
    let mut relayed_names: Vec<&str> = relayed.keys().map(|name| name.as_str()).collect();
    let mut expected_names: Vec<&str> = expected.keys().map(|name| name.as_str()).collect();
    relayed_names.sort_unstable();
    expected_names.sort_unstable();
    assert_eq!(relayed_names, expected_names);
    for (name, value) in &expected {
        if *name != http::header::DATE {
            assert_eq!(relayed.get(name), Some(value), "header {name}");
        }
    }
}
