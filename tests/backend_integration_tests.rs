//! Integration Tests against an HTTP backend
//!
//! Runs the reqwest transport and the resource caches against an in-process
//! axum backend that serves the three collections and counts requests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use reqwest::Method;
use resource_cache::models::RequestOptions;
use resource_cache::{
    AuthenticatedRequest, CacheRegistry, CacheStatus, Config, FetchError, ReqwestTransport,
    ResourceConfig,
};
use serde_json::{json, Value};

const TOKEN: &str = "test-token";

// == Mock Backend ==

#[derive(Clone, Default)]
struct Backend {
    clientes_hits: Arc<AtomicUsize>,
    clientes_writes: Arc<AtomicUsize>,
    productos_hits: Arc<AtomicUsize>,
    usuarios_hits: Arc<AtomicUsize>,
    fail_productos: Arc<AtomicBool>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v == format!("Bearer {}", TOKEN))
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Las credenciales de autenticación no se proveyeron."})),
    )
}

async fn clientes(State(backend): State<Backend>, headers: HeaderMap) -> impl IntoResponse {
    backend.clientes_hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!([
            {"cedula": "1001", "nombre": "Ana", "telefono": "300"},
            {"cedula": "1002", "nombre": "Luis", "telefono": "301"}
        ])),
    )
}

async fn create_cliente(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(cliente): Json<Value>,
) -> impl IntoResponse {
    backend.clientes_writes.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized();
    }
    (StatusCode::CREATED, Json(cliente))
}

async fn productos(State(backend): State<Backend>, headers: HeaderMap) -> impl IntoResponse {
    backend.productos_hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized();
    }
    // Slow enough for overlapping reads to land on the same request
    tokio::time::sleep(Duration::from_millis(100)).await;
    if backend.fail_productos.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "Error interno"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!([
            {"id": 1, "nombre": "Arroz", "precio": 3500},
            {"id": 2, "nombre": "Café", "precio": 12000},
            {"id": 3, "nombre": "Panela", "precio": 2500}
        ])),
    )
}

async fn usuarios(State(backend): State<Backend>, headers: HeaderMap) -> impl IntoResponse {
    backend.usuarios_hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!([{"id": "6f1c", "username": "admin", "role": "admin"}])),
    )
}

async fn paginated() -> Json<Value> {
    Json(json!({"count": 0, "results": []}))
}

async fn spawn_backend() -> (String, Backend) {
    let backend = Backend::default();
    let app = Router::new()
        .route("/api/clientes/", get(clientes).post(create_cliente))
        .route("/api/productos/", get(productos))
        .route("/api/usuarios/", get(usuarios))
        .route("/api/paginado/", get(paginated))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/api", addr), backend)
}

fn registry(base_url: &str, token: Option<&str>) -> CacheRegistry {
    let config = Config {
        api_base_url: base_url.to_string(),
        access_token: token.map(String::from),
        ..Config::default()
    };
    CacheRegistry::from_config(&config).unwrap()
}

// == Loading ==

#[tokio::test]
async fn test_loads_every_resource() {
    let (base, backend) = spawn_backend().await;
    let registry = registry(&base, Some(TOKEN));

    let clientes = registry.clientes().load().await;
    let productos = registry.productos().load().await;
    let usuarios = registry.usuarios().load().await;

    assert_eq!(clientes.data.len(), 2);
    assert_eq!(clientes.data[0]["cedula"], "1001");
    assert_eq!(productos.data.len(), 3);
    assert_eq!(usuarios.data[0]["username"], "admin");
    assert!(clientes.error.is_none());
    assert!(clientes.last_fetch.is_some());
    assert_eq!(backend.clientes_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_repeat_mount_is_served_from_cache() {
    let (base, backend) = spawn_backend().await;
    let registry = registry(&base, Some(TOKEN));

    registry.clientes().load().await;
    let view = registry.clientes().access();

    assert!(view.is_from_cache);
    assert_eq!(view.data.len(), 2);
    assert_eq!(view.status, CacheStatus::Fresh);
    assert_eq!(backend.clientes_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_mounts_share_one_request() {
    let (base, backend) = spawn_backend().await;
    let registry = registry(&base, Some(TOKEN));
    let first = registry.productos();
    let second = registry.productos();

    first.access();
    second.access();
    let (a, b) = tokio::join!(first.settled(), second.settled());

    assert_eq!(a, b);
    assert_eq!(backend.productos_hits.load(Ordering::SeqCst), 1);
    assert_eq!(second.data().len(), 3);
}

#[tokio::test]
async fn test_refresh_always_hits_backend() {
    let (base, backend) = spawn_backend().await;
    let registry = registry(&base, Some(TOKEN));
    let usuarios = registry.usuarios();

    usuarios.refresh().await.unwrap();
    usuarios.refresh().await.unwrap();

    assert_eq!(backend.usuarios_hits.load(Ordering::SeqCst), 2);
    assert!(!usuarios.is_from_cache());
}

// == Failures ==

#[tokio::test]
async fn test_missing_token_reports_detail() {
    let (base, _backend) = spawn_backend().await;
    let registry = registry(&base, None);
    let clientes = registry.clientes();

    let err = clientes.refresh().await.unwrap_err();

    assert_eq!(
        err,
        FetchError::Http {
            status: 401,
            detail: Some("Las credenciales de autenticación no se proveyeron.".to_string())
        }
    );
    assert_eq!(clientes.error(), Some(err));
    assert!(clientes.data().is_empty());
}

#[tokio::test]
async fn test_server_error_keeps_last_known_data() {
    let (base, backend) = spawn_backend().await;
    let registry = registry(&base, Some(TOKEN));
    let productos = registry.productos();
    productos.refresh().await.unwrap();

    backend.fail_productos.store(true, Ordering::SeqCst);
    let err = productos.refresh().await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    let view = productos.view();
    assert_eq!(view.data.len(), 3);
    assert!(!view.loading);
    assert_eq!(view.error_message().as_deref(), Some("HTTP error 500: Error interno"));

    backend.fail_productos.store(false, Ordering::SeqCst);
    productos.refresh().await.unwrap();
    assert!(productos.error().is_none());
}

#[tokio::test]
async fn test_non_collection_body_is_parse_error() {
    let (base, _backend) = spawn_backend().await;
    let registry = registry(&base, Some(TOKEN));
    let paginado = registry.resource(ResourceConfig::new("paginado", "/paginado/"));

    let result = paginado.refresh().await;

    assert!(matches!(result, Err(FetchError::Parse(_))));
    assert_eq!(paginado.view().status, CacheStatus::Error);
}

#[tokio::test]
async fn test_unknown_route_is_http_error() {
    let (base, _backend) = spawn_backend().await;
    let registry = registry(&base, Some(TOKEN));
    let ventas = registry.resource(ResourceConfig::new("ventas", "/ventas/"));

    let err = ventas.refresh().await.unwrap_err();

    assert_eq!(err.status(), Some(404));
}

// == Optimistic Mutations ==

#[tokio::test]
async fn test_mutations_do_not_refetch() {
    let (base, backend) = spawn_backend().await;
    let registry = registry(&base, Some(TOKEN));
    let clientes = registry.clientes();
    clientes.load().await;

    clientes.add_item(json!({"cedula": "1003", "nombre": "Marta"}));
    clientes.update_item(json!({"cedula": "1001", "nombre": "Ana María"}), None);
    clientes.remove_item(&json!("1002"), Some("cedula"));

    let view = registry.clientes().access();
    assert!(view.is_from_cache);
    assert_eq!(
        view.data.iter().map(|c| c["nombre"].clone()).collect::<Vec<_>>(),
        vec![json!("Ana María"), json!("Marta")]
    );
    assert_eq!(backend.clientes_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_server_write_then_local_add() {
    let (base, backend) = spawn_backend().await;
    let registry = registry(&base, Some(TOKEN));
    let clientes = registry.clientes();
    clientes.load().await;

    let transport = ReqwestTransport::new(base.as_str(), Duration::from_secs(5)).unwrap();
    transport.set_token(TOKEN);
    let nuevo = json!({"cedula": "1003", "nombre": "Marta", "telefono": "302"});
    let response = transport
        .request("/clientes/", RequestOptions::with_body(Method::POST, nuevo.clone()))
        .await
        .unwrap();
    assert_eq!(response.status, 201);

    clientes.add_item(response.json().unwrap());

    assert_eq!(clientes.data().len(), 3);
    assert_eq!(clientes.data()[2], nuevo);
    assert_eq!(backend.clientes_writes.load(Ordering::SeqCst), 1);
    assert_eq!(backend.clientes_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reset_forces_next_mount_to_fetch() {
    let (base, backend) = spawn_backend().await;
    let registry = registry(&base, Some(TOKEN));
    registry.usuarios().load().await;

    registry.reset();
    let view = registry.usuarios().load().await;

    assert!(!view.is_from_cache);
    assert_eq!(view.data.len(), 1);
    assert_eq!(backend.usuarios_hits.load(Ordering::SeqCst), 2);
}
