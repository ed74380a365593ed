//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use fsroute::config::AppConfig;
use fsroute::dispatch::DispatcherBuilder;
use fsroute::routing::MemorySource;
use fsroute::{Dispatcher, HttpServer, RouteModule, RouteRegistry, Shutdown};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Builder over an in-memory routes tree holding one file per module.
pub fn builder(routes: Vec<(&str, RouteModule)>) -> DispatcherBuilder {
    let source = MemorySource::new(routes.iter().map(|(file, _)| *file));
    let registry = routes
        .into_iter()
        .fold(RouteRegistry::new(), |registry, (file, module)| registry.with(file, module));
    Dispatcher::builder().source(source).registry(registry)
}

pub fn dispatcher(routes: Vec<(&str, RouteModule)>) -> Dispatcher {
    builder(routes).build().unwrap()
}

pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

pub fn json_request(method: Method, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Collected response parts.
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Reply {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub async fn send(dispatcher: &Dispatcher, request: Request<Body>) -> Reply {
    let response = dispatcher.handle(request, None).await;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    Reply {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

/// Serve `dispatcher` on an ephemeral local port.
pub async fn spawn_server(dispatcher: Dispatcher) -> (SocketAddr, Shutdown, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(AppConfig::default(), dispatcher);
    let stop = shutdown.clone();
    let handle = tokio::spawn(async move {
        server.run(listener, &stop).await.unwrap();
    });
    (addr, shutdown, handle)
}
