//! Shared harness: runs the full application on an ephemeral port.

#![allow(dead_code, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderName;
use registry_gateway::api;
use registry_gateway::app_state::AppState;
use registry_gateway::domain::{
    EventBus, MemoryRegistry, Namespace, NamespaceResolver, RegistryBackend,
};
use registry_gateway::service::{RegistryOptions, RegistryService};

pub const HEADER: &str = "micro-namespace";

pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: Arc<MemoryRegistry>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{path}", self.addr)
    }
}

pub fn ns(s: &str) -> Namespace {
    let Ok(ns) = Namespace::parse(s) else {
        panic!("valid namespace {s}");
    };
    ns
}

pub async fn spawn_server() -> TestServer {
    let registry = Arc::new(MemoryRegistry::new());
    let event_bus = EventBus::new(64);
    let registry_service = Arc::new(RegistryService::new(
        Arc::clone(&registry) as Arc<dyn RegistryBackend>,
        Arc::new(event_bus.clone()),
        NamespaceResolver::new(ns("go.micro")),
        RegistryOptions::default(),
    ));
    let state = AppState {
        registry_service,
        event_bus,
        namespace_header: HeaderName::from_static("micro-namespace"),
    };

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind test listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, api::build_app(state)).await;
    });

    TestServer { addr, registry }
}
