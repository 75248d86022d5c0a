//! Shared utilities for integration testing: a programmable JSON-RPC node.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

type Handler = dyn Fn(&Value) -> (u16, Value) + Send + Sync;

struct NodeState {
    handler: Box<Handler>,
    requests: Mutex<Vec<Value>>,
}

/// Handle to a running mock node.
pub struct MockNode {
    pub addr: SocketAddr,
    state: Arc<NodeState>,
}

impl MockNode {
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Methods received so far, in arrival order.
    #[allow(dead_code)]
    pub fn methods(&self) -> Vec<String> {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r["method"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

async fn rpc(State(state): State<Arc<NodeState>>, Json(request): Json<Value>) -> (StatusCode, Json<Value>) {
    state.requests.lock().unwrap().push(request.clone());
    let (status, body) = (state.handler)(&request);
    (StatusCode::from_u16(status).unwrap_or(StatusCode::OK), Json(body))
}

/// Start a node on an ephemeral port. The handler returns an HTTP status and
/// the full response document.
pub async fn start_mock_node<F>(handler: F) -> MockNode
where
    F: Fn(&Value) -> (u16, Value) + Send + Sync + 'static,
{
    let state = Arc::new(NodeState {
        handler: Box::new(handler),
        requests: Mutex::new(Vec::new()),
    });
    let app = Router::new().route("/", post(rpc)).with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockNode { addr, state }
}

/// Success document echoing the request id.
pub fn result(request: &Value, result: Value) -> (u16, Value) {
    (200, json!({"jsonrpc": "2.0", "id": request["id"], "result": result}))
}

/// Error document echoing the request id.
#[allow(dead_code)]
pub fn error(request: &Value, code: i64, message: &str) -> (u16, Value) {
    (
        200,
        json!({"jsonrpc": "2.0", "id": request["id"], "error": {"code": code, "message": message}}),
    )
}
