use std::time::Duration;

use bookscout_client::ReqwestBackend;
use serde_json::json;
use wiremock::MockServer;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Start a mock backend and a client pointed at nothing in particular;
/// the base URL is passed per call.
pub async fn setup() -> (MockServer, ReqwestBackend) {
    let server = MockServer::start().await;
    let backend = ReqwestBackend::new().expect("client builds");
    (server, backend)
}

pub fn book(title: &str, author: &str) -> serde_json::Value {
    json!({
        "标题": title,
        "作者": author,
        "现价": "¥23.00",
        "封面图": "https://img.example.com/cover.jpg",
    })
}

/// A local URL where nothing is listening.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}
