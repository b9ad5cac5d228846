//! Local stand-ins for Google REST endpoints

use axum::Router;
use tokio::net::TcpListener;

pub const TEST_RSA_KEY: &str = include_str!("../testdata/test_rsa_key.pem");

/// Serve a router on an ephemeral port and return its base URL
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Service-account key JSON pointing its token exchange at `token_uri`
pub fn service_account_json(token_uri: &str) -> String {
    serde_json::json!({
        "type": "service_account",
        "project_id": "acep-ingest",
        "private_key_id": "key-1",
        "private_key": TEST_RSA_KEY,
        "client_email": "loader@acep-ingest.iam.gserviceaccount.com",
        "client_id": "1234567890",
        "token_uri": token_uri,
    })
    .to_string()
}
