//! Local HTTP server standing in for the external colorization service

use axum::Router;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral localhost port and return its base URL
pub async fn spawn_mock_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("mock server address");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server");
    });

    format!("http://{}", addr)
}
