// Test-only HTTP fixture: serves fixed bodies on 127.0.0.1.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

type Routes = Arc<HashMap<String, (StatusCode, Vec<u8>)>>;

pub struct StaticServer {
    base: String,
    task: JoinHandle<()>,
}

impl StaticServer {
    /// Serve `(path, status, body)` routes; anything else is a 404.
    pub async fn start(routes: Vec<(&str, u16, Vec<u8>)>) -> Self {
        let routes: Routes = Arc::new(
            routes
                .into_iter()
                .map(|(path, status, body)| {
                    (path.to_string(), (StatusCode::from_u16(status).unwrap(), body))
                })
                .collect(),
        );
        let app = Router::new().fallback(serve_fixed).with_state(routes);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { base, task }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

async fn serve_fixed(State(routes): State<Routes>, uri: Uri) -> (StatusCode, Vec<u8>) {
    routes
        .get(uri.path())
        .cloned()
        .unwrap_or((StatusCode::NOT_FOUND, b"not found".to_vec()))
}

impl Drop for StaticServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Client that never routes loopback traffic through an ambient proxy.
pub fn local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
