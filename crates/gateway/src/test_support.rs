//! テスト用のモックと状態構築ヘルパー。

use std::sync::Arc;

use axum::http::StatusCode;
use axum::Json;
use tokio::sync::Mutex;

use crate::config::{GatewayConfig, GatewayState};
use crate::error::GatewayError;
use crate::storage::BlobStore;

/// テスト用の読み書きトークン
pub const TEST_RW_TOKEN: &str = "vercel_blob_rw_teststore_secret";

/// 削除要求を記録するモックBlobStore。
#[derive(Clone, Default)]
pub struct MockBlobStore {
    deleted: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl MockBlobStore {
    /// 常に削除に失敗するモック
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// 削除要求されたURL（失敗したものを含む）
    pub async fn deleted(&self) -> Vec<String> {
        self.deleted.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl BlobStore for MockBlobStore {
    async fn delete(&self, url: &str) -> Result<(), GatewayError> {
        self.deleted.lock().await.push(url.to_string());
        if self.fail {
            return Err(GatewayError::Storage("mock delete failure".to_string()));
        }
        Ok(())
    }
}

/// テスト用GatewayStateを構築する。
pub fn test_state(backend_url: &str, store: MockBlobStore) -> GatewayState {
    let mut config = GatewayConfig::from_lookup(|key| match key {
        "BLOB_READ_WRITE_TOKEN" => Some(TEST_RW_TOKEN.to_string()),
        _ => None,
    })
    .unwrap();
    config.backend_url = backend_url.to_string();

    GatewayState {
        config,
        http_client: reqwest::Client::new(),
        blob_store: Box::new(store),
    }
}

/// モックHTTPサーバーを起動し、ベースURLを返す。
pub async fn spawn_mock(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    format!("http://127.0.0.1:{port}")
}

/// 指定ステータスを返すモック処理バックエンドを起動する。
/// 受信した `/backend/upload-from-url` の本文を記録する。
pub async fn spawn_backend(status: StatusCode) -> (String, Arc<Mutex<Vec<serde_json::Value>>>) {
    let received: Arc<Mutex<Vec<serde_json::Value>>> = Arc::default();
    let recorder = received.clone();
    let mock_backend = axum::Router::new().route(
        "/backend/upload-from-url",
        axum::routing::post(move |Json(body): Json<serde_json::Value>| {
            let recorder = recorder.clone();
            async move {
                recorder.lock().await.push(body);
                status
            }
        }),
    );
    (spawn_mock(mock_backend).await, received)
}
