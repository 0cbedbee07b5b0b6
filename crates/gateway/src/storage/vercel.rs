//! # ストレージプロバイダ HTTP API 実装
//!
//! プロバイダの `POST /delete` APIを読み書きトークンで呼び出す BlobStore 実装。

use upblob_types::DeleteBlobRequest;

use super::BlobStore;
use crate::error::GatewayError;

/// プロバイダAPIのバージョンヘッダ
const API_VERSION_HEADER: &str = "x-api-version";
/// 送信するAPIバージョン
const API_VERSION: &str = "7";

/// プロバイダHTTP APIによるBlobStore実装。
pub struct VercelBlobStore {
    http_client: reqwest::Client,
    /// APIのベースURL（末尾スラッシュなし）
    api_url: String,
    /// 読み書きトークン（Bearer認証に使用）
    read_write_token: String,
}

impl VercelBlobStore {
    pub fn new(http_client: reqwest::Client, api_url: &str, read_write_token: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            read_write_token: read_write_token.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl BlobStore for VercelBlobStore {
    async fn delete(&self, url: &str) -> Result<(), GatewayError> {
        let response = self
            .http_client
            .post(format!("{}/delete", self.api_url))
            .bearer_auth(&self.read_write_token)
            .header(API_VERSION_HEADER, API_VERSION)
            .json(&DeleteBlobRequest {
                urls: vec![url.to_string()],
            })
            .send()
            .await
            .map_err(|e| GatewayError::Storage(format!("Blob削除リクエスト送信失敗: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Storage(format!(
                "Blob削除に失敗しました: HTTP {status} - {body}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::Json;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// モックプロバイダAPIを起動し、削除リクエストの形式を確認
    #[tokio::test]
    async fn test_delete_request_shape() {
        let seen: Arc<Mutex<Vec<(Option<String>, Option<String>, serde_json::Value)>>> =
            Arc::default();
        let recorder = seen.clone();
        let mock_api = axum::Router::new().route(
            "/delete",
            axum::routing::post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let recorder = recorder.clone();
                async move {
                    let header = |name: &str| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string)
                    };
                    recorder
                        .lock()
                        .await
                        .push((header("authorization"), header("x-api-version"), body));
                    StatusCode::OK
                }
            }),
        );
        let base_url = crate::test_support::spawn_mock(mock_api).await;

        let store = VercelBlobStore::new(reqwest::Client::new(), &base_url, "vercel_blob_rw_s1_x");
        store
            .delete("https://blob.example/notes-abc123.md")
            .await
            .unwrap();

        let seen = seen.lock().await;
        assert_eq!(seen.len(), 1);
        let (authorization, api_version, body) = &seen[0];
        assert_eq!(authorization.as_deref(), Some("Bearer vercel_blob_rw_s1_x"));
        assert_eq!(api_version.as_deref(), Some(API_VERSION));
        assert_eq!(
            body,
            &serde_json::json!({ "urls": ["https://blob.example/notes-abc123.md"] })
        );
    }

    /// プロバイダがエラーを返した場合にStorageエラーになることを確認
    #[tokio::test]
    async fn test_delete_error_status() {
        let mock_api = axum::Router::new().route(
            "/delete",
            axum::routing::post(|| async { (StatusCode::FORBIDDEN, "denied") }),
        );
        let base_url = crate::test_support::spawn_mock(mock_api).await;

        let store = VercelBlobStore::new(reqwest::Client::new(), &base_url, "vercel_blob_rw_s1_x");
        let result = store.delete("https://blob.example/a.pdf").await;
        assert!(matches!(result, Err(GatewayError::Storage(_))));
    }
}
