//! # Upblob Gateway
//!
//! ブラウザからストレージプロバイダへの直接アップロードを仲介するGateway。
//! プラットフォームのリクエストサイズ上限を回避するため、ファイル本体はGatewayを経由しない。
//!
//! ## 役割
//! - 短命なクライアントトークンの発行（許可MIMEタイプの制限付き）
//! - アップロード完了通知の受付
//! - 処理バックエンドへのBlob URL引き渡し
//! - 引き渡し後の一時Blobの削除
//!
//! ## API エンドポイント
//! - `POST /api/upload-blob` — トークン発行・完了通知
//! - `GET /healthz` — 死活監視

mod backend;
mod config;
mod endpoints;
mod error;
mod hooks;
mod protocol;
mod storage;
#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use config::{GatewayConfig, GatewayState};
use endpoints::{handle_healthz, handle_upload_blob};
use storage::VercelBlobStore;

/// 1リクエストあたりの処理時間上限（大きなアップロードの完了処理を考慮）
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// ルーティングを構築する。
fn router(state: Arc<GatewayState>) -> axum::Router {
    axum::Router::new()
        .route("/api/upload-blob", axum::routing::post(handle_upload_blob))
        .route("/healthz", axum::routing::get(handle_healthz))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = GatewayConfig::from_env()?;
    tracing::info!(
        backend_url = %config.backend_url,
        blob_api_url = %config.blob_api_url,
        token_ttl_secs = config.token_ttl_secs,
        retain_blob_on_failure = config.retain_blob_on_failure,
        "Gateway設定を読み込みました"
    );
    if config.callback_url.is_none() {
        tracing::warn!("UPLOAD_CALLBACK_URLが未設定です。クライアント指定の通知先のみ使用します");
    }

    let http_client = reqwest::Client::new();
    let blob_store = VercelBlobStore::new(
        http_client.clone(),
        &config.blob_api_url,
        &config.read_write_token,
    );

    let addr = config.listen_addr.clone();
    let state = Arc::new(GatewayState {
        config,
        http_client,
        blob_store: Box::new(blob_store),
    });

    let app = router(state);

    tracing::info!("Gatewayを {} で起動します", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
