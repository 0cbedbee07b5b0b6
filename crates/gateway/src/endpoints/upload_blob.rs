//! # POST /api/upload-blob
//!
//! ブラウザ直送アップロード用のクライアントトークン発行と、
//! ストレージプロバイダからのアップロード完了通知の受付。

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use upblob_types::HandleUploadResponse;

use crate::config::GatewayState;
use crate::error::GatewayError;
use crate::hooks::DocumentUploadHooks;
use crate::protocol::handle_upload;

/// POST /api/upload-blob — トークン発行・完了通知。
///
/// 本文は独自にパースし、パース失敗を含む全てのエラーを HTTP 500 で返す。
pub async fn handle_upload_blob(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<HandleUploadResponse>, GatewayError> {
    let hooks = DocumentUploadHooks::new(&state);

    match handle_upload(&state.config, &headers, &body, &hooks).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::error!(error = %e, "アップロード処理に失敗しました");
            Err(e)
        }
    }
}
