//! # Gateway エラー型
//!
//! /api/upload-blob で捕捉されたエラーは種別に関わらず HTTP 500 と
//! `{"error": <message>}` で返す。

use axum::http::StatusCode;
use axum::Json;
use upblob_types::ErrorResponse;

/// メッセージが空の場合に返す既定のエラーメッセージ
pub const FALLBACK_ERROR_MESSAGE: &str = "Upload failed";

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 不正なリクエスト（本文のパース失敗、パス名の欠落等）
    #[error("{0}")]
    BadRequest(String),
    /// 完了通知の署名が不正
    #[error("{0}")]
    InvalidSignature(String),
    /// クライアントトークンの発行に失敗
    #[error("{0}")]
    Token(String),
    /// ストレージ操作に失敗
    #[error("{0}")]
    Storage(String),
    /// 内部エラー
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    /// レスポンスに載せるメッセージ。空の場合は既定メッセージを返す。
    pub fn message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            FALLBACK_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }
}

impl From<upblob_crypto::CryptoError> for GatewayError {
    fn from(e: upblob_crypto::CryptoError) -> Self {
        match e {
            upblob_crypto::CryptoError::SignatureVerifyError => {
                GatewayError::InvalidSignature(e.to_string())
            }
            other => GatewayError::Token(other.to_string()),
        }
    }
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorResponse {
            error: self.message(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
