//! # クライアントアップロードプロトコル
//!
//! リクエスト本文の `type` に応じてトークン発行と完了通知を振り分け、
//! それぞれの呼び出し点でフックを実行する。
//!
//! - `blob.generate-client-token`: フックの返すトークン設定を読み書きトークンで署名し、
//!   クライアントトークンとして返す
//! - `blob.upload-completed`: `x-vercel-signature` ヘッダの署名を検証してからフックを実行する

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;
use upblob_types::{
    ClientTokenPayload, GenerateClientTokenPayload, HandleUploadBody, HandleUploadResponse,
    OnUploadCompleted,
};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::hooks::UploadHooks;

/// 完了通知の署名ヘッダ
pub const SIGNATURE_HEADER: &str = "x-vercel-signature";

/// プロトコルリクエストを処理する。
pub async fn handle_upload<H>(
    config: &GatewayConfig,
    headers: &HeaderMap,
    body: &[u8],
    hooks: &H,
) -> Result<HandleUploadResponse, GatewayError>
where
    H: UploadHooks + ?Sized,
{
    let request: HandleUploadBody = serde_json::from_slice(body)
        .map_err(|e| GatewayError::BadRequest(format!("リクエスト本文のパースに失敗: {e}")))?;

    match request {
        HandleUploadBody::GenerateClientToken(payload) => {
            let client_token = generate_client_token(config, &payload, hooks).await?;
            Ok(HandleUploadResponse::GenerateClientToken { client_token })
        }
        HandleUploadBody::UploadCompleted(payload) => {
            let signature = headers
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    GatewayError::InvalidSignature("完了通知に署名ヘッダがありません".to_string())
                })?;
            upblob_crypto::verify_signature(&config.read_write_token, body, signature)?;

            let report = hooks.on_upload_completed(payload).await;
            report.log();

            Ok(HandleUploadResponse::UploadCompleted {
                response: "ok".to_string(),
            })
        }
    }
}

async fn generate_client_token<H>(
    config: &GatewayConfig,
    payload: &GenerateClientTokenPayload,
    hooks: &H,
) -> Result<String, GatewayError>
where
    H: UploadHooks + ?Sized,
{
    if payload.pathname.trim().is_empty() {
        return Err(GatewayError::BadRequest("pathname は必須です".to_string()));
    }

    let options = hooks.on_before_generate_token(payload).await?;

    let on_upload_completed = match payload
        .callback_url
        .clone()
        .or_else(|| config.callback_url.clone())
    {
        Some(callback_url) => Some(OnUploadCompleted {
            callback_url,
            token_payload: options.token_payload,
        }),
        None => {
            tracing::warn!(
                pathname = %payload.pathname,
                "完了通知先URLが無いため完了フックは実行されません"
            );
            None
        }
    };

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| GatewayError::Internal(format!("時刻取得失敗: {e}")))?
        .as_millis() as u64;
    let valid_until = config
        .token_ttl_secs
        .checked_mul(1000)
        .and_then(|ttl_ms| now_ms.checked_add(ttl_ms))
        .ok_or_else(|| {
            GatewayError::Internal(format!(
                "トークン有効期限の計算に失敗: ttl={}秒",
                config.token_ttl_secs
            ))
        })?;

    let token_payload = ClientTokenPayload {
        pathname: payload.pathname.clone(),
        allowed_content_types: options.allowed_content_types,
        valid_until,
        maximum_size_in_bytes: options.maximum_size_in_bytes,
        add_random_suffix: options.add_random_suffix,
        on_upload_completed,
    };

    let client_token =
        upblob_crypto::generate_client_token(&config.read_write_token, &token_payload)?;
    tracing::info!(
        pathname = %payload.pathname,
        multipart = payload.multipart,
        "クライアントトークンを発行しました"
    );

    Ok(client_token)
}
