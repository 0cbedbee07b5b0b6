//! # アップロードフック
//!
//! クライアントアップロードプロトコルの2つの呼び出し点で実行される処理。
//!
//! - トークン発行前: 許可MIMEタイプと返却ペイロードを決定する
//! - アップロード完了時: 処理バックエンドへ通知し、一時Blobを削除する
//!
//! 完了時の失敗は呼び出し元へ伝播させず、`CompletionReport` として返す。

use upblob_types::{
    GenerateClientTokenPayload, UploadCompletedPayload, UploadFromUrlRequest, UploadTokenPayload,
};

use crate::backend::notify_upload_from_url;
use crate::config::GatewayState;
use crate::error::GatewayError;

/// トークン発行前フックが返すトークン設定。
#[derive(Debug, Clone, Default)]
pub struct TokenOptions {
    /// 許可するMIMEタイプ
    pub allowed_content_types: Vec<String>,
    /// 完了時にそのまま返却されるペイロード
    pub token_payload: Option<String>,
    /// 最大サイズ（バイト）
    pub maximum_size_in_bytes: Option<u64>,
    /// パス名にランダムサフィックスを付与するか
    pub add_random_suffix: Option<bool>,
}

/// アップロード完了処理で発生した失敗。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionFailure {
    /// トークンペイロードがJSONとして解釈できない（Blobのパス名で代替）
    #[error("トークンペイロードのパースに失敗: {0}")]
    PayloadUnparsable(String),
    /// 処理バックエンドに到達できない
    #[error("処理バックエンドに到達できません: {0}")]
    BackendUnreachable(String),
    /// 処理バックエンドが2xx以外を返した
    #[error("処理バックエンドがエラーを返しました: HTTP {0}")]
    BackendRejected(u16),
    /// 一時Blobの削除に失敗
    #[error("一時Blobの削除に失敗: {0}")]
    DeleteFailed(String),
}

/// アップロード完了処理の結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    /// 対象BlobのURL
    pub blob_url: String,
    /// バックエンドへ渡したファイル名
    pub filename: String,
    /// 一時Blobを削除したか
    pub deleted: bool,
    /// 発生した失敗（発生順）
    pub failures: Vec<CompletionFailure>,
}

impl CompletionReport {
    /// 失敗なく完了したか
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// 結果をログに出力する。結果はこの後破棄される。
    pub fn log(&self) {
        for failure in &self.failures {
            tracing::error!(
                blob_url = %self.blob_url,
                filename = %self.filename,
                deleted = self.deleted,
                error = %failure,
                "アップロード完了処理でエラーが発生しました"
            );
        }
        if self.is_success() {
            tracing::info!(
                blob_url = %self.blob_url,
                filename = %self.filename,
                "アップロード完了処理が完了しました"
            );
        }
    }
}

/// プロトコルの2つの呼び出し点で実行されるフック。
#[async_trait::async_trait]
pub trait UploadHooks: Send + Sync {
    /// トークン発行前に呼ばれる。エラーを返すとトークンは発行されない。
    async fn on_before_generate_token(
        &self,
        request: &GenerateClientTokenPayload,
    ) -> Result<TokenOptions, GatewayError>;

    /// アップロード完了時に呼ばれる。失敗は戻り値で表し、伝播させない。
    async fn on_upload_completed(&self, event: UploadCompletedPayload) -> CompletionReport;
}

/// 文書アップロード用フック。
pub struct DocumentUploadHooks<'a> {
    state: &'a GatewayState,
}

impl<'a> DocumentUploadHooks<'a> {
    pub fn new(state: &'a GatewayState) -> Self {
        Self { state }
    }
}

/// トークンペイロードからファイル名を取り出す。
///
/// ペイロードが無い・`pathname` が無い場合は `Ok(None)`、
/// JSONとして解釈できない場合はエラーを返す。
fn pathname_from_token_payload(
    token_payload: Option<&str>,
) -> Result<Option<String>, CompletionFailure> {
    let Some(raw) = token_payload.filter(|raw| !raw.trim().is_empty()) else {
        return Ok(None);
    };
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| CompletionFailure::PayloadUnparsable(e.to_string()))?;
    Ok(value
        .get("pathname")
        .and_then(|v| v.as_str())
        .filter(|pathname| !pathname.is_empty())
        .map(str::to_string))
}

#[async_trait::async_trait]
impl<'a> UploadHooks for DocumentUploadHooks<'a> {
    async fn on_before_generate_token(
        &self,
        request: &GenerateClientTokenPayload,
    ) -> Result<TokenOptions, GatewayError> {
        let token_payload = serde_json::to_string(&UploadTokenPayload {
            pathname: request.pathname.clone(),
        })
        .map_err(|e| GatewayError::Internal(format!("トークンペイロードのシリアライズに失敗: {e}")))?;

        Ok(TokenOptions {
            allowed_content_types: self.state.config.allowed_content_types.clone(),
            token_payload: Some(token_payload),
            maximum_size_in_bytes: self.state.config.max_upload_bytes,
            add_random_suffix: self.state.config.add_random_suffix,
        })
    }

    async fn on_upload_completed(&self, event: UploadCompletedPayload) -> CompletionReport {
        let config = &self.state.config;
        let blob = event.blob;
        tracing::info!(blob_url = %blob.url, "アップロード完了通知を受信");

        let mut failures = Vec::new();
        let filename = match pathname_from_token_payload(event.token_payload.as_deref()) {
            Ok(Some(pathname)) => pathname,
            Ok(None) => blob.pathname.clone(),
            Err(failure) => {
                tracing::warn!(
                    blob_url = %blob.url,
                    error = %failure,
                    "トークンペイロードを解釈できないためBlobのパス名を使用します"
                );
                failures.push(failure);
                blob.pathname.clone()
            }
        };

        let notified = notify_upload_from_url(
            &self.state.http_client,
            &config.upload_from_url_endpoint(),
            &UploadFromUrlRequest {
                url: blob.url.clone(),
                filename: filename.clone(),
            },
        )
        .await;
        let notify_failed = notified.is_err();
        if let Err(failure) = notified {
            failures.push(failure);
        }

        let deleted = if notify_failed && config.retain_blob_on_failure {
            tracing::warn!(
                blob_url = %blob.url,
                "バックエンド通知に失敗したため一時Blobを保持します"
            );
            false
        } else {
            match self.state.blob_store.delete(&blob.url).await {
                Ok(()) => {
                    tracing::info!(blob_url = %blob.url, "一時Blobを削除しました");
                    true
                }
                Err(e) => {
                    failures.push(CompletionFailure::DeleteFailed(e.to_string()));
                    false
                }
            }
        };

        CompletionReport {
            blob_url: blob.url,
            filename,
            deleted,
            failures,
        }
    }
}
