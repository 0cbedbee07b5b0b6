//! # Upblob 共有型定義
//!
//! クライアントアップロードプロトコルのリクエスト・レスポンス、
//! クライアントトークンのペイロード、バックエンド通知の本文をRust構造体として提供する。
//!
//! ## エンコーディング規則
//! - プロトコル上のフィールド名は camelCase
//! - `type` フィールドでリクエスト種別を判別する

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// 許可コンテンツタイプ
// ---------------------------------------------------------------------------

/// アップロードを許可するMIMEタイプ（静的な許可リスト）。
pub const DOCUMENT_CONTENT_TYPES: [&str; 6] = [
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/plain",
    "text/markdown",
    "text/csv",
];

/// コンテンツタイプが許可リストに含まれるかを判定する。
///
/// パラメータ（`; charset=...`）を除いた本体部分を小文字で比較する。
/// 許可リスト側の `type/*` は任意のサブタイプに一致する。
pub fn content_type_allowed<S: AsRef<str>>(allowed: &[S], content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if essence.is_empty() {
        return false;
    }

    allowed.iter().any(|candidate| {
        let candidate = candidate.as_ref().trim().to_ascii_lowercase();
        match candidate.strip_suffix("/*") {
            Some(top_level) => essence
                .split_once('/')
                .is_some_and(|(ty, _)| ty == top_level),
            None => candidate == essence,
        }
    })
}

// ---------------------------------------------------------------------------
// POST /api/upload-blob リクエスト
// ---------------------------------------------------------------------------

/// /api/upload-blob リクエスト本文。
///
/// ブラウザからのトークン要求と、ストレージプロバイダからの完了通知の
/// 2種類を `type` フィールドで判別する。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum HandleUploadBody {
    /// アップロード開始前のクライアントトークン要求
    #[serde(rename = "blob.generate-client-token")]
    GenerateClientToken(GenerateClientTokenPayload),
    /// アップロード完了通知（プロバイダから送信される）
    #[serde(rename = "blob.upload-completed")]
    UploadCompleted(UploadCompletedPayload),
}

/// クライアントトークン要求のペイロード。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateClientTokenPayload {
    /// アップロード先のパス名（ファイル名）
    pub pathname: String,
    /// 完了通知の送信先URL（クライアントが指定する場合）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    /// クライアントが任意に添付する文字列
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_payload: Option<String>,
    /// マルチパートアップロードかどうか
    #[serde(default)]
    pub multipart: bool,
}

/// アップロード完了通知のペイロード。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCompletedPayload {
    /// 保存されたBlobの記述子
    pub blob: PutBlobResult,
    /// トークン発行時に添付したペイロード（そのまま返却される）
    #[serde(default)]
    pub token_payload: Option<String>,
}

/// 保存済みBlobの記述子。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutBlobResult {
    /// BlobのURL
    pub url: String,
    /// ダウンロード用URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// 最終的なパス名（ランダムサフィックス付与後）
    pub pathname: String,
    /// 保存時のMIMEタイプ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Content-Dispositionヘッダ値
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
}

// ---------------------------------------------------------------------------
// POST /api/upload-blob レスポンス
// ---------------------------------------------------------------------------

/// /api/upload-blob 成功レスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HandleUploadResponse {
    /// 発行したクライアントトークン
    #[serde(rename = "blob.generate-client-token")]
    GenerateClientToken {
        #[serde(rename = "clientToken")]
        client_token: String,
    },
    /// 完了通知の受領応答（常に "ok"）
    #[serde(rename = "blob.upload-completed")]
    UploadCompleted { response: String },
}

/// /api/upload-blob エラーレスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// エラーメッセージ
    pub error: String,
}

// ---------------------------------------------------------------------------
// クライアントトークン
// ---------------------------------------------------------------------------

/// クライアントトークンに埋め込まれる署名対象ペイロード。
///
/// ストレージプロバイダはこの内容に基づいてアップロードを制限する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTokenPayload {
    /// アップロード先のパス名
    pub pathname: String,
    /// 許可するMIMEタイプ
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_content_types: Vec<String>,
    /// 有効期限（UNIXエポックからのミリ秒）
    pub valid_until: u64,
    /// 最大サイズ（バイト）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_size_in_bytes: Option<u64>,
    /// パス名にランダムサフィックスを付与するか
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_random_suffix: Option<bool>,
    /// 完了通知の設定
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_upload_completed: Option<OnUploadCompleted>,
}

impl ClientTokenPayload {
    /// このトークンで指定のMIMEタイプをアップロードできるかを判定する。
    /// 許可リストが空の場合は全て許可する（プロトコル上の既定動作）。
    pub fn accepts(&self, content_type: &str) -> bool {
        self.allowed_content_types.is_empty()
            || content_type_allowed(&self.allowed_content_types, content_type)
    }
}

/// 完了通知の送信先と返却ペイロード。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnUploadCompleted {
    /// 完了通知の送信先URL
    pub callback_url: String,
    /// 完了時にそのまま返却される文字列
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_payload: Option<String>,
}

/// トークン発行時にアプリケーションが添付するペイロード。
/// JSON文字列としてトークンに埋め込まれる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTokenPayload {
    /// アップロード要求時のパス名
    pub pathname: String,
}

// ---------------------------------------------------------------------------
// バックエンド通知
// ---------------------------------------------------------------------------

/// POST {BACKEND_URL}/backend/upload-from-url リクエスト本文。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFromUrlRequest {
    /// 保存済みBlobのURL
    pub url: String,
    /// 処理対象のファイル名
    pub filename: String,
}

// ---------------------------------------------------------------------------
// ストレージ削除API
// ---------------------------------------------------------------------------

/// POST {BLOB_API_URL}/delete リクエスト本文。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteBlobRequest {
    /// 削除対象のBlob URL
    pub urls: Vec<String>,
}
