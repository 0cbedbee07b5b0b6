//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。
//! 設定は起動時に一度だけ読み込み、以後変更しない。

use upblob_types::DOCUMENT_CONTENT_TYPES;

use crate::storage::BlobStore;

/// BACKEND_URL 未設定時の処理バックエンド
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
/// BLOB_API_URL 未設定時のストレージプロバイダAPI
pub const DEFAULT_BLOB_API_URL: &str = "https://blob.vercel-storage.com";
/// クライアントトークンの既定有効期間（秒）
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;
/// クライアントトークン有効期間の上限（秒）
pub const MAX_TOKEN_TTL_SECS: u64 = 7 * 24 * 3600;
/// 既定の待ち受けアドレス
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// Gateway設定。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// 処理バックエンドのベースURL
    pub backend_url: String,
    /// ストレージプロバイダの読み書きトークン（署名鍵を兼ねる）
    pub read_write_token: String,
    /// ストレージプロバイダAPIのベースURL
    pub blob_api_url: String,
    /// クライアントが完了通知先を指定しない場合の既定値
    pub callback_url: Option<String>,
    /// 許可するMIMEタイプ
    pub allowed_content_types: Vec<String>,
    /// クライアントトークンの有効期間（秒）
    pub token_ttl_secs: u64,
    /// アップロード最大サイズ（バイト）
    pub max_upload_bytes: Option<u64>,
    /// パス名にランダムサフィックスを付与させるか（未設定時はプロバイダの既定）
    pub add_random_suffix: Option<bool>,
    /// バックエンド通知に失敗した場合にBlobを削除せず残すか
    pub retain_blob_on_failure: bool,
    /// 待ち受けアドレス
    pub listen_addr: String,
}

impl GatewayConfig {
    /// 環境変数から構築する。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の参照関数から構築する。
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read_write_token = lookup("BLOB_READ_WRITE_TOKEN")
            .filter(|token| !token.is_empty())
            .ok_or_else(|| anyhow::anyhow!("BLOB_READ_WRITE_TOKENが未設定です"))?;
        upblob_crypto::store_id_from_read_write_token(&read_write_token)?;

        let backend_url = lookup("BACKEND_URL")
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let blob_api_url = lookup("BLOB_API_URL")
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BLOB_API_URL.to_string());

        let token_ttl_secs = match lookup("UPLOAD_TOKEN_TTL_SECS") {
            Some(v) => v
                .parse()
                .map_err(|e| anyhow::anyhow!("UPLOAD_TOKEN_TTL_SECSが不正です: {e}"))?,
            None => DEFAULT_TOKEN_TTL_SECS,
        };
        if token_ttl_secs == 0 || token_ttl_secs > MAX_TOKEN_TTL_SECS {
            anyhow::bail!(
                "UPLOAD_TOKEN_TTL_SECSは1以上{}以下である必要があります: {}",
                MAX_TOKEN_TTL_SECS,
                token_ttl_secs
            );
        }
        let max_upload_bytes = lookup("MAX_UPLOAD_BYTES")
            .map(|v| {
                v.parse::<u64>()
                    .map_err(|e| anyhow::anyhow!("MAX_UPLOAD_BYTESが不正です: {e}"))
            })
            .transpose()?;
        let retain_blob_on_failure = lookup("RETAIN_BLOB_ON_FAILURE")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        let add_random_suffix = lookup("ADD_RANDOM_SUFFIX")
            .filter(|v| !v.is_empty())
            .map(|v| parse_flag(&v));

        Ok(Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            read_write_token,
            blob_api_url: blob_api_url.trim_end_matches('/').to_string(),
            callback_url: lookup("UPLOAD_CALLBACK_URL").filter(|url| !url.is_empty()),
            allowed_content_types: DOCUMENT_CONTENT_TYPES.iter().map(|t| t.to_string()).collect(),
            token_ttl_secs,
            max_upload_bytes,
            add_random_suffix,
            retain_blob_on_failure,
            listen_addr: lookup("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
        })
    }

    /// バックエンドのファイル取り込みエンドポイントURL。
    pub fn upload_from_url_endpoint(&self) -> String {
        format!("{}/backend/upload-from-url", self.backend_url)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

/// Gatewayの共有状態。
pub struct GatewayState {
    /// 起動時に読み込んだ設定
    pub config: GatewayConfig,
    /// HTTPクライアント
    pub http_client: reqwest::Client,
    /// Blobストレージ（トレイトで抽象化）
    pub blob_store: Box<dyn BlobStore>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    /// BACKEND_URL未設定時にlocalhost:8000が使われることを確認
    #[test]
    fn test_backend_url_default() {
        let config =
            GatewayConfig::from_lookup(lookup_from(&[("BLOB_READ_WRITE_TOKEN", "vercel_blob_rw_s1_x")]))
                .unwrap();
        assert_eq!(config.backend_url, "http://localhost:8000");
        assert_eq!(
            config.upload_from_url_endpoint(),
            "http://localhost:8000/backend/upload-from-url"
        );
        assert_eq!(config.blob_api_url, DEFAULT_BLOB_API_URL);
        assert_eq!(config.token_ttl_secs, DEFAULT_TOKEN_TTL_SECS);
        assert_eq!(config.allowed_content_types.len(), 6);
        assert!(config.max_upload_bytes.is_none());
        assert!(!config.retain_blob_on_failure);
        assert!(config.callback_url.is_none());
        assert!(config.add_random_suffix.is_none());
    }

    /// 環境変数の値が反映されることを確認
    #[test]
    fn test_explicit_values() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("BLOB_READ_WRITE_TOKEN", "vercel_blob_rw_s1_x"),
            ("BACKEND_URL", "http://backend:9000/"),
            ("UPLOAD_TOKEN_TTL_SECS", "60"),
            ("MAX_UPLOAD_BYTES", "1048576"),
            ("RETAIN_BLOB_ON_FAILURE", "true"),
            ("ADD_RANDOM_SUFFIX", "false"),
            ("UPLOAD_CALLBACK_URL", "https://app.example/api/upload-blob"),
        ]))
        .unwrap();
        assert_eq!(
            config.upload_from_url_endpoint(),
            "http://backend:9000/backend/upload-from-url"
        );
        assert_eq!(config.token_ttl_secs, 60);
        assert_eq!(config.max_upload_bytes, Some(1_048_576));
        assert!(config.retain_blob_on_failure);
        assert_eq!(config.add_random_suffix, Some(false));
        assert_eq!(
            config.callback_url.as_deref(),
            Some("https://app.example/api/upload-blob")
        );
    }

    /// 読み書きトークンが無い・不正な場合は起動できないことを確認
    #[test]
    fn test_read_write_token_required() {
        assert!(GatewayConfig::from_lookup(lookup_from(&[])).is_err());
        assert!(
            GatewayConfig::from_lookup(lookup_from(&[("BLOB_READ_WRITE_TOKEN", "plain")])).is_err()
        );
    }

    /// 数値設定が不正な場合はエラーになることを確認
    #[test]
    fn test_invalid_numbers() {
        let result = GatewayConfig::from_lookup(lookup_from(&[
            ("BLOB_READ_WRITE_TOKEN", "vercel_blob_rw_s1_x"),
            ("UPLOAD_TOKEN_TTL_SECS", "soon"),
        ]));
        assert!(result.is_err());
    }

    /// 有効期間が範囲外の場合は起動できないことを確認
    #[test]
    fn test_token_ttl_out_of_range() {
        for ttl in ["0", "604801", "18446744073709552"] {
            let result = GatewayConfig::from_lookup(lookup_from(&[
                ("BLOB_READ_WRITE_TOKEN", "vercel_blob_rw_s1_x"),
                ("UPLOAD_TOKEN_TTL_SECS", ttl),
            ]));
            assert!(result.is_err(), "ttl={ttl} が受け付けられてしまった");
        }

        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("BLOB_READ_WRITE_TOKEN", "vercel_blob_rw_s1_x"),
            ("UPLOAD_TOKEN_TTL_SECS", "604800"),
        ]))
        .unwrap();
        assert_eq!(config.token_ttl_secs, MAX_TOKEN_TTL_SECS);
    }
}
