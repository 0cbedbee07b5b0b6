//! # Upblob 暗号処理
//!
//! ストレージプロバイダのクライアントアップロードプロトコルで使われる署名処理を実装する。
//!
//! ## 暗号アルゴリズム
//! | 用途 | アルゴリズム |
//! |------|------------|
//! | クライアントトークン署名 | HMAC-SHA256（鍵: 読み書きトークン） |
//! | 完了通知の署名検証 | HMAC-SHA256（鍵: 読み書きトークン） |
//!
//! ## クライアントトークン形式
//! `vercel_blob_client_<storeId>_<base64(<hex署名>.<base64(ペイロードJSON)>)>`

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use upblob_types::ClientTokenPayload;

type HmacSha256 = Hmac<Sha256>;

/// クライアントトークンの接頭辞
pub const CLIENT_TOKEN_PREFIX: &str = "vercel_blob_client_";

/// 暗号処理のエラー型
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// 読み書きトークンが不正
    #[error("読み書きトークンの形式が不正です")]
    InvalidReadWriteToken,
    /// クライアントトークンが不正
    #[error("クライアントトークンの形式が不正です: {0}")]
    InvalidClientToken(String),
    /// 署名検証エラー
    #[error("署名の検証に失敗しました")]
    SignatureVerifyError,
    /// ペイロードのシリアライズ・デシリアライズ失敗
    #[error("トークンペイロードの変換に失敗しました: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Base64エンジン（Standard）
fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

fn hmac_sha256(key: &str, message: &[u8]) -> Result<HmacSha256, CryptoError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())
        .map_err(|_| CryptoError::InvalidReadWriteToken)?;
    mac.update(message);
    Ok(mac)
}

/// HMAC-SHA256署名を16進文字列で返す。
pub fn sign_payload(key: &str, message: &[u8]) -> Result<String, CryptoError> {
    Ok(hex::encode(hmac_sha256(key, message)?.finalize().into_bytes()))
}

/// 16進文字列のHMAC-SHA256署名を定数時間で検証する。
pub fn verify_signature(key: &str, message: &[u8], signature_hex: &str) -> Result<(), CryptoError> {
    let signature =
        hex::decode(signature_hex.trim()).map_err(|_| CryptoError::SignatureVerifyError)?;
    hmac_sha256(key, message)?
        .verify_slice(&signature)
        .map_err(|_| CryptoError::SignatureVerifyError)
}

/// 読み書きトークン（`vercel_blob_rw_<storeId>_<secret>`）からストアIDを取り出す。
pub fn store_id_from_read_write_token(token: &str) -> Result<&str, CryptoError> {
    match token.split('_').nth(3) {
        Some(store_id) if !store_id.is_empty() => Ok(store_id),
        _ => Err(CryptoError::InvalidReadWriteToken),
    }
}

/// クライアントトークンを発行する。
///
/// ペイロードJSONをBase64化したものに読み書きトークンでHMAC署名し、
/// `署名.ペイロード` を再度Base64化してストアIDと連結する。
pub fn generate_client_token(
    read_write_token: &str,
    payload: &ClientTokenPayload,
) -> Result<String, CryptoError> {
    let store_id = store_id_from_read_write_token(read_write_token)?;
    let encoded_payload = b64().encode(serde_json::to_vec(payload)?);
    let signature = sign_payload(read_write_token, encoded_payload.as_bytes())?;
    let secured = b64().encode(format!("{signature}.{encoded_payload}"));
    Ok(format!("{CLIENT_TOKEN_PREFIX}{store_id}_{secured}"))
}

/// クライアントトークンを検証し、埋め込まれたペイロードを返す。
pub fn decode_client_token(
    read_write_token: &str,
    client_token: &str,
) -> Result<ClientTokenPayload, CryptoError> {
    let rest = client_token
        .strip_prefix(CLIENT_TOKEN_PREFIX)
        .ok_or_else(|| CryptoError::InvalidClientToken("接頭辞がありません".to_string()))?;
    let (store_id, secured) = rest
        .split_once('_')
        .ok_or_else(|| CryptoError::InvalidClientToken("ストアIDがありません".to_string()))?;
    if store_id != store_id_from_read_write_token(read_write_token)? {
        return Err(CryptoError::InvalidClientToken(
            "ストアIDが一致しません".to_string(),
        ));
    }

    let decoded = b64()
        .decode(secured)
        .map_err(|e| CryptoError::InvalidClientToken(format!("Base64デコード失敗: {e}")))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|e| CryptoError::InvalidClientToken(format!("UTF-8変換失敗: {e}")))?;
    let (signature, encoded_payload) = decoded
        .split_once('.')
        .ok_or_else(|| CryptoError::InvalidClientToken("署名区切りがありません".to_string()))?;

    verify_signature(read_write_token, encoded_payload.as_bytes(), signature)?;

    let payload_json = b64()
        .decode(encoded_payload)
        .map_err(|e| CryptoError::InvalidClientToken(format!("Base64デコード失敗: {e}")))?;
    Ok(serde_json::from_slice(&payload_json)?)
}
