//! # Blobストレージ
//!
//! アップロード完了後に一時Blobを削除するためのストレージ抽象インターフェース。
//! ストレージプロバイダのHTTP API実装は `vercel` サブモジュールを参照。

pub mod vercel;

pub use vercel::VercelBlobStore;

use crate::error::GatewayError;

/// Blobストレージの抽象インターフェース。
///
/// アップロード自体はブラウザからプロバイダへ直接行われるため、
/// Gatewayが必要とする操作は削除のみ。
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// URLで指定されたBlobを削除する。
    async fn delete(&self, url: &str) -> Result<(), GatewayError>;
}
