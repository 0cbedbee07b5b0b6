//! # 処理バックエンドへの通知
//!
//! 保存済みBlobのURLを処理バックエンドへ引き渡す。
//! 応答はステータスのみ確認し、本文は読まない。再送は行わない。

use upblob_types::UploadFromUrlRequest;

use crate::hooks::CompletionFailure;

/// `POST <endpoint>` に `{url, filename}` を送信する。
pub async fn notify_upload_from_url(
    http_client: &reqwest::Client,
    endpoint: &str,
    request: &UploadFromUrlRequest,
) -> Result<(), CompletionFailure> {
    let response = http_client
        .post(endpoint)
        .json(request)
        .send()
        .await
        .map_err(|e| CompletionFailure::BackendUnreachable(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CompletionFailure::BackendRejected(status.as_u16()));
    }

    Ok(())
}
