//! # GET /healthz
//!
//! 死活監視用エンドポイント。

/// GET /healthz — 常に "ok" を返す。
pub async fn handle_healthz() -> &'static str {
    "ok"
}
