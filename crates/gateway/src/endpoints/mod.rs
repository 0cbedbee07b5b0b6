//! # Gatewayエンドポイント

pub mod health;
pub mod upload_blob;

pub use health::handle_healthz;
pub use upload_blob::handle_upload_blob;
