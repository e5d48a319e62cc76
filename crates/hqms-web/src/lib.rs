//! # HQMS Web
//!
//! 排队叫号系统的HTTP API层。

pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::WebServer;
