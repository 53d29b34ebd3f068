//! Chrome DevTools Protocol (CDP) client.
//!
//! Talks to Chrome/Chromium over one WebSocket using the CDP JSON-RPC
//! protocol. Page sessions are attached in flat mode and share the
//! browser connection.
//!
//! ```rust,ignore
//! let client = CdpClient::connect("http://localhost:9222").await?;
//! let page = client.new_page(Some("https://example.com")).await?;
//! let title = page.get_title().await?;
//! ```

mod client;
mod error;
mod protocol;
mod session;

pub use client::{COMMAND_TIMEOUT, CdpClient};
pub use error::CdpError;
pub use protocol::*;
pub use session::PageSession;
