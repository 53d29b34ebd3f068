//! WebHands browser driver over the Chrome DevTools Protocol.
//!
//! Implements [`PageDriver`](webhands_protocols::PageDriver) and
//! [`BrowserDriver`](webhands_protocols::BrowserDriver) against a Chrome or
//! Chromium reached on its remote debugging port. Pure Rust, one WebSocket.
//!
//! ```text
//! ┌─────────────────┐    WebSocket     ┌──────────────────┐
//! │   CdpBrowser    │ ◄──────────────► │   Chrome/Edge    │
//! │   CdpPage ...   │       CDP        │                  │
//! └─────────────────┘                  └──────────────────┘
//! ```
//!
//! ## Setup
//!
//! [`CdpBrowser::connect`] launches Chrome with a persistent profile when
//! nothing listens on the debug port. To reuse a running browser with its
//! logins, start it yourself:
//!
//! ```bash
//! google-chrome --remote-debugging-port=9222
//! ```

pub mod browser;
pub mod cdp;
pub mod page;

pub use browser::{CdpBrowser, CdpBrowserConfig, find_chrome};
pub use cdp::{CdpClient, CdpError};
pub use page::CdpPage;
