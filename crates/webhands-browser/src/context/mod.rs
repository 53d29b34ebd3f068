//! Browser context: session lifecycle and the cached selector map.
//!
//! `uninitialized -> init() -> ready`. Every `get_state` replaces the cached
//! state wholesale; `close` drops it.

mod context_core;
mod context_tabs;
mod context_types;

pub use context_core::BrowserContext;
pub use context_types::{BrowserContextConfig, BrowserError, BrowserResult, BrowserState, TabInfo};

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
