//! WebHands browser context and controller.
//!
//! [`BrowserContext`] owns the page session and the cached selector map
//! across actions; [`Controller`] executes the closed [`Action`] vocabulary
//! against it and aborts multi-action sequences when the page changes.

pub mod context;
pub mod controller;
pub mod cookies;

pub use context::{BrowserContext, BrowserContextConfig, BrowserError, BrowserResult, BrowserState, TabInfo};
pub use controller::{Action, ActionResult, Controller, ControllerConfig};
