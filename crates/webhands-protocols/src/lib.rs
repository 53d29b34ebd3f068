//! # WebHands Protocols
//!
//! Contracts between the DOM core and its collaborators.
//! Contains only interface definitions, plus in-memory fakes behind the
//! `testing` feature.
//!
//! ## Core Traits
//!
//! - [`PageDriver`] - Page, frame and element-handle primitives of a browser engine
//! - [`BrowserDriver`] - Context-level primitives (pages, cookies)
//! - [`Telemetry`] - Injected analytics sink

pub mod cookie;
pub mod driver;
pub mod error;
pub mod telemetry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cookie::{Cookie, SameSite};
pub use driver::{BrowserDriver, ElementHandle, PageDriver, SearchContext};
pub use error::DriverError;
pub use telemetry::{NoopTelemetry, Telemetry, TelemetryEvent, TracingTelemetry};
