//! WebHands DOM core.
//!
//! Builds snapshots of a page's interactable elements, gives every element a
//! content-addressable identity, observes DOM mutations and resolves
//! previously observed elements back to live handles.
//!
//! ## Architecture
//!
//! ```text
//! PageDriver ──► SnapshotBuilder ──► DomState { DomTree, SelectorMap }
//!     │                                   │
//!     ├──► MutationObserverBridge         └──► ElementResolver ──► ElementHandle
//!     │         (poll loop)
//!     └──────────────── DomService (composition root)
//! ```

pub mod error;
pub mod hashing;
pub mod history;
pub mod locate;
pub mod node;
pub mod observer;
pub mod resolver;
pub mod service;
pub mod snapshot;

pub use error::{DomError, DomResult};
pub use hashing::{ElementHash, hash_attributes, hash_parent_branch_path};
pub use history::{DomHistoryElement, HistoryTreeProcessor};
pub use node::{DomNode, DomTree, ElementNode, NodeId, SelectorMap, TextNode};
pub use observer::{
    HandlerId, MutationEvent, MutationObserverBridge, MutationSubscription, ObserverState,
    SerializedNode,
};
pub use resolver::{ElementResolver, ResolveStrategy, ResolvedElement, SelectorPlan};
pub use service::{DomService, DomServiceConfig, FindOptions};
pub use snapshot::{BuildOptions, DomState, SnapshotBuilder};
