//! Core - 감시 대상 식별 모델
//!
//! - `types.rs` - EntityId, Shape, Facility, WatchedEntity, Locator, HookName

mod types;

pub use types::{EntityId, Facility, GlobalFacility, HookName, Locator, Shape, WatchedEntity};
