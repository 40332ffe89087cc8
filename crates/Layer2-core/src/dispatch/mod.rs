//! # Dispatch
//!
//! 변경 디스패치: 슬롯 테이블, 형태별 채널, Trampoline 상태 기계
//!
//! ```text
//! handle ─► InterceptionContext::dispatch ─► DispatchTable slot
//!                                               │
//!                      ┌────────────────────────┴──────────────┐
//!                      ▼                                       ▼
//!                 Trampoline ─► HookRegistry ─► hook     DefaultHandler
//!                      │                                       │
//!                      └─► HandlerVault original ──────────────┴─► Storage
//! ```

mod channel;
mod handler;
mod mutation;
mod table;
mod trampoline;

pub use channel::{
    channel_for, AttributeChannel, MappingChannel, MembershipChannel, MutationChannel,
    SequenceChannel,
};
pub use handler::{DefaultHandler, FnHandler, HandlerCall, MutationHandler};
pub use mutation::{Applied, Change, Mutation};
pub use table::DispatchTable;
pub use trampoline::{MutationOutcome, Trampoline};
