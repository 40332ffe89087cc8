//! Event - 가로채기 이벤트 시스템
//!
//! - `types.rs` - InterceptionEvent, InterceptionEventKind
//! - `bus.rs` - EventBus (동기 발행 + broadcast 구독 + 히스토리)

mod bus;
mod types;

pub use bus::{EventBus, EventBusConfig};
pub use types::{EventId, InterceptionEvent, InterceptionEventKind};
