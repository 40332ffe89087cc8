//! # tripwire-foundation
//!
//! Foundation layer for Tripwire:
//! - Core: 감시 대상 식별 모델 (EntityId, WatchedEntity, Facility, Locator, HookName)
//! - Error: 중앙 에러 타입
//! - Config: 엔진 설정 (InterceptionConfig, ConfigStore)
//! - Event: 가로채기 이벤트 버스
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  tripwire-core (Layer2)                              │
//! │  Registry · Vault · Trampolines · Patch Controller   │
//! │                     │                                │
//! │                     ▼                                │
//! │  tripwire-foundation (Layer1)                        │
//! │  WatchedEntity · Error · Config · EventBus           │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod event;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, HookSource, Result};

// ============================================================================
// Core (식별 모델)
// ============================================================================
pub use core::{EntityId, Facility, GlobalFacility, HookName, Locator, Shape, WatchedEntity};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    ConfigFormat, ConfigStore, InterceptionConfig, InterceptionConfigLayer, NotifyErrorPolicy,
    INTERCEPT_CONFIG_FILE, PROJECT_DIR,
};

// ============================================================================
// Event (이벤트 시스템)
// ============================================================================
pub use event::{EventBus, EventBusConfig, EventId, InterceptionEvent, InterceptionEventKind};
