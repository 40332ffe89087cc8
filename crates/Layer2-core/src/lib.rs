//! # tripwire-core
//!
//! 변경 가로채기 엔진 (Layer2)
//!
//! ## 구성 요소
//!
//! - [`hook`]: Hook Registry, HookSet, 매니페스트/로더
//! - [`vault`]: 첫 패치 이전 핸들러 보관소
//! - [`dispatch`]: 디스패치 슬롯, 형태별 채널, Trampoline
//! - [`controller`]: 설치/해제/teardown
//! - [`observed`]: 관찰 컨테이너 핸들 (객체, 리스트, 매핑, 집합)
//! - [`changes`]: 경로 패턴 변경 피드
//!
//! ## 흐름
//!
//! ```text
//! PatchController::install
//!   → HookRegistry::merge
//!   → HandlerVault::capture_once (슬롯의 기존 핸들러)
//!   → DispatchTable 슬롯에 Trampoline 설치
//!
//! handle.set(..)
//!   → InterceptionContext::dispatch → 슬롯 → Trampoline
//!   → Hook 결정 → Vault 원본 → Storage
//! ```

pub mod changes;
pub mod context;
pub mod controller;
pub mod dispatch;
pub mod entity;
pub mod hook;
pub mod observed;
pub mod vault;

// ============================================================================
// Context / Controller
// ============================================================================
pub use context::InterceptionContext;
pub use controller::{PatchController, TargetScope};

// ============================================================================
// Hook
// ============================================================================
pub use hook::{
    hook_fn, AbortRequested, DispatchMode, HookCall, HookCatalog, HookFn, HookOutcome,
    HookRegistry, HookResult, HookSet, HookUpdate, ManifestScope, WatchLoader, WatchManifest,
    WatchSpec,
};

// ============================================================================
// Dispatch / Vault
// ============================================================================
pub use dispatch::{
    Applied, Change, DefaultHandler, FnHandler, HandlerCall, Mutation, MutationChannel,
    MutationHandler, MutationOutcome, Trampoline,
};
pub use vault::{HandlerVault, RestoreFailure, RestoreReport, SavedHandler};

// ============================================================================
// Entity / Observed
// ============================================================================
pub use changes::{ChangeEvent, ChangeFeed, ChangeListener, PathPattern};
pub use entity::{EntityCell, Storage, TypeDef, TypeTable};
pub use observed::{Observed, ObservedList, ObservedMap, ObservedObject, ObservedSet};

// Layer1 재노출
pub use tripwire_foundation::{
    EntityId, Error, Facility, GlobalFacility, HookName, InterceptionConfig, Locator,
    NotifyErrorPolicy, Result, Shape, WatchedEntity,
};
