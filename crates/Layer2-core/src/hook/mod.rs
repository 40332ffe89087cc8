//! # Hook System
//!
//! 감시 대상별 Hook 등록과 해석
//!
//! ## 개요
//!
//! Hook은 컨테이너나 객체 속성이 바뀌기 직전(advisory) 또는 직후(notify-only)에
//! 호출되는 callable입니다. 이전 값과 새 값을 보고 결정합니다.
//!
//! ## Hook 이름
//!
//! - `on_set_attribute` / `on_delete_attribute`: 객체 속성
//! - `on_set_item` / `on_delete_item`: 시퀀스 위치, 매핑 키
//! - `on_add_member` / `on_remove_member`: 집합 멤버 (항상 notify-only)
//!
//! ## 결정
//!
//! - `Accept`: 제안된 값 커밋
//! - `Replace(v)`: `v` 커밋 (할당에만 적용)
//! - `Abort` 또는 `AbortRequested` 에러: 조용히 건너뜀
//! - 그 외 에러: `Error::HookFailed`로 호출자에게 전달
//!
//! ## 예시
//!
//! ```ignore
//! // watches.json 형식
//! {
//!   "watches": [{
//!     "scope": { "type": "Point" },
//!     "facility": "attribute_setter",
//!     "hooks": { "on_set_attribute": "audit" }
//!   }]
//! }
//! ```

mod loader;
mod manifest;
mod registry;
mod types;

pub use loader::{load_manifest_from_dir, load_manifest_from_file, WatchLoader, WATCHES_FILE};
pub use manifest::{HookCatalog, ManifestScope, WatchManifest, WatchSpec};
pub use registry::{HookRegistry, HookUpdate};
pub use types::{
    hook_fn, AbortRequested, DispatchMode, HookCall, HookFn, HookOutcome, HookResult, HookSet,
};
