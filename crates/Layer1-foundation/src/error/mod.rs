//! Error types for Tripwire
//!
//! 모든 에러를 중앙에서 관리

use crate::core::{Facility, HookName, Shape};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Hook이 반환한 원본 에러
pub type HookSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Tripwire 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Registry 입력 검증
    // ========================================================================
    #[error("Invalid hook value: {0}")]
    InvalidHookValue(String),

    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    // ========================================================================
    // Patch Controller
    // ========================================================================
    #[error("Already patched: {target} ({facility})")]
    AlreadyPatched { target: String, facility: Facility },

    #[error("Unpatchable target: {target} - {reason}")]
    Unpatchable { target: String, reason: String },

    #[error("Not heap-like: {0}")]
    NotHeapLike(String),

    #[error("No original handler recorded for {target} ({facility})")]
    NoOriginalRecorded { target: String, facility: Facility },

    #[error("Original handler missing for {target} ({facility}); controller bookkeeping was bypassed")]
    OriginalHandlerMissing { target: String, facility: Facility },

    // ========================================================================
    // Dispatch
    // ========================================================================
    #[error("Hook {hook} failed at {locator}: {source}")]
    HookFailed {
        hook: HookName,
        locator: String,
        #[source]
        source: HookSource,
    },

    // ========================================================================
    // 컨테이너
    // ========================================================================
    #[error("Index out of range: {index} (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    #[error("Member not found: {0}")]
    MemberNotFound(String),

    #[error("Value not found in sequence: {0}")]
    ValueNotFound(String),

    #[error("Shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: Shape, found: Shape },

    // ========================================================================
    // 타입 테이블
    // ========================================================================
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Type already defined: {0}")]
    TypeAlreadyDefined(String),

    // ========================================================================
    // 설정 / 외부 에러 변환
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 등록 시점 입력 검증 에러인지 확인
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidHookValue(_)
                | Error::InvalidEntity(_)
                | Error::Unpatchable { .. }
                | Error::NotHeapLike(_)
                | Error::UnknownType(_)
        )
    }

    /// Hook 실패 에러인지 확인
    pub fn is_hook_failure(&self) -> bool {
        matches!(self, Error::HookFailed { .. })
    }

    /// Hook 실패 에러 생성 헬퍼
    pub fn hook_failed(hook: HookName, locator: impl Into<String>, source: impl Into<HookSource>) -> Self {
        Error::HookFailed {
            hook,
            locator: locator.into(),
            source: source.into(),
        }
    }

    /// Unpatchable 에러 생성 헬퍼
    pub fn unpatchable(target: impl ToString, reason: impl Into<String>) -> Self {
        Error::Unpatchable {
            target: target.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(format!("Invalid TOML: {}", e))
    }
}
