//! Event Types - 가로채기 엔진이 발행하는 이벤트

use crate::core::{Facility, WatchedEntity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Event ID
// ============================================================================

/// 이벤트 고유 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Event Kind
// ============================================================================

/// 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterceptionEventKind {
    /// Trampoline 설치됨
    Installed,
    /// Trampoline 제거 및 원래 핸들러 복원
    Uninstalled,
    /// 호스트가 커스텀 핸들러를 슬롯에 정의
    HandlerDefined,
    /// teardown 중 항목 복원 성공
    Restored,
    /// teardown 중 항목 복원 실패 (계속 진행)
    RestoreFailed,
    /// 전체 teardown 완료
    TornDown,
    /// advisory Hook이 변경을 중단
    MutationAborted,
    /// notify-only Hook 실패 (변경은 이미 커밋됨)
    NotifyFailed,
}

impl fmt::Display for InterceptionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Installed => "installed",
            Self::Uninstalled => "uninstalled",
            Self::HandlerDefined => "handler_defined",
            Self::Restored => "restored",
            Self::RestoreFailed => "restore_failed",
            Self::TornDown => "torn_down",
            Self::MutationAborted => "mutation_aborted",
            Self::NotifyFailed => "notify_failed",
        };
        f.write_str(s)
    }
}

// ============================================================================
// InterceptionEvent
// ============================================================================

/// 가로채기 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptionEvent {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub kind: InterceptionEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<WatchedEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility: Option<Facility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl InterceptionEvent {
    pub fn new(kind: InterceptionEventKind) -> Self {
        Self {
            id: EventId::new(),
            timestamp: Utc::now(),
            kind,
            target: None,
            facility: None,
            detail: None,
        }
    }

    /// 대상과 facility 지정
    pub fn on(mut self, target: &WatchedEntity, facility: Facility) -> Self {
        self.target = Some(target.clone());
        self.facility = Some(facility);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
