//! Handler Vault - 첫 패치 이전에 설치돼 있던 핸들러 보관소
//!
//! Registry가 "무엇을 호출할지"를 기록한다면 Vault는 "무엇으로 위임할지"를 기록합니다.
//! `(target, facility)`당 최대 하나, 한 번만 저장되며 Trampoline은 절대 저장되지 않습니다.

use crate::dispatch::MutationHandler;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use tripwire_foundation::{Error, Facility, Result, WatchedEntity};

/// 저장된 원래 핸들러
#[derive(Clone)]
pub enum SavedHandler {
    /// 패치 전 슬롯에 있던 핸들러
    Original(Arc<dyn MutationHandler>),

    /// 패치 전 슬롯이 비어 있었음 (덜 구체적인 수준으로 위임)
    Default,
}

impl SavedHandler {
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Original(handler) => handler.name(),
            Self::Default => "default",
        }
    }
}

impl fmt::Debug for SavedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original(handler) => f.debug_tuple("Original").field(&handler.name()).finish(),
            Self::Default => f.write_str("Default"),
        }
    }
}

/// 복원 실패 항목
#[derive(Debug)]
pub struct RestoreFailure {
    pub target: WatchedEntity,
    pub facility: Facility,
    pub error: Error,
}

/// restore_all 결과
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub restored: Vec<(WatchedEntity, Facility)>,
    pub failures: Vec<RestoreFailure>,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 원래 핸들러 보관소
#[derive(Default)]
pub struct HandlerVault {
    entries: Mutex<HashMap<(WatchedEntity, Facility), SavedHandler>>,
}

impl HandlerVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// 없을 때만 저장 (저장했으면 true)
    pub fn capture_once(&self, target: &WatchedEntity, facility: Facility, current: SavedHandler) -> bool {
        if let SavedHandler::Original(handler) = &current {
            debug_assert!(!handler.is_trampoline(), "trampoline must never be captured");
        }

        let mut entries = self.entries.lock();
        let key = (target.clone(), facility);
        if entries.contains_key(&key) {
            return false;
        }
        debug!(target_entity = %target, facility = %facility, saved = ?current, "Captured original handler");
        entries.insert(key, current);
        true
    }

    pub fn get(&self, target: &WatchedEntity, facility: Facility) -> Option<SavedHandler> {
        self.entries.lock().get(&(target.clone(), facility)).cloned()
    }

    /// 꺼내고 잊기 (없으면 None)
    pub fn restore_and_forget(&self, target: &WatchedEntity, facility: Facility) -> Option<SavedHandler> {
        self.entries.lock().remove(&(target.clone(), facility))
    }

    /// 모든 항목을 비우며 `reinstall`에 전달
    ///
    /// `reinstall`은 락 밖에서 호출되며, 실패해도 나머지 항목은 계속 복원합니다.
    pub fn restore_all<F>(&self, mut reinstall: F) -> RestoreReport
    where
        F: FnMut(&WatchedEntity, Facility, SavedHandler) -> Result<()>,
    {
        let drained: Vec<_> = self.entries.lock().drain().collect();
        let mut report = RestoreReport::default();

        for ((target, facility), saved) in drained {
            match reinstall(&target, facility, saved) {
                Ok(()) => report.restored.push((target, facility)),
                Err(error) => {
                    warn!(
                        target_entity = %target,
                        facility = %facility,
                        error = %error,
                        "Failed to restore original handler"
                    );
                    report.failures.push(RestoreFailure {
                        target,
                        facility,
                        error,
                    });
                }
            }
        }

        report
    }

    /// 대상의 모든 facility 항목 제거 (제거된 항목은 락 밖에서 반환)
    pub fn forget_target(&self, target: &WatchedEntity) -> Vec<(Facility, SavedHandler)> {
        let mut entries = self.entries.lock();
        let keys: Vec<_> = entries.keys().filter(|(t, _)| t == target).cloned().collect();
        keys.into_iter()
            .filter_map(|key| entries.remove(&key).map(|saved| (key.1, saved)))
            .collect()
    }

    pub fn contains(&self, target: &WatchedEntity, facility: Facility) -> bool {
        self.entries.lock().contains_key(&(target.clone(), facility))
    }

    /// 어떤 facility든 저장된 항목이 있는지
    pub fn contains_target(&self, target: &WatchedEntity) -> bool {
        self.entries.lock().keys().any(|(t, _)| t == target)
    }

    pub fn entries(&self) -> Vec<(WatchedEntity, Facility)> {
        self.entries.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

// ============================================================================
// 테스트
// ============================================================================
