//! Hook 타입 정의
//!
//! Hook 호출 계약: `(entity, locator, old, proposed) -> Accept | Replace | Abort` 또는 에러

use crate::entity::EntityCell;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tripwire_foundation::{Error, Facility, HookName, Locator, Result};

// ============================================================================
// HookOutcome - Hook 결정
// ============================================================================

/// Hook이 반환하는 결정
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome {
    /// 의견 없음 - 제안된 값을 그대로 커밋
    Accept,

    /// 대체 값 커밋 (할당에만 적용)
    Replace(Value),

    /// 변경을 조용히 건너뜀 (advisory Hook에만 적용)
    Abort,
}

impl From<Option<Value>> for HookOutcome {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(v) => Self::Replace(v),
            None => Self::Accept,
        }
    }
}

/// Hook 결과 타입
pub type HookResult = anyhow::Result<HookOutcome>;

/// 등록 가능한 Hook callable
pub type HookFn = Arc<dyn Fn(&HookCall<'_>) -> HookResult + Send + Sync>;

/// 클로저를 HookFn으로 변환
pub fn hook_fn<F>(f: F) -> HookFn
where
    F: Fn(&HookCall<'_>) -> HookResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// 에러 경로로 중단을 알리는 신호
///
/// `HookOutcome::Abort`와 동일하게 처리되며 호출자에게 노출되지 않습니다.
#[derive(Debug, Clone, Copy, Error)]
#[error("mutation aborted by hook")]
pub struct AbortRequested;

// ============================================================================
// DispatchMode / HookCall
// ============================================================================

/// Hook 호출 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// 커밋 전 호출 - 대체/중단 가능
    Advisory,

    /// 커밋 후 호출 - 관찰만 가능
    NotifyOnly,
}

/// Hook에 전달되는 호출 정보
pub struct HookCall<'a> {
    /// 변경 대상 엔티티
    pub entity: &'a EntityCell,

    /// 호출된 Hook 이름
    pub hook: HookName,

    /// 변경 위치
    pub locator: &'a Locator,

    /// 이전 값 (없으면 None)
    pub old: Option<&'a Value>,

    /// 제안된 값 (삭제/제거면 None)
    pub proposed: Option<&'a Value>,

    pub mode: DispatchMode,
}

impl HookCall<'_> {
    pub fn is_removal(&self) -> bool {
        self.proposed.is_none()
    }

    pub fn path(&self) -> String {
        self.locator.path()
    }
}

impl fmt::Debug for HookCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookCall")
            .field("entity", &self.entity.id())
            .field("hook", &self.hook)
            .field("locator", &self.locator)
            .field("old", &self.old)
            .field("proposed", &self.proposed)
            .field("mode", &self.mode)
            .finish()
    }
}

// ============================================================================
// HookSet - 이름별 Hook 집합
// ============================================================================

/// Hook 이름 → callable
#[derive(Clone, Default)]
pub struct HookSet {
    hooks: BTreeMap<HookName, HookFn>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 문자열 이름으로 구성 (동적 호스트용)
    pub fn from_named<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, HookFn)>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for (name, hook) in entries {
            let name: HookName = name.as_ref().parse()?;
            set.insert(name, hook);
        }
        Ok(set)
    }

    /// Hook 추가 (builder)
    pub fn with<F>(mut self, name: HookName, f: F) -> Self
    where
        F: Fn(&HookCall<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.insert(name, Arc::new(f));
        self
    }

    pub fn on_set_attribute<F>(self, f: F) -> Self
    where
        F: Fn(&HookCall<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.with(HookName::OnSetAttribute, f)
    }

    pub fn on_delete_attribute<F>(self, f: F) -> Self
    where
        F: Fn(&HookCall<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.with(HookName::OnDeleteAttribute, f)
    }

    pub fn on_set_item<F>(self, f: F) -> Self
    where
        F: Fn(&HookCall<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.with(HookName::OnSetItem, f)
    }

    pub fn on_delete_item<F>(self, f: F) -> Self
    where
        F: Fn(&HookCall<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.with(HookName::OnDeleteItem, f)
    }

    pub fn on_add_member<F>(self, f: F) -> Self
    where
        F: Fn(&HookCall<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.with(HookName::OnAddMember, f)
    }

    pub fn on_remove_member<F>(self, f: F) -> Self
    where
        F: Fn(&HookCall<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.with(HookName::OnRemoveMember, f)
    }

    /// Hook 추가/교체
    pub fn insert(&mut self, name: HookName, hook: HookFn) -> Option<HookFn> {
        self.hooks.insert(name, hook)
    }

    pub fn remove(&mut self, name: HookName) -> Option<HookFn> {
        self.hooks.remove(&name)
    }

    pub fn get(&self, name: HookName) -> Option<&HookFn> {
        self.hooks.get(&name)
    }

    pub fn contains(&self, name: HookName) -> bool {
        self.hooks.contains_key(&name)
    }

    pub fn names(&self) -> Vec<HookName> {
        self.hooks.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// 다른 집합 병합 (같은 이름은 덮어씀, 교체된 Hook 반환)
    pub fn merge(&mut self, other: HookSet) -> Vec<HookFn> {
        other
            .hooks
            .into_iter()
            .filter_map(|(name, hook)| self.hooks.insert(name, hook))
            .collect()
    }

    /// 모든 Hook이 facility에 적용 가능한지 검증
    pub fn validate_for(&self, facility: Facility) -> Result<()> {
        match self.hooks.keys().find(|name| !name.applies_to(facility)) {
            Some(name) => Err(Error::InvalidHookValue(format!(
                "hook {} cannot be attached to the {}",
                name, facility
            ))),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.hooks.keys()).finish()
    }
}

// ============================================================================
// 테스트
// ============================================================================
