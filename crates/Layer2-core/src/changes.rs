//! Change Feed - 경로 패턴 기반 변경 리스너
//!
//! 인스턴스 범위에 전달용 Hook을 설치하고, 변경 경로가 패턴과 맞는 리스너를 호출합니다.
//! 리스너는 관찰만 하며 변경을 막을 수 없습니다.
//!
//! ```ignore
//! let feed = ChangeFeed::attach(&controller, &config_map)?;
//! feed.on("[db.*", |event| println!("{} -> {:?}", event.path, event.new));
//! config_map.set("db.host", json!("localhost"))?;
//! feed.detach()?;
//! ```

use crate::controller::{PatchController, TargetScope};
use crate::hook::{HookCall, HookOutcome, HookSet};
use crate::observed::Observed;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use tripwire_foundation::{EntityId, Facility, HookName, Result};

/// 변경 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub entity: EntityId,
    pub path: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// 변경 리스너
pub type ChangeListener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

// ============================================================================
// PathPattern
// ============================================================================

/// 경로 패턴: `*`, 정확한 경로, 앞 또는 뒤에 `*` 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Any,
    Exact(String),
    Prefix(String),
    Suffix(String),
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        if pattern == "*" {
            Self::Any
        } else if let Some(rest) = pattern.strip_suffix('*') {
            Self::Prefix(rest.to_string())
        } else if let Some(rest) = pattern.strip_prefix('*') {
            Self::Suffix(rest.to_string())
        } else {
            Self::Exact(pattern.to_string())
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(exact) => path == exact,
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()),
            Self::Suffix(suffix) => path.ends_with(suffix.as_str()),
        }
    }
}

impl From<&str> for PathPattern {
    fn from(pattern: &str) -> Self {
        Self::parse(pattern)
    }
}

impl From<String> for PathPattern {
    fn from(pattern: String) -> Self {
        Self::parse(&pattern)
    }
}

// ============================================================================
// ChangeFeed
// ============================================================================

type Listeners = Arc<RwLock<Vec<(PathPattern, ChangeListener)>>>;

/// 인스턴스 하나의 변경 피드
///
/// 피드는 해당 인스턴스의 설정/제거 Hook 이름을 점유합니다.
pub struct ChangeFeed {
    controller: PatchController,
    scope: TargetScope,
    facility: Facility,
    listeners: Listeners,
}

impl ChangeFeed {
    /// 핸들의 인스턴스 범위에 전달 Hook 설치
    pub fn attach(controller: &PatchController, handle: &impl Observed) -> Result<Self> {
        let facility = handle.facility();
        let listeners: Listeners = Arc::new(RwLock::new(Vec::new()));

        let (set_hook, delete_hook) = HookName::pair_for(facility);
        let hooks = HookSet::new()
            .with(set_hook, forwarder(Arc::clone(&listeners)))
            .with(delete_hook, forwarder(Arc::clone(&listeners)));

        let scope = handle.scope();
        controller.install(&scope, facility, Some(hooks))?;
        debug!(entity = %handle.id(), facility = %facility, "Change feed attached");

        Ok(Self {
            controller: controller.clone(),
            scope,
            facility,
            listeners,
        })
    }

    /// 리스너 등록
    pub fn on<F>(&self, pattern: impl Into<PathPattern>, listener: F) -> &Self
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .push((pattern.into(), Arc::new(listener)));
        self
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Hook 제거
    pub fn detach(self) -> Result<bool> {
        self.listeners.write().clear();
        self.controller.uninstall(&self.scope, self.facility)
    }
}

/// 매칭되는 리스너에 전달하는 Hook
fn forwarder(listeners: Listeners) -> impl Fn(&HookCall<'_>) -> anyhow::Result<HookOutcome> + Send + Sync + 'static {
    move |call| {
        let path = call.path();
        // 락 밖에서 호출 (리스너가 on()을 호출할 수 있음)
        let matched: Vec<ChangeListener> = listeners
            .read()
            .iter()
            .filter(|(pattern, _)| pattern.matches(&path))
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        if !matched.is_empty() {
            let event = ChangeEvent {
                entity: call.entity.id(),
                path,
                old: call.old.cloned(),
                new: call.proposed.cloned(),
            };
            for listener in matched {
                listener(&event);
            }
        }
        Ok(HookOutcome::Accept)
    }
}

// ============================================================================
// 테스트
// ============================================================================
