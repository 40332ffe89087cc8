//! Hook Registry - 감시 대상 → Hook 집합 side table
//!
//! Registry는 대상 객체를 역참조하지 않습니다. `WatchedEntity`는 조회 키일 뿐입니다.

use super::types::{HookFn, HookSet};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, trace};
use tripwire_foundation::{HookName, Result, WatchedEntity};

/// Registry 갱신 요청
#[derive(Debug, Clone)]
pub enum HookUpdate {
    /// 이름별로 덮어쓰기/추가
    Merge(HookSet),

    /// 항목 전체 제거
    Clear,
}

impl From<HookSet> for HookUpdate {
    fn from(set: HookSet) -> Self {
        Self::Merge(set)
    }
}

/// Hook Registry
///
/// 불변식: 저장된 HookSet은 절대 비어있지 않습니다.
#[derive(Default)]
pub struct HookRegistry {
    entries: RwLock<HashMap<WatchedEntity, HookSet>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hook 병합 또는 제거
    pub fn merge(&self, entity: &WatchedEntity, update: impl Into<HookUpdate>) -> Result<()> {
        entity.validate()?;

        match update.into() {
            HookUpdate::Clear => {
                let removed = self.entries.write().remove(entity);
                if removed.is_some() {
                    debug!(target_entity = %entity, "Cleared hooks");
                }
            }
            HookUpdate::Merge(set) => {
                if set.is_empty() {
                    return Ok(());
                }
                let names = set.names();
                let replaced = self
                    .entries
                    .write()
                    .entry(entity.clone())
                    .or_default()
                    .merge(set);
                // 교체된 Hook은 락 해제 후 drop
                drop(replaced);
                debug!(target_entity = %entity, hooks = ?names, "Merged hooks");
            }
        }

        Ok(())
    }

    /// 대상의 Hook 집합 (없으면 None)
    pub fn lookup(&self, entity: &WatchedEntity) -> Option<HookSet> {
        self.entries.read().get(entity).cloned()
    }

    /// lineage(구체적인 순서)를 따라 첫 번째로 등록된 Hook 반환
    ///
    /// 반환 전에 락을 해제하므로 호출자는 Hook을 자유롭게 실행할 수 있습니다.
    pub fn resolve(&self, lineage: &[WatchedEntity], hook: HookName) -> Option<HookFn> {
        let entries = self.entries.read();
        let found = lineage
            .iter()
            .find_map(|entity| entries.get(entity).and_then(|set| set.get(hook)).cloned());
        trace!(hook = %hook, found = found.is_some(), "Resolved hook");
        found
    }

    /// Hook 하나 제거 (비면 항목 제거)
    pub fn remove_hook(&self, entity: &WatchedEntity, hook: HookName) -> bool {
        let removed = {
            let mut entries = self.entries.write();
            let Some(set) = entries.get_mut(entity) else {
                return false;
            };
            let removed = set.remove(hook);
            if set.is_empty() {
                entries.remove(entity);
            }
            removed
        };
        removed.is_some()
    }

    /// 항목 제거 (제거된 집합은 락 밖에서 반환)
    pub fn remove(&self, entity: &WatchedEntity) -> Option<HookSet> {
        self.entries.write().remove(entity)
    }

    pub fn contains(&self, entity: &WatchedEntity) -> bool {
        self.entries.read().contains_key(entity)
    }

    pub fn entities(&self) -> Vec<WatchedEntity> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// 모든 항목 제거
    pub fn clear(&self) {
        // 락 밖에서 drop (Hook 클로저의 Drop이 Registry에 접근할 수 있음)
        let drained = std::mem::take(&mut *self.entries.write());
        debug!(count = drained.len(), "Cleared hook registry");
        drop(drained);
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityCell, Storage};
    use crate::hook::{DispatchMode, HookCall, HookOutcome};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tripwire_foundation::{EntityId, Error, GlobalFacility, Locator, Shape};

    fn accept_all() -> HookSet {
        HookSet::new().on_set_item(|_| Ok(HookOutcome::Accept))
    }

    #[test]
    fn test_merge_is_idempotent() {
        let registry = HookRegistry::new();
        let entity = WatchedEntity::Type("Point".into());

        registry.merge(&entity, accept_all()).unwrap();
        registry.merge(&entity, accept_all()).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(&entity).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_merge_never_creates_entry() {
        let registry = HookRegistry::new();
        let entity = WatchedEntity::Global(GlobalFacility::AllSets);

        registry.merge(&entity, HookSet::new()).unwrap();
        assert!(!registry.contains(&entity));
        assert!(registry.lookup(&entity).is_none());
    }

    #[test]
    fn test_clear_absent_entry_is_ok() {
        let registry = HookRegistry::new();
        let entity = WatchedEntity::Instance(EntityId::next());
        assert!(registry.merge(&entity, HookUpdate::Clear).is_ok());
    }

    #[test]
    fn test_invalid_entity_rejected() {
        let registry = HookRegistry::new();
        let err = registry
            .merge(&WatchedEntity::Instance(EntityId::from_raw(0)), accept_all())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEntity(_)));
        assert!(registry.is_empty());
    }

    fn replace_with(tag: &'static str) -> HookSet {
        HookSet::new().on_set_item(move |_| Ok(HookOutcome::Replace(json!(tag))))
    }

    fn call_resolved(hook: &HookFn, cell: &EntityCell) -> HookOutcome {
        let locator = Locator::Index(0);
        let proposed = json!(1);
        let outcome = hook(&HookCall {
            entity: cell,
            hook: HookName::OnSetItem,
            locator: &locator,
            old: None,
            proposed: Some(&proposed),
            mode: DispatchMode::Advisory,
        });
        outcome.unwrap()
    }

    #[test]
    fn test_resolve_prefers_most_specific() {
        let registry = HookRegistry::new();
        let cell = EntityCell::new("list", Storage::empty(Shape::Sequence));
        let lineage = cell.lineage();
        let instance = lineage[0].clone();
        let global = WatchedEntity::Global(GlobalFacility::AllSequences);

        registry.merge(&global, replace_with("global")).unwrap();
        registry
            .merge(
                &global,
                HookSet::new().on_delete_item(|_| Ok(HookOutcome::Abort)),
            )
            .unwrap();
        registry.merge(&instance, replace_with("instance")).unwrap();

        let hook = registry.resolve(&lineage, HookName::OnSetItem).unwrap();
        assert_eq!(
            call_resolved(&hook, &cell),
            HookOutcome::Replace(json!("instance"))
        );

        // 인스턴스에 없는 이름은 전역에서 상속
        assert!(registry.resolve(&lineage, HookName::OnDeleteItem).is_some());
        assert!(registry.resolve(&lineage, HookName::OnAddMember).is_none());
        assert!(registry.resolve(&[instance], HookName::OnDeleteItem).is_none());

        let hook = registry.resolve(&lineage[1..], HookName::OnSetItem).unwrap();
        assert_eq!(
            call_resolved(&hook, &cell),
            HookOutcome::Replace(json!("global"))
        );
    }

    /// drop 시 Registry를 읽는 값
    struct ReadsRegistryOnDrop {
        registry: Arc<HookRegistry>,
        seen_len: Arc<AtomicUsize>,
    }

    impl Drop for ReadsRegistryOnDrop {
        fn drop(&mut self) {
            self.seen_len.store(self.registry.len(), Ordering::SeqCst);
        }
    }

    #[test]
    fn test_replaced_hook_dropped_outside_lock() {
        let registry = Arc::new(HookRegistry::new());
        let entity = WatchedEntity::Type("Point".into());
        let seen_len = Arc::new(AtomicUsize::new(usize::MAX));

        let guard = ReadsRegistryOnDrop {
            registry: Arc::clone(&registry),
            seen_len: Arc::clone(&seen_len),
        };
        registry
            .merge(
                &entity,
                HookSet::new().on_set_item(move |_| {
                    let _keep = &guard;
                    Ok(HookOutcome::Accept)
                }),
            )
            .unwrap();

        // 교체된 클로저의 Drop이 Registry를 읽어도 교착되지 않음
        registry.merge(&entity, accept_all()).unwrap();
        assert_eq!(seen_len.load(Ordering::SeqCst), 1);

        registry.clear();
    }

    #[test]
    fn test_removed_hook_dropped_outside_lock() {
        let registry = Arc::new(HookRegistry::new());
        let entity = WatchedEntity::Type("Point".into());
        let seen_len = Arc::new(AtomicUsize::new(usize::MAX));

        let guard = ReadsRegistryOnDrop {
            registry: Arc::clone(&registry),
            seen_len: Arc::clone(&seen_len),
        };
        registry
            .merge(
                &entity,
                HookSet::new().on_set_item(move |_| {
                    let _keep = &guard;
                    Ok(HookOutcome::Accept)
                }),
            )
            .unwrap();

        assert!(registry.remove_hook(&entity, HookName::OnSetItem));
        assert_eq!(seen_len.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_remove_last_hook_removes_entry() {
        let registry = HookRegistry::new();
        let entity = WatchedEntity::Type("Point".into());
        registry.merge(&entity, accept_all()).unwrap();

        assert!(registry.remove_hook(&entity, HookName::OnSetItem));
        assert!(!registry.contains(&entity));
        assert!(!registry.remove_hook(&entity, HookName::OnSetItem));
    }
}
