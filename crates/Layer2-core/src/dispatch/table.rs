//! Dispatch Table - `(target, facility)` → 현재 설치된 핸들러
//!
//! 관찰 컨테이너는 모든 변경을 계보에서 가장 구체적인 슬롯으로 보냅니다.
//! 슬롯이 없으면 내장 기본 핸들러가 처리합니다.

use super::handler::MutationHandler;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tripwire_foundation::{Facility, WatchedEntity};

type SlotKey = (WatchedEntity, Facility);

/// 디스패치 슬롯 테이블
#[derive(Default)]
pub struct DispatchTable {
    slots: RwLock<HashMap<SlotKey, Arc<dyn MutationHandler>>>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, target: &WatchedEntity, facility: Facility) -> Option<Arc<dyn MutationHandler>> {
        self.slots.read().get(&(target.clone(), facility)).cloned()
    }

    /// 슬롯 설정 (이전 핸들러 반환)
    pub fn set(
        &self,
        target: &WatchedEntity,
        facility: Facility,
        handler: Arc<dyn MutationHandler>,
    ) -> Option<Arc<dyn MutationHandler>> {
        self.slots.write().insert((target.clone(), facility), handler)
    }

    /// 슬롯 비우기
    pub fn clear(&self, target: &WatchedEntity, facility: Facility) -> Option<Arc<dyn MutationHandler>> {
        self.slots.write().remove(&(target.clone(), facility))
    }

    /// 계보를 따라 가장 구체적인 슬롯
    pub fn resolve(
        &self,
        lineage: &[WatchedEntity],
        facility: Facility,
    ) -> Option<(WatchedEntity, Arc<dyn MutationHandler>)> {
        let slots = self.slots.read();
        lineage.iter().find_map(|entity| {
            slots
                .get(&(entity.clone(), facility))
                .map(|handler| (entity.clone(), Arc::clone(handler)))
        })
    }

    /// 슬롯에 Trampoline이 있는지 확인
    pub fn is_trampoline(&self, target: &WatchedEntity, facility: Facility) -> bool {
        self.get(target, facility)
            .map_or(false, |handler| handler.is_trampoline())
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DefaultHandler;
    use tripwire_foundation::{EntityId, GlobalFacility};

    #[test]
    fn test_resolve_most_specific() {
        let table = DispatchTable::new();
        let instance = WatchedEntity::Instance(EntityId::next());
        let global = WatchedEntity::Global(GlobalFacility::AllSequences);

        table.set(&global, Facility::IndexWriter, Arc::new(DefaultHandler));
        let lineage = vec![instance.clone(), global.clone()];
        let (level, _) = table.resolve(&lineage, Facility::IndexWriter).unwrap();
        assert_eq!(level, global);

        table.set(&instance, Facility::IndexWriter, Arc::new(DefaultHandler));
        let (level, _) = table.resolve(&lineage, Facility::IndexWriter).unwrap();
        assert_eq!(level, instance);

        assert!(table.resolve(&lineage, Facility::KeyWriter).is_none());
        assert!(!table.is_trampoline(&instance, Facility::IndexWriter));

        table.clear(&instance, Facility::IndexWriter);
        assert_eq!(table.len(), 1);
    }
}
