//! EntityCell - 감시 가능한 컨테이너 하나의 상태

use super::storage::Storage;
use crate::dispatch::{Applied, Mutation};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use tripwire_foundation::{EntityId, Locator, Result, Shape, WatchedEntity};

/// 컨테이너 인스턴스
///
/// 저장소 락은 기본 변경 동작을 적용하는 동안에만 잡힙니다.
/// Hook이나 핸들러가 실행되는 동안에는 잡히지 않으므로 재진입이 안전합니다.
pub struct EntityCell {
    id: EntityId,
    type_name: String,
    shape: Shape,
    storage: Mutex<Storage>,
}

impl EntityCell {
    pub(crate) fn new(type_name: impl Into<String>, storage: Storage) -> Self {
        Self {
            id: EntityId::next(),
            type_name: type_name.into(),
            shape: storage.shape(),
            storage: Mutex::new(storage),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// 위치의 현재 값 (없으면 None)
    pub fn read(&self, locator: &Locator) -> Option<Value> {
        self.storage.lock().read(locator)
    }

    pub fn snapshot(&self) -> Value {
        self.storage.lock().snapshot()
    }

    pub fn len(&self) -> usize {
        self.storage.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 저장소 읽기 접근
    pub fn with_storage<R>(&self, f: impl FnOnce(&Storage) -> R) -> R {
        f(&self.storage.lock())
    }

    /// 감시 대상 계보 (구체적인 순서: 인스턴스 → 타입 → 전역)
    pub fn lineage(&self) -> Vec<WatchedEntity> {
        let mut lineage = vec![
            WatchedEntity::Instance(self.id),
            WatchedEntity::Type(self.type_name.clone()),
        ];
        if let Some(tag) = self.shape.global() {
            lineage.push(WatchedEntity::Global(tag));
        }
        lineage
    }

    /// 기본 변경 동작 적용 (가로채기 없음)
    pub(crate) fn store(&self, mutation: Mutation) -> Result<Applied> {
        self.storage.lock().apply(mutation)
    }
}

impl fmt::Debug for EntityCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCell")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}
