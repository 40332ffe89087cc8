//! ObservedMap - 키 기반 매핑

use super::Observed;
use crate::context::InterceptionContext;
use crate::dispatch::Mutation;
use crate::entity::{EntityCell, Storage};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tripwire_foundation::{Locator, Result};

/// 관찰 매핑 핸들
#[derive(Clone)]
pub struct ObservedMap {
    cell: Arc<EntityCell>,
    ctx: Arc<InterceptionContext>,
}

impl ObservedMap {
    pub(crate) fn new(cell: Arc<EntityCell>, ctx: Arc<InterceptionContext>) -> Self {
        Self { cell, ctx }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.cell.read(&Locator::Key(key.to_string()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> Vec<String> {
        self.cell.with_storage(|storage| match storage {
            Storage::Mapping(entries) => entries.keys().cloned().collect(),
            _ => Vec::new(),
        })
    }

    pub fn to_map(&self) -> BTreeMap<String, Value> {
        self.cell.with_storage(|storage| match storage {
            Storage::Mapping(entries) => entries.clone(),
            _ => BTreeMap::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.cell.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell.is_empty()
    }

    /// 키 할당 (advisory)
    pub fn set(&self, key: impl Into<String>, value: Value) -> Result<()> {
        self.ctx
            .dispatch(&self.cell, Mutation::assign(Locator::Key(key.into()), value))
            .map(|_| ())
    }

    /// 키 삭제 (advisory, 없으면 KeyNotFound)
    pub fn delete(&self, key: impl Into<String>) -> Result<()> {
        self.ctx
            .dispatch(&self.cell, Mutation::delete(Locator::Key(key.into())))
            .map(|_| ())
    }

    /// 일괄 갱신 (notify-only, 값이 바뀐 키만 통지)
    pub fn update<K: Into<String>>(&self, entries: impl IntoIterator<Item = (K, Value)>) -> Result<()> {
        let pairs = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.ctx
            .dispatch(&self.cell, Mutation::Update(pairs))
            .map(|_| ())
    }

    pub fn clear(&self) -> Result<()> {
        self.ctx.dispatch(&self.cell, Mutation::Clear).map(|_| ())
    }
}

impl Observed for ObservedMap {
    fn cell(&self) -> &Arc<EntityCell> {
        &self.cell
    }

    fn context(&self) -> &Arc<InterceptionContext> {
        &self.ctx
    }
}

impl fmt::Debug for ObservedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedMap")
            .field("id", &self.cell.id())
            .field("type_name", &self.cell.type_name())
            .field("entries", &self.to_map())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::{HookOutcome, HookSet};
    use parking_lot::Mutex;
    use serde_json::json;
    use tripwire_foundation::Error;

    #[test]
    fn test_update_notifies_changed_keys_only() {
        let ctx = InterceptionContext::new();
        let map = ctx.map_from([("a", json!(1))]);

        let keys = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&keys);
        map.watch(HookSet::new().on_set_item(move |call| {
            sink.lock().push(call.path());
            Ok(HookOutcome::Accept)
        }))
        .unwrap();

        map.update([("a", json!(1)), ("b", json!(2))]).unwrap();
        assert_eq!(*keys.lock(), vec!["[b]"]);
        assert_eq!(map.keys(), vec!["a", "b"]);

        map.unwatch().unwrap();
    }

    #[test]
    fn test_delete_missing_key() {
        let ctx = InterceptionContext::new();
        let map = ctx.new_map();
        assert!(matches!(map.delete("nope"), Err(Error::KeyNotFound(_))));
    }
}
