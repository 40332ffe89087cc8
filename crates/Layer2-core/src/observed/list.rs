//! ObservedList - 인덱스 기반 시퀀스

use super::Observed;
use crate::context::InterceptionContext;
use crate::dispatch::Mutation;
use crate::entity::{EntityCell, Storage};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tripwire_foundation::{Error, Locator, Result};

/// 관찰 리스트 핸들
#[derive(Clone)]
pub struct ObservedList {
    cell: Arc<EntityCell>,
    ctx: Arc<InterceptionContext>,
}

impl ObservedList {
    pub(crate) fn new(cell: Arc<EntityCell>, ctx: Arc<InterceptionContext>) -> Self {
        Self { cell, ctx }
    }

    fn run(&self, mutation: Mutation) -> Result<()> {
        self.ctx.dispatch(&self.cell, mutation).map(|_| ())
    }

    // ========================================================================
    // 읽기
    // ========================================================================

    pub fn get(&self, index: usize) -> Option<Value> {
        self.cell.read(&Locator::Index(index))
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.cell.with_storage(|storage| match storage {
            Storage::Sequence(items) => items.contains(value),
            _ => false,
        })
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.cell.with_storage(|storage| match storage {
            Storage::Sequence(items) => items.clone(),
            _ => Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.cell.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell.is_empty()
    }

    // ========================================================================
    // Advisory 변경
    // ========================================================================

    /// 위치에 할당 (범위 밖이면 IndexOutOfRange)
    pub fn set(&self, index: usize, value: Value) -> Result<()> {
        self.run(Mutation::assign(Locator::Index(index), value))
    }

    /// 위치 삭제 (뒤 요소는 앞으로 이동)
    pub fn delete(&self, index: usize) -> Result<()> {
        self.run(Mutation::delete(Locator::Index(index)))
    }

    // ========================================================================
    // Notify-only 변경
    // ========================================================================

    pub fn append(&self, value: Value) -> Result<()> {
        self.run(Mutation::Append(value))
    }

    /// 삽입 (범위를 넘으면 끝에 추가)
    pub fn insert(&self, index: usize, value: Value) -> Result<()> {
        self.run(Mutation::Insert { index, value })
    }

    pub fn extend(&self, values: impl IntoIterator<Item = Value>) -> Result<()> {
        self.run(Mutation::Extend(values.into_iter().collect()))
    }

    /// 값을 꺼냄 (None이면 마지막 요소)
    pub fn pop(&self, index: Option<usize>) -> Result<Value> {
        self.ctx
            .dispatch(&self.cell, Mutation::Pop(index))?
            .output
            .ok_or_else(|| Error::Internal("pop handler reported no value".to_string()))
    }

    /// 첫 번째로 같은 값 제거 (없으면 ValueNotFound)
    pub fn remove(&self, value: Value) -> Result<()> {
        self.run(Mutation::Remove(value))
    }

    pub fn clear(&self) -> Result<()> {
        self.run(Mutation::Clear)
    }
}

impl Observed for ObservedList {
    fn cell(&self) -> &Arc<EntityCell> {
        &self.cell
    }

    fn context(&self) -> &Arc<InterceptionContext> {
        &self.ctx
    }
}

impl fmt::Debug for ObservedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedList")
            .field("id", &self.cell.id())
            .field("items", &self.to_vec())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::{HookOutcome, HookSet};
    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn test_positional_ops_without_hooks() {
        let ctx = InterceptionContext::new();
        let list = ctx.list_from([json!("a")]);

        list.append(json!("c")).unwrap();
        list.insert(1, json!("b")).unwrap();
        list.extend([json!("d"), json!("e")]).unwrap();
        assert_eq!(list.pop(None).unwrap(), json!("e"));
        assert_eq!(list.pop(Some(0)).unwrap(), json!("a"));
        list.remove(json!("c")).unwrap();

        assert_eq!(list.to_vec(), vec![json!("b"), json!("d")]);
        assert!(matches!(
            list.set(5, json!(0)),
            Err(Error::IndexOutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn test_notify_positions_and_ignored_abort() {
        let ctx = InterceptionContext::new();
        let list = ctx.list_from([json!(1), json!(2)]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sets = Arc::clone(&seen);
        let deletes = Arc::clone(&seen);
        list.watch(
            HookSet::new()
                .on_set_item(move |call| {
                    sets.lock().push((call.path(), call.proposed.cloned()));
                    Ok(HookOutcome::Abort)
                })
                .on_delete_item(move |call| {
                    deletes.lock().push((call.path(), call.old.cloned()));
                    Ok(HookOutcome::Accept)
                }),
        )
        .unwrap();

        list.insert(0, json!(0)).unwrap();
        list.pop(None).unwrap();
        list.clear().unwrap();

        // notify-only 연산의 Abort는 무시됨
        assert!(list.is_empty());
        let seen = seen.lock();
        assert_eq!(seen[0], ("[0]".to_string(), Some(json!(0))));
        assert_eq!(seen[1], ("[2]".to_string(), Some(json!(2))));
        assert_eq!(seen.len(), 4);

        drop(seen);
        list.unwatch().unwrap();
    }
}
