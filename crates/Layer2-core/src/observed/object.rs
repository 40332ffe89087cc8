//! ObservedObject - 이름 있는 속성 슬롯을 가진 객체

use super::Observed;
use crate::context::InterceptionContext;
use crate::dispatch::Mutation;
use crate::entity::{EntityCell, Storage};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tripwire_foundation::{Locator, Result};

/// 관찰 객체 핸들
#[derive(Clone)]
pub struct ObservedObject {
    cell: Arc<EntityCell>,
    ctx: Arc<InterceptionContext>,
}

impl ObservedObject {
    pub(crate) fn new(cell: Arc<EntityCell>, ctx: Arc<InterceptionContext>) -> Self {
        Self { cell, ctx }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.cell.read(&Locator::Attribute(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 속성 이름 목록
    pub fn attributes(&self) -> Vec<String> {
        self.cell.with_storage(|storage| match storage {
            Storage::Object(attrs) => attrs.keys().cloned().collect(),
            _ => Vec::new(),
        })
    }

    /// 속성 할당 (advisory)
    pub fn set(&self, name: impl Into<String>, value: Value) -> Result<()> {
        self.ctx
            .dispatch(
                &self.cell,
                Mutation::assign(Locator::Attribute(name.into()), value),
            )
            .map(|_| ())
    }

    /// 속성 삭제 (advisory, 없으면 AttributeNotFound)
    pub fn delete(&self, name: impl Into<String>) -> Result<()> {
        self.ctx
            .dispatch(&self.cell, Mutation::delete(Locator::Attribute(name.into())))
            .map(|_| ())
    }

    pub fn len(&self) -> usize {
        self.cell.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell.is_empty()
    }
}

impl Observed for ObservedObject {
    fn cell(&self) -> &Arc<EntityCell> {
        &self.cell
    }

    fn context(&self) -> &Arc<InterceptionContext> {
        &self.ctx
    }
}

impl fmt::Debug for ObservedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedObject")
            .field("id", &self.cell.id())
            .field("type_name", &self.cell.type_name())
            .field("attributes", &self.cell.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::TypeDef;
    use crate::hook::{HookOutcome, HookSet};
    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn test_set_get_delete_without_hooks() {
        let ctx = InterceptionContext::new();
        ctx.define_type(TypeDef::object("Point")).unwrap();
        let point = ctx.new_object("Point").unwrap();

        point.set("x", json!(1)).unwrap();
        point.set("y", json!(2)).unwrap();
        assert_eq!(point.attributes(), vec!["x", "y"]);

        point.delete("x").unwrap();
        assert!(!point.has("x"));
        assert_eq!(point.snapshot(), json!({"y": 2}));
    }

    #[test]
    fn test_watch_instance_only() {
        let ctx = InterceptionContext::new();
        ctx.define_type(TypeDef::object("Point")).unwrap();
        let watched = ctx.new_object("Point").unwrap();
        let other = ctx.new_object("Point").unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        watched
            .watch(HookSet::new().on_set_attribute(move |call| {
                sink.lock().push(call.path());
                Ok(HookOutcome::Accept)
            }))
            .unwrap();

        watched.set("x", json!(1)).unwrap();
        other.set("x", json!(1)).unwrap();
        assert_eq!(*seen.lock(), vec!["x"]);

        assert!(watched.unwatch().unwrap());
        watched.set("x", json!(2)).unwrap();
        assert_eq!(seen.lock().len(), 1);
    }
}
