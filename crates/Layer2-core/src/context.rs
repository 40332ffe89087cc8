//! Interception Context - 가로채기 엔진의 모든 상태를 소유하는 주입 가능한 컨텍스트
//!
//! 프로세스 전역 패치 테이블은 없습니다. 독립된 컨텍스트끼리(테스트 포함) 나란히 실행됩니다.
//!
//! ## 사용 예시
//! ```ignore
//! let ctx = InterceptionContext::new();
//! ctx.define_type(TypeDef::object("Point"))?;
//!
//! let point = ctx.new_object("Point")?;
//! let controller = PatchController::new(Arc::clone(&ctx));
//! controller.install(
//!     &TargetScope::of_type("Point"),
//!     Facility::AttributeSetter,
//!     Some(HookSet::new().on_set_attribute(|call| {
//!         println!("{} -> {:?}", call.locator, call.proposed);
//!         Ok(HookOutcome::Accept)
//!     })),
//! )?;
//!
//! point.set("x", json!(1))?;
//! controller.teardown();
//! ```

use crate::dispatch::{Applied, DefaultHandler, DispatchTable, HandlerCall, Mutation, MutationHandler};
use crate::entity::{EntityCell, Storage, TypeDef, TypeTable};
use crate::hook::HookRegistry;
use crate::observed::{ObservedList, ObservedMap, ObservedObject, ObservedSet};
use crate::vault::{HandlerVault, SavedHandler};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{trace, warn};
use tripwire_foundation::{
    EntityId, Error, EventBus, EventBusConfig, Facility, InterceptionConfig, Result, Shape,
    WatchedEntity,
};

/// 가로채기 컨텍스트
pub struct InterceptionContext {
    config: InterceptionConfig,
    registry: HookRegistry,
    vault: HandlerVault,
    slots: DispatchTable,
    types: TypeTable,
    events: EventBus,

    /// 인스턴스 생존 확인용 (약한 참조)
    instances: RwLock<HashMap<EntityId, Weak<EntityCell>>>,

    default_handler: Arc<dyn MutationHandler>,
}

impl InterceptionContext {
    pub fn new() -> Arc<Self> {
        Self::with_config(InterceptionConfig::default())
    }

    pub fn with_config(config: InterceptionConfig) -> Arc<Self> {
        let events = EventBus::with_config(EventBusConfig {
            channel_capacity: config.event_capacity,
            history_size: config.event_history,
        });

        Arc::new(Self {
            config,
            registry: HookRegistry::new(),
            vault: HandlerVault::new(),
            slots: DispatchTable::new(),
            types: TypeTable::new(),
            events,
            instances: RwLock::new(HashMap::new()),
            default_handler: Arc::new(DefaultHandler),
        })
    }

    /// 전역 + 프로젝트 설정으로 생성
    pub fn load() -> Result<Arc<Self>> {
        Ok(Self::with_config(InterceptionConfig::load()?))
    }

    // ========================================================================
    // 구성 요소 접근
    // ========================================================================

    pub fn config(&self) -> &InterceptionConfig {
        &self.config
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    pub fn vault(&self) -> &HandlerVault {
        &self.vault
    }

    pub fn slots(&self) -> &DispatchTable {
        &self.slots
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn define_type(&self, def: TypeDef) -> Result<()> {
        self.types.define(def)
    }

    // ========================================================================
    // 인스턴스
    // ========================================================================

    /// 살아있는 인스턴스 조회
    pub fn instance(&self, id: EntityId) -> Option<Arc<EntityCell>> {
        self.instances.read().get(&id).and_then(Weak::upgrade)
    }

    /// 타입 확인 후 인스턴스 생성
    fn spawn(&self, type_name: &str, storage: Storage) -> Result<Arc<EntityCell>> {
        let def = self.types.require(type_name)?;
        if def.shape != storage.shape() {
            return Err(Error::ShapeMismatch {
                expected: def.shape,
                found: storage.shape(),
            });
        }

        Ok(self.track(EntityCell::new(type_name, storage)))
    }

    /// 내장 타입 인스턴스 생성 (실패하지 않음)
    fn spawn_builtin(&self, storage: Storage) -> Arc<EntityCell> {
        let type_name = storage.shape().builtin_type().unwrap_or("object");
        self.track(EntityCell::new(type_name, storage))
    }

    /// 생존 맵에 등록 (이미 drop된 인스턴스는 함께 정리)
    fn track(&self, cell: EntityCell) -> Arc<EntityCell> {
        let cell = Arc::new(cell);
        let mut instances = self.instances.write();
        instances.retain(|_, weak| weak.strong_count() > 0);
        instances.insert(cell.id(), Arc::downgrade(&cell));
        trace!(entity = %cell.id(), type_name = cell.type_name(), "Spawned entity");
        cell
    }

    /// 생존 맵에 남아 있는 항목 수 (drop된 인스턴스 포함)
    pub fn tracked_instances(&self) -> usize {
        self.instances.read().len()
    }

    pub fn new_object(self: &Arc<Self>, type_name: &str) -> Result<ObservedObject> {
        let cell = self.spawn(type_name, Storage::empty(Shape::Object))?;
        Ok(ObservedObject::new(cell, Arc::clone(self)))
    }

    pub fn new_list(self: &Arc<Self>) -> ObservedList {
        self.list_from(Vec::<Value>::new())
    }

    pub fn list_from(self: &Arc<Self>, items: impl IntoIterator<Item = Value>) -> ObservedList {
        let cell = self.spawn_builtin(Storage::sequence(items));
        ObservedList::new(cell, Arc::clone(self))
    }

    pub fn new_list_of(
        self: &Arc<Self>,
        type_name: &str,
        items: impl IntoIterator<Item = Value>,
    ) -> Result<ObservedList> {
        let cell = self.spawn(type_name, Storage::sequence(items))?;
        Ok(ObservedList::new(cell, Arc::clone(self)))
    }

    pub fn new_map(self: &Arc<Self>) -> ObservedMap {
        self.map_from(Vec::<(String, Value)>::new())
    }

    pub fn map_from<K: Into<String>>(
        self: &Arc<Self>,
        entries: impl IntoIterator<Item = (K, Value)>,
    ) -> ObservedMap {
        let cell = self.spawn_builtin(Storage::mapping(entries));
        ObservedMap::new(cell, Arc::clone(self))
    }

    pub fn new_map_of<K: Into<String>>(
        self: &Arc<Self>,
        type_name: &str,
        entries: impl IntoIterator<Item = (K, Value)>,
    ) -> Result<ObservedMap> {
        let cell = self.spawn(type_name, Storage::mapping(entries))?;
        Ok(ObservedMap::new(cell, Arc::clone(self)))
    }

    pub fn new_set(self: &Arc<Self>) -> ObservedSet {
        self.set_from(Vec::<Value>::new())
    }

    pub fn set_from(self: &Arc<Self>, members: impl IntoIterator<Item = Value>) -> ObservedSet {
        let cell = self.spawn_builtin(Storage::set(members));
        ObservedSet::new(cell, Arc::clone(self))
    }

    pub fn new_set_of(
        self: &Arc<Self>,
        type_name: &str,
        members: impl IntoIterator<Item = Value>,
    ) -> Result<ObservedSet> {
        let cell = self.spawn(type_name, Storage::set(members))?;
        Ok(ObservedSet::new(cell, Arc::clone(self)))
    }

    // ========================================================================
    // 디스패치
    // ========================================================================

    /// 엔티티의 변경을 계보에서 가장 구체적인 슬롯으로 전달
    pub fn dispatch(&self, entity: &EntityCell, mutation: Mutation) -> Result<Applied> {
        let call = HandlerCall::new(self, entity);
        if self.slots.is_empty() {
            return self.default_handler.apply(&call, mutation);
        }

        let facility = entity.shape().facility();
        let handler = self
            .slots
            .resolve(&entity.lineage(), facility)
            .map(|(_, handler)| handler)
            .unwrap_or_else(|| Arc::clone(&self.default_handler));
        handler.apply(&call, mutation)
    }

    /// Trampoline이 위임할 원래 핸들러
    ///
    /// `SavedHandler::Default`이면 덜 구체적인 수준에서 찾습니다:
    /// 해당 수준의 Vault 원본, 없으면 Trampoline이 아닌 슬롯, 없으면 내장 기본 핸들러.
    pub fn original_for(
        &self,
        target: &WatchedEntity,
        facility: Facility,
        entity: &EntityCell,
    ) -> Result<Arc<dyn MutationHandler>> {
        match self.vault.get(target, facility) {
            Some(SavedHandler::Original(handler)) => Ok(handler),
            Some(SavedHandler::Default) => Ok(self.fallback_below(target, facility, entity)),
            None => Err(Error::OriginalHandlerMissing {
                target: target.to_string(),
                facility,
            }),
        }
    }

    fn fallback_below(
        &self,
        target: &WatchedEntity,
        facility: Facility,
        entity: &EntityCell,
    ) -> Arc<dyn MutationHandler> {
        let levels = entity.lineage();
        for level in levels
            .iter()
            .filter(|level| level.specificity() > target.specificity())
        {
            match self.vault.get(level, facility) {
                Some(SavedHandler::Original(handler)) => return handler,
                Some(SavedHandler::Default) => continue,
                None => {}
            }
            if let Some(handler) = self.slots.get(level, facility) {
                if !handler.is_trampoline() {
                    return handler;
                }
            }
        }
        Arc::clone(&self.default_handler)
    }
}

impl Drop for InterceptionContext {
    fn drop(&mut self) {
        if !self.vault.is_empty() {
            warn!(
                patched = self.vault.len(),
                "InterceptionContext dropped with live patches; call teardown() first"
            );
        }
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::FnHandler;
    use crate::observed::Observed;
    use serde_json::json;
    use tripwire_foundation::{GlobalFacility, Locator};

    #[test]
    fn test_unwatched_dispatch_uses_default() {
        let ctx = InterceptionContext::new();
        let list = ctx.list_from([json!(1)]);
        let applied = ctx
            .dispatch(list.cell(), Mutation::Append(json!(2)))
            .unwrap();
        assert_eq!(applied.changes.len(), 1);
        assert_eq!(list.cell().snapshot(), json!([1, 2]));
    }

    #[test]
    fn test_spawn_checks_type_shape() {
        let ctx = InterceptionContext::new();
        ctx.define_type(TypeDef::object("Point")).unwrap();

        assert!(ctx.new_object("Point").is_ok());
        assert!(matches!(
            ctx.new_list_of("Point", Vec::<Value>::new()),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(ctx.new_object("Nope"), Err(Error::UnknownType(_))));
    }

    #[test]
    fn test_instance_liveness() {
        let ctx = InterceptionContext::new();
        let map = ctx.new_map();
        let id = map.id();
        assert!(ctx.instance(id).is_some());
        drop(map);
        assert!(ctx.instance(id).is_none());
    }

    #[test]
    fn test_dropped_builtins_are_pruned_on_spawn() {
        let ctx = InterceptionContext::new();
        for _ in 0..1000 {
            drop(ctx.new_list());
        }
        assert!(ctx.tracked_instances() <= 1);

        let keep = ctx.new_set();
        assert_eq!(ctx.tracked_instances(), 1);
        assert!(ctx.instance(keep.id()).is_some());
    }

    #[test]
    fn test_original_missing_without_vault_entry() {
        let ctx = InterceptionContext::new();
        let set = ctx.new_set();
        let target = WatchedEntity::Global(GlobalFacility::AllSets);
        let err = ctx
            .original_for(&target, Facility::MemberWriter, set.cell())
            .err()
            .unwrap();
        assert!(matches!(err, Error::OriginalHandlerMissing { .. }));
    }

    #[test]
    fn test_fallback_uses_less_specific_custom_handler() {
        let ctx = InterceptionContext::new();
        ctx.define_type(TypeDef::mapping("Config")).unwrap();
        let map = ctx.new_map_of("Config", Vec::<(String, Value)>::new()).unwrap();

        let custom: Arc<dyn MutationHandler> = Arc::new(FnHandler::new("upper", |call, m| {
            match m {
                Mutation::Assign { locator, value } => call.store(Mutation::Assign {
                    locator,
                    value: json!(value.as_str().unwrap_or_default().to_uppercase()),
                }),
                other => call.store(other),
            }
        }));
        let type_level = WatchedEntity::Type("Config".into());
        ctx.slots().set(&type_level, Facility::KeyWriter, custom);

        let instance = WatchedEntity::Instance(map.id());
        ctx.vault()
            .capture_once(&instance, Facility::KeyWriter, SavedHandler::Default);

        let original = ctx
            .original_for(&instance, Facility::KeyWriter, map.cell())
            .unwrap();
        assert_eq!(original.name(), "upper");

        original
            .apply(
                &HandlerCall::new(&ctx, map.cell()),
                Mutation::assign(Locator::Key("mode".into()), json!("fast")),
            )
            .unwrap();
        assert_eq!(map.get("mode"), Some(json!("FAST")));

        ctx.vault().restore_and_forget(&instance, Facility::KeyWriter);
    }
}
