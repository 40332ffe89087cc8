//! Patch Controller - 패치 설치/해제/전체 복원
//!
//! 대상 범위를 분류하고, 슬롯의 기존 핸들러를 정확히 한 번 Vault에 저장한 뒤
//! Trampoline을 설치합니다. Vault와 Registry는 수동적이며 상태 전이는 컨트롤러만 수행합니다.

use crate::context::InterceptionContext;
use crate::dispatch::{channel_for, MutationHandler, Trampoline};
use crate::entity::{EntityCell, TypeDef};
use crate::hook::{HookSet, HookUpdate};
use crate::vault::{RestoreReport, SavedHandler};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info};
use tripwire_foundation::{
    EntityId, Error, Facility, GlobalFacility, InterceptionEvent, InterceptionEventKind, Result,
    WatchedEntity,
};

// ============================================================================
// TargetScope - 패치 범위
// ============================================================================

/// 패치 대상 범위
#[derive(Clone)]
pub enum TargetScope {
    /// 단일 인스턴스 (생존 확인용 약한 참조 포함)
    Instance { id: EntityId, cell: Weak<EntityCell> },

    /// 타입 전체
    Type(String),

    /// 내장 컨테이너 전역 facility
    Global(GlobalFacility),
}

impl TargetScope {
    pub fn instance(cell: &Arc<EntityCell>) -> Self {
        Self::Instance {
            id: cell.id(),
            cell: Arc::downgrade(cell),
        }
    }

    pub fn of_type(name: impl Into<String>) -> Self {
        Self::Type(name.into())
    }

    pub fn global(tag: GlobalFacility) -> Self {
        Self::Global(tag)
    }

    /// Registry/Vault 조회 키
    pub fn entity(&self) -> WatchedEntity {
        match self {
            Self::Instance { id, .. } => WatchedEntity::Instance(*id),
            Self::Type(name) => WatchedEntity::Type(name.clone()),
            Self::Global(tag) => WatchedEntity::Global(*tag),
        }
    }
}

impl fmt::Debug for TargetScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetScope({})", self.entity())
    }
}

impl From<GlobalFacility> for TargetScope {
    fn from(tag: GlobalFacility) -> Self {
        Self::Global(tag)
    }
}

// ============================================================================
// PatchController
// ============================================================================

/// 패치 컨트롤러
#[derive(Clone)]
pub struct PatchController {
    ctx: Arc<InterceptionContext>,
}

impl PatchController {
    pub fn new(ctx: Arc<InterceptionContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<InterceptionContext> {
        &self.ctx
    }

    /// Trampoline 설치
    ///
    /// 이미 설치되어 있으면 Hook만 병합하고 `false`를 반환합니다
    /// (`strictInstall` 설정 시 `AlreadyPatched`).
    pub fn install(
        &self,
        scope: &TargetScope,
        facility: Facility,
        hooks: Option<HookSet>,
    ) -> Result<bool> {
        self.prune_dropped();
        self.validate(scope, facility, hooks.as_ref())?;

        let target = scope.entity();
        let slots = self.ctx.slots();
        let active = slots.is_trampoline(&target, facility);

        if let Some(hooks) = hooks {
            self.ctx.registry().merge(&target, HookUpdate::Merge(hooks))?;
        }

        if active {
            debug!(target_entity = %target, facility = %facility, "Already patched, hooks merged");
            return Ok(false);
        }

        let current = slots
            .get(&target, facility)
            .map(SavedHandler::Original)
            .unwrap_or(SavedHandler::Default);
        self.ctx.vault().capture_once(&target, facility, current);
        slots.set(
            &target,
            facility,
            Arc::new(Trampoline::new(target.clone(), channel_for(facility))),
        );

        info!(target_entity = %target, facility = %facility, "Installed trampoline");
        self.ctx.events().publish(
            InterceptionEvent::new(InterceptionEventKind::Installed).on(&target, facility),
        );
        Ok(true)
    }

    /// Trampoline 제거 및 원래 핸들러 복원 (설치되지 않았으면 `false`)
    pub fn uninstall(&self, scope: &TargetScope, facility: Facility) -> Result<bool> {
        let target = scope.entity();
        let Some(saved) = self.ctx.vault().restore_and_forget(&target, facility) else {
            return Ok(false);
        };

        self.reinstall(&target, facility, saved);
        self.ctx.registry().merge(&target, HookUpdate::Clear)?;

        info!(target_entity = %target, facility = %facility, "Uninstalled trampoline");
        self.ctx.events().publish(
            InterceptionEvent::new(InterceptionEventKind::Uninstalled).on(&target, facility),
        );
        Ok(true)
    }

    /// 모든 패치 복원 및 Registry 비우기
    ///
    /// 컨텍스트를 버리기 전에 반드시 호출해야 합니다.
    pub fn teardown(&self) -> RestoreReport {
        let ctx = &self.ctx;
        let report = ctx.vault().restore_all(|target, facility, saved| {
            if let WatchedEntity::Instance(id) = target {
                if ctx.instance(*id).is_none() {
                    ctx.slots().clear(target, facility);
                    return Err(Error::InvalidEntity(format!(
                        "{} was dropped before teardown",
                        target
                    )));
                }
            }
            self.reinstall(target, facility, saved);
            ctx.events().publish(
                InterceptionEvent::new(InterceptionEventKind::Restored).on(target, facility),
            );
            Ok(())
        });

        for failure in &report.failures {
            ctx.events().publish(
                InterceptionEvent::new(InterceptionEventKind::RestoreFailed)
                    .on(&failure.target, failure.facility)
                    .with_detail(failure.error.to_string()),
            );
        }

        ctx.registry().clear();

        info!(
            restored = report.restored.len(),
            failed = report.failures.len(),
            "Teardown complete"
        );
        ctx.events().publish(
            InterceptionEvent::new(InterceptionEventKind::TornDown).with_detail(format!(
                "{} restored, {} failed",
                report.restored.len(),
                report.failures.len()
            )),
        );
        report
    }

    /// 설치 전 검증 (상태를 바꾸지 않음)
    pub(crate) fn validate(
        &self,
        scope: &TargetScope,
        facility: Facility,
        hooks: Option<&HookSet>,
    ) -> Result<()> {
        let target = scope.entity();
        target.validate()?;
        self.check_scope(scope, facility)?;
        if let Some(hooks) = hooks {
            hooks.validate_for(facility)?;
        }

        if self.ctx.config().strict_install && self.ctx.slots().is_trampoline(&target, facility) {
            return Err(Error::AlreadyPatched {
                target: target.to_string(),
                facility,
            });
        }
        Ok(())
    }

    /// drop된 인스턴스의 Hook, Vault 항목, 슬롯 정리
    ///
    /// 정리한 인스턴스 수를 반환합니다. `install`마다 먼저 실행됩니다.
    pub fn prune_dropped(&self) -> usize {
        let ctx = &self.ctx;
        let dead: HashSet<WatchedEntity> = ctx
            .vault()
            .entries()
            .into_iter()
            .map(|(target, _)| target)
            .chain(ctx.registry().entities())
            .filter(|target| match target {
                WatchedEntity::Instance(id) => ctx.instance(*id).is_none(),
                _ => false,
            })
            .collect();

        for target in &dead {
            let released = ctx.vault().forget_target(target);
            let cleared: Vec<_> = Facility::ALL
                .into_iter()
                .filter_map(|facility| ctx.slots().clear(target, facility))
                .collect();
            let hooks = ctx.registry().remove(target);

            debug!(
                target_entity = %target,
                facilities = released.len(),
                slots = cleared.len(),
                hooks = hooks.as_ref().map_or(0, HookSet::len),
                "Pruned dropped instance"
            );
            for (facility, _) in &released {
                ctx.events().publish(
                    InterceptionEvent::new(InterceptionEventKind::Uninstalled)
                        .on(target, *facility)
                        .with_detail("instance dropped"),
                );
            }
        }

        dead.len()
    }

    /// 대상에 Trampoline이 하나라도 설치되어 있는지
    pub fn is_patched(&self, scope: &TargetScope) -> bool {
        self.ctx.vault().contains_target(&scope.entity())
    }

    /// 진단용 원래 핸들러 조회
    pub fn original_handler(&self, scope: &TargetScope, facility: Facility) -> Result<SavedHandler> {
        let target = scope.entity();
        self.ctx
            .vault()
            .get(&target, facility)
            .ok_or_else(|| Error::NoOriginalRecorded {
                target: target.to_string(),
                facility,
            })
    }

    /// 패치된 대상 목록
    pub fn patched_targets(&self) -> Vec<WatchedEntity> {
        let mut seen = HashSet::new();
        self.ctx
            .vault()
            .entries()
            .into_iter()
            .map(|(target, _)| target)
            .filter(|target| seen.insert(target.clone()))
            .collect()
    }

    /// 호스트 측 커스텀 핸들러를 슬롯에 정의 (클래스가 자체 setter를 정의하는 것에 해당)
    ///
    /// Trampoline이 슬롯을 점유 중이면 `AlreadyPatched`로 실패합니다.
    pub fn define_handler(
        &self,
        scope: &TargetScope,
        facility: Facility,
        handler: Arc<dyn MutationHandler>,
    ) -> Result<Option<Arc<dyn MutationHandler>>> {
        let target = scope.entity();
        target.validate()?;
        self.check_scope(scope, facility)?;

        if handler.is_trampoline() {
            return Err(Error::unpatchable(
                &target,
                "trampolines are installed by the controller only",
            ));
        }
        if self.ctx.slots().is_trampoline(&target, facility) {
            return Err(Error::AlreadyPatched {
                target: target.to_string(),
                facility,
            });
        }

        let name = handler.name().to_string();
        let previous = self.ctx.slots().set(&target, facility, handler);
        debug!(target_entity = %target, facility = %facility, handler = %name, "Defined handler");
        self.ctx.events().publish(
            InterceptionEvent::new(InterceptionEventKind::HandlerDefined)
                .on(&target, facility)
                .with_detail(name),
        );
        Ok(previous)
    }

    // ========================================================================
    // 내부
    // ========================================================================

    /// 범위와 facility 검증
    fn check_scope(&self, scope: &TargetScope, facility: Facility) -> Result<()> {
        let target = scope.entity();
        let shape = match scope {
            TargetScope::Instance { id, cell } => {
                let cell = cell.upgrade().ok_or_else(|| {
                    Error::InvalidEntity(format!("instance {} is no longer alive", id))
                })?;
                let owned = self
                    .ctx
                    .instance(*id)
                    .is_some_and(|live| Arc::ptr_eq(&live, &cell));
                if !owned {
                    return Err(Error::InvalidEntity(format!(
                        "instance {} belongs to another context",
                        id
                    )));
                }
                if let Some(def) = self.ctx.types().get(cell.type_name()) {
                    reject_sealed(&def)?;
                }
                cell.shape()
            }
            TargetScope::Type(name) => {
                let def = self.ctx.types().require(name)?;
                if def.builtin {
                    return Err(Error::NotHeapLike(format!(
                        "built-in type '{}' cannot be patched at type scope; use the global facility",
                        name
                    )));
                }
                reject_sealed(&def)?;
                def.shape
            }
            TargetScope::Global(tag) => tag.shape(),
        };

        if shape.facility() != facility {
            return Err(Error::unpatchable(
                &target,
                format!("{} has no {} (shape {})", target, facility, shape),
            ));
        }
        Ok(())
    }

    /// 저장된 핸들러를 슬롯에 되돌림
    fn reinstall(&self, target: &WatchedEntity, facility: Facility, saved: SavedHandler) {
        match saved {
            SavedHandler::Original(handler) => {
                self.ctx.slots().set(target, facility, handler);
            }
            SavedHandler::Default => {
                self.ctx.slots().clear(target, facility);
            }
        }
        debug!(target_entity = %target, facility = %facility, "Restored original handler");
    }
}

fn reject_sealed(def: &TypeDef) -> Result<()> {
    if def.sealed {
        return Err(Error::NotHeapLike(format!(
            "type '{}' is sealed",
            def.name
        )));
    }
    Ok(())
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::FnHandler;
    use crate::hook::HookOutcome;
    use crate::observed::Observed;
    use serde_json::json;

    fn setup() -> (Arc<InterceptionContext>, PatchController) {
        let ctx = InterceptionContext::new();
        let controller = PatchController::new(Arc::clone(&ctx));
        (ctx, controller)
    }

    #[test]
    fn test_install_is_idempotent() {
        let (ctx, controller) = setup();
        let scope = TargetScope::global(GlobalFacility::AllSequences);

        assert!(controller.install(&scope, Facility::IndexWriter, None).unwrap());
        assert!(!controller.install(&scope, Facility::IndexWriter, None).unwrap());
        assert_eq!(ctx.vault().len(), 1);
        assert!(controller.is_patched(&scope));

        controller.teardown();
    }

    #[test]
    fn test_strict_install_rejects_second_install() {
        let ctx = InterceptionContext::with_config(
            tripwire_foundation::InterceptionConfig::default().strict(),
        );
        let controller = PatchController::new(Arc::clone(&ctx));
        let scope = TargetScope::global(GlobalFacility::AllSets);

        controller.install(&scope, Facility::MemberWriter, None).unwrap();
        let err = controller
            .install(&scope, Facility::MemberWriter, None)
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyPatched { .. }));

        controller.teardown();
    }

    #[test]
    fn test_scope_classification() {
        let (ctx, controller) = setup();
        ctx.define_type(TypeDef::object("Frozen").sealed()).unwrap();
        ctx.define_type(TypeDef::object("Point")).unwrap();

        let err = controller
            .install(&TargetScope::of_type("list"), Facility::IndexWriter, None)
            .unwrap_err();
        assert!(matches!(err, Error::NotHeapLike(_)));

        let err = controller
            .install(&TargetScope::of_type("Frozen"), Facility::AttributeSetter, None)
            .unwrap_err();
        assert!(matches!(err, Error::NotHeapLike(_)));

        let frozen = ctx.new_object("Frozen").unwrap();
        let err = controller
            .install(&frozen.scope(), Facility::AttributeSetter, None)
            .unwrap_err();
        assert!(matches!(err, Error::NotHeapLike(_)));

        let err = controller
            .install(&TargetScope::of_type("Point"), Facility::KeyWriter, None)
            .unwrap_err();
        assert!(matches!(err, Error::Unpatchable { .. }));

        let err = controller
            .install(
                &TargetScope::global(GlobalFacility::AllMappings),
                Facility::MemberWriter,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, Error::Unpatchable { .. }));

        let err = controller
            .install(&TargetScope::of_type("Ghost"), Facility::AttributeSetter, None)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownType(_)));

        assert!(ctx.vault().is_empty());
    }

    #[test]
    fn test_inapplicable_hook_rejected() {
        let (ctx, controller) = setup();
        let hooks = HookSet::new().on_add_member(|_| Ok(HookOutcome::Accept));
        let err = controller
            .install(
                &TargetScope::global(GlobalFacility::AllSequences),
                Facility::IndexWriter,
                Some(hooks),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidHookValue(_)));
        assert!(ctx.registry().is_empty());
    }

    #[test]
    fn test_uninstall_restores_and_clears() {
        let (ctx, controller) = setup();
        let scope = TargetScope::global(GlobalFacility::AllMappings);
        controller
            .install(
                &scope,
                Facility::KeyWriter,
                Some(HookSet::new().on_set_item(|_| Ok(HookOutcome::Abort))),
            )
            .unwrap();

        let map = ctx.new_map();
        map.set("k", json!(1)).unwrap();
        assert_eq!(map.get("k"), None);

        assert!(controller.uninstall(&scope, Facility::KeyWriter).unwrap());
        assert!(!controller.uninstall(&scope, Facility::KeyWriter).unwrap());
        assert!(ctx.registry().is_empty());
        assert!(ctx.slots().is_empty());

        map.set("k", json!(1)).unwrap();
        assert_eq!(map.get("k"), Some(json!(1)));
    }

    #[test]
    fn test_original_handler_diagnostics() {
        let (ctx, controller) = setup();
        ctx.define_type(TypeDef::object("Point")).unwrap();
        let scope = TargetScope::of_type("Point");

        let err = controller
            .original_handler(&scope, Facility::AttributeSetter)
            .unwrap_err();
        assert!(matches!(err, Error::NoOriginalRecorded { .. }));

        let custom = Arc::new(FnHandler::new("point-setter", |call, m| call.store(m)));
        controller
            .define_handler(&scope, Facility::AttributeSetter, custom)
            .unwrap();
        controller.install(&scope, Facility::AttributeSetter, None).unwrap();

        let saved = controller
            .original_handler(&scope, Facility::AttributeSetter)
            .unwrap();
        assert_eq!(saved.name(), "point-setter");
        assert_eq!(controller.patched_targets(), vec![scope.entity()]);

        let again = Arc::new(FnHandler::new("other", |call, m| call.store(m)));
        assert!(matches!(
            controller.define_handler(&scope, Facility::AttributeSetter, again),
            Err(Error::AlreadyPatched { .. })
        ));

        controller.teardown();
        assert_eq!(
            ctx.slots()
                .get(&scope.entity(), Facility::AttributeSetter)
                .map(|h| h.name().to_string()),
            Some("point-setter".to_string())
        );
    }

    #[test]
    fn test_dropped_watched_instances_are_pruned() {
        let (ctx, controller) = setup();
        for _ in 0..100 {
            let list = ctx.new_list();
            list.watch(HookSet::new().on_set_item(|_| Ok(HookOutcome::Accept)))
                .unwrap();
        }

        // install마다 이전에 drop된 인스턴스를 정리하므로 마지막 하나만 남음
        assert!(ctx.registry().len() <= 1);
        assert!(ctx.vault().len() <= 1);

        assert_eq!(controller.prune_dropped(), 1);
        assert!(ctx.registry().is_empty());
        assert!(ctx.vault().is_empty());
        assert!(ctx.slots().is_empty());
        assert!(controller.patched_targets().is_empty());
    }

    #[test]
    fn test_prune_keeps_live_instances() {
        let (ctx, controller) = setup();
        let list = ctx.new_list();
        list.watch(HookSet::new().on_set_item(|_| Ok(HookOutcome::Accept)))
            .unwrap();

        assert_eq!(controller.prune_dropped(), 0);
        assert!(controller.is_patched(&list.scope()));

        controller.teardown();
    }

    #[test]
    fn test_instance_of_other_context_rejected() {
        let (ctx, controller) = setup();
        let other = InterceptionContext::new();
        let foreign = other.new_list();

        let err = controller
            .install(&foreign.scope(), Facility::IndexWriter, None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEntity(_)));
        assert!(ctx.vault().is_empty());
        assert!(other.vault().is_empty());
    }

    #[test]
    fn test_teardown_reports_dropped_instances() {
        let (ctx, controller) = setup();
        let list = ctx.new_list();
        let scope = list.scope();
        controller.install(&scope, Facility::IndexWriter, None).unwrap();
        drop(list);

        let report = controller.teardown();
        assert_eq!(report.failures.len(), 1);
        assert!(ctx.slots().is_empty());
        assert!(ctx.vault().is_empty());
        assert_eq!(ctx.events().count_of(InterceptionEventKind::RestoreFailed), 1);
    }
}
