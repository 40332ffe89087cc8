//! Watch Manifest - 선언적 Hook 등록
//!
//! ```json
//! {
//!   "watches": [{
//!     "scope": { "type": "Point" },
//!     "facility": "attribute_setter",
//!     "hooks": { "on_set_attribute": "audit" }
//!   }, {
//!     "scope": { "global": "all-sets" },
//!     "facility": "member_writer",
//!     "hooks": { "on_add_member": "audit" }
//!   }]
//! }
//! ```
//!
//! Hook 이름 → callable 이름은 호스트가 등록한 [`HookCatalog`]에서 해석합니다.

use super::types::{HookCall, HookFn, HookResult, HookSet};
use crate::controller::{PatchController, TargetScope};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tripwire_foundation::{Error, Facility, GlobalFacility, HookName, Result};

// ============================================================================
// HookCatalog - 이름 있는 callable
// ============================================================================

/// 매니페스트가 참조하는 callable 카탈로그
#[derive(Clone, Default)]
pub struct HookCatalog {
    hooks: HashMap<String, HookFn>,
}

impl HookCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// callable 등록 (같은 이름은 교체)
    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&HookCall<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.insert(name.into(), Arc::new(f));
        self
    }

    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&HookCall<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.register(name, f);
        self
    }

    pub fn get(&self, name: &str) -> Option<HookFn> {
        self.hooks.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.hooks.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

// ============================================================================
// WatchManifest
// ============================================================================

/// 매니페스트 대상 범위 (인스턴스는 이름이 없으므로 제외)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestScope {
    Type(String),
    Global(GlobalFacility),
}

impl From<&ManifestScope> for TargetScope {
    fn from(scope: &ManifestScope) -> Self {
        match scope {
            ManifestScope::Type(name) => TargetScope::of_type(name.clone()),
            ManifestScope::Global(tag) => TargetScope::global(*tag),
        }
    }
}

/// 감시 항목 하나
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchSpec {
    pub scope: ManifestScope,
    pub facility: Facility,

    /// Hook 이름 → 카탈로그 callable 이름
    #[serde(default)]
    pub hooks: BTreeMap<String, String>,
}

impl WatchSpec {
    /// 카탈로그로 HookSet 구성
    pub fn resolve(&self, catalog: &HookCatalog) -> Result<HookSet> {
        let mut set = HookSet::new();
        for (hook_name, callable) in &self.hooks {
            let name: HookName = hook_name.parse()?;
            let hook = catalog.get(callable).ok_or_else(|| {
                Error::InvalidHookValue(format!(
                    "hook {} refers to unregistered callable '{}'",
                    name, callable
                ))
            })?;
            set.insert(name, hook);
        }
        set.validate_for(self.facility)?;
        Ok(set)
    }
}

/// 감시 매니페스트
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchManifest {
    #[serde(default)]
    pub watches: Vec<WatchSpec>,
}

impl WatchManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn push(&mut self, watch: WatchSpec) {
        self.watches.push(watch);
    }

    /// 다른 매니페스트 병합 (뒤에 추가)
    pub fn merge(&mut self, other: WatchManifest) {
        self.watches.extend(other.watches);
    }

    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// 모든 항목을 검증한 뒤 설치
    ///
    /// 하나라도 해석하거나 검증할 수 없으면 아무것도 설치하지 않습니다.
    /// 반환 값은 새로 설치된 Trampoline 수입니다.
    pub fn apply(&self, controller: &PatchController, catalog: &HookCatalog) -> Result<usize> {
        let resolved = self
            .watches
            .iter()
            .map(|watch| -> Result<_> {
                let scope = TargetScope::from(&watch.scope);
                let hooks = watch.resolve(catalog)?;
                controller.validate(&scope, watch.facility, Some(&hooks))?;
                Ok((scope, watch.facility, hooks))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut installed = Vec::new();
        for (scope, facility, hooks) in resolved {
            debug!(scope = ?scope, facility = %facility, hooks = hooks.len(), "Applying watch");
            match controller.install(&scope, facility, Some(hooks)) {
                Ok(true) => installed.push((scope, facility)),
                Ok(false) => {}
                Err(e) => {
                    // 이번 호출에서 설치한 항목 되돌리기
                    for (scope, facility) in installed.iter().rev() {
                        if let Err(undo) = controller.uninstall(scope, *facility) {
                            warn!(scope = ?scope, error = %undo, "Failed to roll back watch");
                        }
                    }
                    return Err(e);
                }
            }
        }

        info!(watches = self.watches.len(), installed = installed.len(), "Applied watch manifest");
        Ok(installed.len())
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InterceptionContext;
    use crate::entity::TypeDef;
    use crate::hook::HookOutcome;
    use serde_json::json;

    const MANIFEST: &str = r#"{
        "watches": [
            {
                "scope": { "type": "Point" },
                "facility": "attribute_setter",
                "hooks": { "on_set_attribute": "clamp" }
            },
            {
                "scope": { "global": "all-sets" },
                "facility": "member_writer",
                "hooks": { "on_add_member": "noop" }
            }
        ]
    }"#;

    fn catalog() -> HookCatalog {
        HookCatalog::new()
            .with("clamp", |call| {
                let value = call.proposed.and_then(|v| v.as_i64()).unwrap_or_default();
                Ok(HookOutcome::Replace(json!(value.min(10))))
            })
            .with("noop", |_| Ok(HookOutcome::Accept))
    }

    #[test]
    fn test_parse_manifest() {
        let manifest = WatchManifest::from_json(MANIFEST).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(
            manifest.watches[1].scope,
            ManifestScope::Global(GlobalFacility::AllSets)
        );
        assert_eq!(manifest.watches[0].facility, Facility::AttributeSetter);
    }

    #[test]
    fn test_apply_installs_every_watch() {
        let ctx = InterceptionContext::new();
        ctx.define_type(TypeDef::object("Point")).unwrap();
        let controller = PatchController::new(Arc::clone(&ctx));

        let manifest = WatchManifest::from_json(MANIFEST).unwrap();
        assert_eq!(manifest.apply(&controller, &catalog()).unwrap(), 2);

        let point = ctx.new_object("Point").unwrap();
        point.set("x", json!(50)).unwrap();
        assert_eq!(point.get("x"), Some(json!(10)));

        controller.teardown();
    }

    #[test]
    fn test_unregistered_callable_installs_nothing() {
        let ctx = InterceptionContext::new();
        ctx.define_type(TypeDef::object("Point")).unwrap();
        let controller = PatchController::new(Arc::clone(&ctx));

        let catalog = HookCatalog::new().with("clamp", |_| Ok(HookOutcome::Accept));
        let err = WatchManifest::from_json(MANIFEST)
            .unwrap()
            .apply(&controller, &catalog)
            .unwrap_err();

        assert!(matches!(err, Error::InvalidHookValue(_)));
        assert!(ctx.vault().is_empty());
    }

    #[test]
    fn test_invalid_scope_after_valid_watch_installs_nothing() {
        let ctx = InterceptionContext::new();
        let controller = PatchController::new(Arc::clone(&ctx));

        let manifest = WatchManifest::from_json(
            r#"{
                "watches": [
                    {
                        "scope": { "global": "all-sets" },
                        "facility": "member_writer",
                        "hooks": { "on_add_member": "noop" }
                    },
                    {
                        "scope": { "type": "Ghost" },
                        "facility": "attribute_setter",
                        "hooks": { "on_set_attribute": "clamp" }
                    }
                ]
            }"#,
        )
        .unwrap();

        let err = manifest.apply(&controller, &catalog()).unwrap_err();
        assert!(matches!(err, Error::UnknownType(_)));
        assert!(ctx.vault().is_empty());
        assert!(ctx.registry().is_empty());
        assert!(ctx.slots().is_empty());
    }

    #[test]
    fn test_unpatchable_facility_installs_nothing() {
        let ctx = InterceptionContext::new();
        ctx.define_type(TypeDef::object("Point")).unwrap();
        let controller = PatchController::new(Arc::clone(&ctx));

        let mut manifest = WatchManifest::from_json(MANIFEST).unwrap();
        manifest.push(WatchSpec {
            scope: ManifestScope::Type("list".into()),
            facility: Facility::IndexWriter,
            hooks: BTreeMap::new(),
        });

        let err = manifest.apply(&controller, &catalog()).unwrap_err();
        assert!(matches!(err, Error::NotHeapLike(_)));
        assert!(ctx.vault().is_empty());
    }

    #[test]
    fn test_unknown_hook_name() {
        let spec = WatchSpec {
            scope: ManifestScope::Type("Point".into()),
            facility: Facility::AttributeSetter,
            hooks: BTreeMap::from([("__setattr__".to_string(), "clamp".to_string())]),
        };
        assert!(matches!(
            spec.resolve(&catalog()),
            Err(Error::InvalidHookValue(_))
        ));
    }
}
