//! # Observed Containers
//!
//! 관찰 가능한 컨테이너 핸들. 변경 메서드가 곧 가로채기 지점입니다.
//!
//! | 핸들 | 형태 | advisory 연산 | notify-only 연산 |
//! |---|---|---|---|
//! | [`ObservedObject`] | Object | `set`, `delete` | - |
//! | [`ObservedList`] | Sequence | `set`, `delete` | `append`, `insert`, `extend`, `pop`, `remove`, `clear` |
//! | [`ObservedMap`] | Mapping | `set`, `delete` | `update`, `clear` |
//! | [`ObservedSet`] | Set | - | `add`, `discard`, `remove`, `update`, `clear` |
//!
//! 핸들은 `Clone` 비용이 작고 같은 엔티티를 공유합니다.

mod list;
mod map;
mod object;
mod set;

pub use list::ObservedList;
pub use map::ObservedMap;
pub use object::ObservedObject;
pub use set::ObservedSet;

use crate::context::InterceptionContext;
use crate::controller::{PatchController, TargetScope};
use crate::entity::EntityCell;
use crate::hook::HookSet;
use serde_json::Value;
use std::sync::Arc;
use tripwire_foundation::{EntityId, Facility, Result};

/// 관찰 컨테이너 공통 동작
pub trait Observed {
    fn cell(&self) -> &Arc<EntityCell>;

    fn context(&self) -> &Arc<InterceptionContext>;

    fn id(&self) -> EntityId {
        self.cell().id()
    }

    fn type_name(&self) -> &str {
        self.cell().type_name()
    }

    fn facility(&self) -> Facility {
        self.cell().shape().facility()
    }

    /// 인스턴스 패치 범위
    fn scope(&self) -> TargetScope {
        TargetScope::instance(self.cell())
    }

    fn snapshot(&self) -> Value {
        self.cell().snapshot()
    }

    /// 이 인스턴스에 Hook 설치
    fn watch(&self, hooks: HookSet) -> Result<bool> {
        PatchController::new(Arc::clone(self.context())).install(
            &self.scope(),
            self.facility(),
            Some(hooks),
        )
    }

    /// 이 인스턴스의 Hook 제거
    fn unwatch(&self) -> Result<bool> {
        PatchController::new(Arc::clone(self.context())).uninstall(&self.scope(), self.facility())
    }
}

