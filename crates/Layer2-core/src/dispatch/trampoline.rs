//! Trampoline - 가로채기 상태 기계
//!
//! ```text
//! START → OLD_CAPTURED → HOOK_DECISION → COMMITTED | ABORTED | FAILED
//! ```
//!
//! 커밋은 항상 Vault에 저장된 원래 핸들러로 위임합니다. 자기 자신을 다시 호출하지 않습니다.
//! 멤버십 연산과 위치/일괄 연산은 먼저 커밋한 뒤 변경마다 Hook을 통지만 합니다.

use super::channel::MutationChannel;
use super::handler::{HandlerCall, MutationHandler};
use super::mutation::{Applied, Change, Mutation};
use crate::hook::{AbortRequested, DispatchMode, HookCall, HookFn, HookOutcome};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use tripwire_foundation::{
    Error, HookName, InterceptionEvent, InterceptionEventKind, Locator, NotifyErrorPolicy, Result,
    WatchedEntity,
};

/// Hook 결정 결과
#[derive(Debug)]
pub enum MutationOutcome {
    /// 값 커밋 (None이면 삭제)
    Commit(Option<Value>),

    /// 조용히 건너뜀
    Skip,

    /// Hook 실패 - 아무것도 커밋하지 않음
    Fail(Error),
}

/// 설치된 가로채기 핸들러
pub struct Trampoline {
    target: WatchedEntity,
    channel: Arc<dyn MutationChannel>,
}

impl Trampoline {
    pub fn new(target: WatchedEntity, channel: Arc<dyn MutationChannel>) -> Self {
        Self { target, channel }
    }

    pub fn target(&self) -> &WatchedEntity {
        &self.target
    }

    fn original(&self, call: &HandlerCall<'_>) -> Result<Arc<dyn MutationHandler>> {
        call.ctx
            .original_for(&self.target, self.channel.facility(), call.entity)
    }

    // ========================================================================
    // Advisory 경로 (커밋 전 결정)
    // ========================================================================

    fn advise(
        &self,
        call: &HandlerCall<'_>,
        locator: Locator,
        proposed: Option<Value>,
    ) -> Result<Applied> {
        let old = call.entity.read(&locator);
        let hook_name = self.channel.hook_for(proposed.is_none());
        let lineage = call.entity.lineage();

        let outcome = match call.ctx.registry().resolve(&lineage, hook_name) {
            None => MutationOutcome::Commit(proposed),
            Some(_)
                if proposed.is_some()
                    && call.ctx.config().skip_unchanged
                    && old == proposed =>
            {
                trace!(locator = %locator, "Value unchanged, hook skipped");
                MutationOutcome::Commit(proposed)
            }
            Some(hook) => decide(
                &hook,
                HookCall {
                    entity: call.entity,
                    hook: hook_name,
                    locator: &locator,
                    old: old.as_ref(),
                    proposed: proposed.as_ref(),
                    mode: DispatchMode::Advisory,
                },
            ),
        };

        match outcome {
            MutationOutcome::Commit(value) => {
                let mutation = match value {
                    Some(value) => Mutation::Assign { locator, value },
                    None => Mutation::Delete { locator },
                };
                self.original(call)?.apply(call, mutation)
            }
            MutationOutcome::Skip => {
                debug!(entity = %call.entity.id(), locator = %locator, "Mutation aborted by hook");
                call.ctx.events().publish(
                    InterceptionEvent::new(InterceptionEventKind::MutationAborted)
                        .on(&self.target, self.channel.facility())
                        .with_detail(format!("{} {}", hook_name, locator)),
                );
                Ok(Applied::none())
            }
            MutationOutcome::Fail(error) => Err(error),
        }
    }

    // ========================================================================
    // Notify-only 경로 (커밋 후 통지)
    // ========================================================================

    fn notify(&self, call: &HandlerCall<'_>, mutation: Mutation) -> Result<Applied> {
        let applied = self.original(call)?.apply(call, mutation)?;
        if applied.is_empty() {
            return Ok(applied);
        }

        let lineage = call.entity.lineage();
        let mut first_error = None;

        for change in &applied.changes {
            let hook_name = self.channel.hook_for(change.is_removal());
            // Hook이 등록을 바꿀 수 있으므로 변경마다 다시 조회
            let Some(hook) = call.ctx.registry().resolve(&lineage, hook_name) else {
                continue;
            };
            if let Err(error) = self.fire(call, &hook, hook_name, change) {
                warn!(
                    entity = %call.entity.id(),
                    hook = %hook_name,
                    error = %error,
                    "Notification hook failed after commit"
                );
                call.ctx.events().publish(
                    InterceptionEvent::new(InterceptionEventKind::NotifyFailed)
                        .on(&self.target, self.channel.facility())
                        .with_detail(error.to_string()),
                );
                first_error.get_or_insert(error);
            }
        }

        match (first_error, call.ctx.config().notify_errors) {
            (Some(error), NotifyErrorPolicy::Propagate) => Err(error),
            _ => Ok(applied),
        }
    }

    fn fire(
        &self,
        call: &HandlerCall<'_>,
        hook: &HookFn,
        hook_name: HookName,
        change: &Change,
    ) -> Result<()> {
        let hook_call = HookCall {
            entity: call.entity,
            hook: hook_name,
            locator: &change.locator,
            old: change.old.as_ref(),
            proposed: change.new.as_ref(),
            mode: DispatchMode::NotifyOnly,
        };

        match hook(&hook_call) {
            Ok(HookOutcome::Accept) => Ok(()),
            Ok(outcome) => {
                trace!(hook = %hook_name, ?outcome, "Notify-only hook decision ignored");
                Ok(())
            }
            Err(e) if e.is::<AbortRequested>() => {
                trace!(hook = %hook_name, "Abort ignored after commit");
                Ok(())
            }
            Err(e) => Err(Error::hook_failed(hook_name, change.locator.path(), e)),
        }
    }
}

/// advisory Hook 호출 결과를 결정으로 변환
fn decide(hook: &HookFn, call: HookCall<'_>) -> MutationOutcome {
    match hook(&call) {
        Ok(HookOutcome::Accept) => MutationOutcome::Commit(call.proposed.cloned()),
        Ok(HookOutcome::Replace(value)) if call.proposed.is_some() => {
            MutationOutcome::Commit(Some(value))
        }
        Ok(HookOutcome::Replace(_)) => {
            debug!(hook = %call.hook, "Replacement ignored for removal");
            MutationOutcome::Commit(None)
        }
        Ok(HookOutcome::Abort) => MutationOutcome::Skip,
        Err(e) if e.is::<AbortRequested>() => MutationOutcome::Skip,
        Err(e) => MutationOutcome::Fail(Error::hook_failed(call.hook, call.locator.path(), e)),
    }
}

impl MutationHandler for Trampoline {
    fn name(&self) -> &str {
        "trampoline"
    }

    fn apply(&self, call: &HandlerCall<'_>, mutation: Mutation) -> Result<Applied> {
        trace!(
            target_entity = %self.target,
            facility = %self.channel.facility(),
            op = mutation.name(),
            "Trampoline dispatch"
        );

        if mutation.mode() == DispatchMode::NotifyOnly || !self.channel.supports_advisory() {
            return self.notify(call, mutation);
        }
        match mutation {
            Mutation::Assign { locator, value } => self.advise(call, locator, Some(value)),
            Mutation::Delete { locator } => self.advise(call, locator, None),
            other => self.notify(call, other),
        }
    }

    fn is_trampoline(&self) -> bool {
        true
    }
}

// ============================================================================
// 테스트
// ============================================================================
