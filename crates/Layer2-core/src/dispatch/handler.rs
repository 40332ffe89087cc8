//! Mutation Handler - 디스패치 슬롯에 들어가는 변경 핸들러

use super::mutation::{Applied, Mutation};
use crate::context::InterceptionContext;
use crate::entity::EntityCell;
use tripwire_foundation::Result;

/// 핸들러 호출 정보
pub struct HandlerCall<'a> {
    pub ctx: &'a InterceptionContext,
    pub entity: &'a EntityCell,
}

impl<'a> HandlerCall<'a> {
    pub fn new(ctx: &'a InterceptionContext, entity: &'a EntityCell) -> Self {
        Self { ctx, entity }
    }

    /// 내장 기본 동작으로 저장
    pub fn store(&self, mutation: Mutation) -> Result<Applied> {
        self.entity.store(mutation)
    }
}

/// 변경 핸들러
///
/// 슬롯 `(target, facility)`에 설치되어 해당 대상의 모든 변경을 처리합니다.
pub trait MutationHandler: Send + Sync {
    /// 핸들러 이름 (진단용)
    fn name(&self) -> &str;

    /// 변경 적용
    fn apply(&self, call: &HandlerCall<'_>, mutation: Mutation) -> Result<Applied>;

    /// Trampoline 여부 (Vault에는 절대 저장되지 않음)
    fn is_trampoline(&self) -> bool {
        false
    }
}

/// 내장 기본 핸들러
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl MutationHandler for DefaultHandler {
    fn name(&self) -> &str {
        "default"
    }

    fn apply(&self, call: &HandlerCall<'_>, mutation: Mutation) -> Result<Applied> {
        call.store(mutation)
    }
}

/// 클로저 기반 핸들러 (호스트가 정의하는 커스텀 setter 등)
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&HandlerCall<'_>, Mutation) -> Result<Applied> + Send + Sync,
    {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> MutationHandler for FnHandler<F>
where
    F: Fn(&HandlerCall<'_>, Mutation) -> Result<Applied> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, call: &HandlerCall<'_>, mutation: Mutation) -> Result<Applied> {
        (self.f)(call, mutation)
    }
}
