//! ObservedSet - 순서 없는 멤버십 컬렉션
//!
//! 모든 연산은 먼저 커밋한 뒤 통지합니다. Hook은 변경을 막거나 되돌릴 수 없습니다.

use super::Observed;
use crate::context::InterceptionContext;
use crate::dispatch::Mutation;
use crate::entity::{EntityCell, Storage};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tripwire_foundation::{Locator, Result};

/// 관찰 집합 핸들
#[derive(Clone)]
pub struct ObservedSet {
    cell: Arc<EntityCell>,
    ctx: Arc<InterceptionContext>,
}

impl ObservedSet {
    pub(crate) fn new(cell: Arc<EntityCell>, ctx: Arc<InterceptionContext>) -> Self {
        Self { cell, ctx }
    }

    fn run(&self, mutation: Mutation) -> Result<()> {
        self.ctx.dispatch(&self.cell, mutation).map(|_| ())
    }

    pub fn contains(&self, member: &Value) -> bool {
        self.cell.read(&Locator::Member(member.clone())).is_some()
    }

    pub fn members(&self) -> Vec<Value> {
        self.cell.with_storage(|storage| match storage {
            Storage::Set(members) => members.values().cloned().collect(),
            _ => Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.cell.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell.is_empty()
    }

    /// 멤버 추가 (이미 있어도 통지, old = 기존 멤버)
    pub fn add(&self, member: Value) -> Result<()> {
        self.run(Mutation::Add(member))
    }

    /// 멤버 제거 (없으면 아무것도 하지 않음)
    pub fn discard(&self, member: Value) -> Result<()> {
        self.run(Mutation::Discard(member))
    }

    /// 멤버 제거 (없으면 MemberNotFound)
    pub fn remove(&self, member: Value) -> Result<()> {
        self.run(Mutation::RemoveMember(member))
    }

    pub fn update(&self, members: impl IntoIterator<Item = Value>) -> Result<()> {
        self.run(Mutation::Union(members.into_iter().collect()))
    }

    pub fn clear(&self) -> Result<()> {
        self.run(Mutation::Clear)
    }
}

impl Observed for ObservedSet {
    fn cell(&self) -> &Arc<EntityCell> {
        &self.cell
    }

    fn context(&self) -> &Arc<InterceptionContext> {
        &self.ctx
    }
}

impl fmt::Debug for ObservedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedSet")
            .field("id", &self.cell.id())
            .field("members", &self.members())
            .finish()
    }
}
