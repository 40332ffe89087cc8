//! Mutation - 컨테이너에 대한 변경 요청과 그 결과

use crate::hook::DispatchMode;
use serde_json::Value;
use tripwire_foundation::{Locator, Shape};

/// 변경 요청
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// 위치에 값 할당 (advisory)
    Assign { locator: Locator, value: Value },

    /// 위치의 값 삭제 (advisory)
    Delete { locator: Locator },

    /// 시퀀스 위치에 삽입 (범위를 넘으면 끝으로 고정)
    Insert { index: usize, value: Value },

    Append(Value),

    Extend(Vec<Value>),

    /// 위치의 값을 꺼냄 (None이면 마지막)
    Pop(Option<usize>),

    /// 시퀀스에서 첫 번째로 같은 값 제거
    Remove(Value),

    /// 매핑 일괄 갱신
    Update(Vec<(String, Value)>),

    /// 멤버 추가
    Add(Value),

    /// 멤버 제거 (없으면 무시)
    Discard(Value),

    /// 멤버 제거 (없으면 에러)
    RemoveMember(Value),

    /// 멤버 일괄 추가
    Union(Vec<Value>),

    Clear,
}

impl Mutation {
    pub fn assign(locator: Locator, value: Value) -> Self {
        Self::Assign { locator, value }
    }

    pub fn delete(locator: Locator) -> Self {
        Self::Delete { locator }
    }

    /// Hook 호출 방식
    ///
    /// 단일 위치 할당/삭제만 advisory이고, 위치 이동이나 일괄 변경은 커밋 후 통지됩니다.
    pub fn mode(&self) -> DispatchMode {
        match self {
            Self::Assign { .. } | Self::Delete { .. } => DispatchMode::Advisory,
            _ => DispatchMode::NotifyOnly,
        }
    }

    /// 이 변경이 요구하는 컨테이너 형태 (Clear는 형태 무관)
    pub fn shape(&self) -> Option<Shape> {
        match self {
            Self::Assign { locator, .. } | Self::Delete { locator } => {
                Some(locator.facility().shape())
            }
            Self::Insert { .. }
            | Self::Append(_)
            | Self::Extend(_)
            | Self::Pop(_)
            | Self::Remove(_) => Some(Shape::Sequence),
            Self::Update(_) => Some(Shape::Mapping),
            Self::Add(_) | Self::Discard(_) | Self::RemoveMember(_) | Self::Union(_) => {
                Some(Shape::Set)
            }
            Self::Clear => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Assign { .. } => "assign",
            Self::Delete { .. } => "delete",
            Self::Insert { .. } => "insert",
            Self::Append(_) => "append",
            Self::Extend(_) => "extend",
            Self::Pop(_) => "pop",
            Self::Remove(_) => "remove",
            Self::Update(_) => "update",
            Self::Add(_) => "add",
            Self::Discard(_) => "discard",
            Self::RemoveMember(_) => "remove_member",
            Self::Union(_) => "union",
            Self::Clear => "clear",
        }
    }
}

/// 커밋된 단일 위치 변경
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub locator: Locator,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

impl Change {
    pub fn new(locator: Locator, old: Option<Value>, new: Option<Value>) -> Self {
        Self { locator, old, new }
    }

    pub fn is_removal(&self) -> bool {
        self.new.is_none()
    }
}

/// 핸들러가 보고하는 커밋 결과
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applied {
    /// 위치별 변경 (커밋 순서)
    pub changes: Vec<Change>,

    /// 연산 반환 값 (pop 등)
    pub output: Option<Value>,
}

impl Applied {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn single(change: Change) -> Self {
        Self {
            changes: vec![change],
            output: None,
        }
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
