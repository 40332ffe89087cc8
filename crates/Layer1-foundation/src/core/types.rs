//! Core Types - 감시 대상 식별자, 컨테이너 형태, 위치(Locator) 모델
//!
//! Registry와 Vault는 이 타입들을 조회 키로만 사용하며, 실제 객체를 역참조하지 않습니다.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// EntityId - 인스턴스 식별자
// ============================================================================

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// 프로세스 내에서 유일한 인스턴스 식별자
///
/// 0은 유효한 식별자가 아닙니다 (할당은 1부터 시작).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// 새 식별자 할당
    pub fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// 원시 값에서 생성 (검증은 Registry가 수행)
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Shape / Facility
// ============================================================================

/// 컨테이너 형태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// 이름 있는 속성 슬롯
    Object,
    /// 인덱스 기반 시퀀스
    Sequence,
    /// 키 기반 매핑
    Mapping,
    /// 순서 없는 멤버십 컬렉션
    Set,
}

impl Shape {
    /// 이 형태의 변경을 담당하는 facility (형태당 하나)
    pub fn facility(&self) -> Facility {
        match self {
            Self::Object => Facility::AttributeSetter,
            Self::Sequence => Facility::IndexWriter,
            Self::Mapping => Facility::KeyWriter,
            Self::Set => Facility::MemberWriter,
        }
    }

    /// 내장 컨테이너 형태의 전역 facility 태그
    pub fn global(&self) -> Option<GlobalFacility> {
        match self {
            Self::Object => None,
            Self::Sequence => Some(GlobalFacility::AllSequences),
            Self::Mapping => Some(GlobalFacility::AllMappings),
            Self::Set => Some(GlobalFacility::AllSets),
        }
    }

    /// 내장 타입 이름 (Object는 내장 타입이 없음)
    pub fn builtin_type(&self) -> Option<&'static str> {
        match self {
            Self::Object => None,
            Self::Sequence => Some("list"),
            Self::Mapping => Some("dict"),
            Self::Set => Some("set"),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => write!(f, "object"),
            Self::Sequence => write!(f, "sequence"),
            Self::Mapping => write!(f, "mapping"),
            Self::Set => write!(f, "set"),
        }
    }
}

/// 가로챌 수 있는 변경 facility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facility {
    AttributeSetter,
    IndexWriter,
    KeyWriter,
    MemberWriter,
}

impl Facility {
    pub const ALL: [Facility; 4] = [
        Self::AttributeSetter,
        Self::IndexWriter,
        Self::KeyWriter,
        Self::MemberWriter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AttributeSetter => "attribute setter",
            Self::IndexWriter => "index writer",
            Self::KeyWriter => "key writer",
            Self::MemberWriter => "member writer",
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Self::AttributeSetter => Shape::Object,
            Self::IndexWriter => Shape::Sequence,
            Self::KeyWriter => Shape::Mapping,
            Self::MemberWriter => Shape::Set,
        }
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 내장 컨테이너 전체에 적용되는 전역 facility 태그
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalFacility {
    #[serde(alias = "all-sequences")]
    AllSequences,
    #[serde(alias = "all-mappings")]
    AllMappings,
    #[serde(alias = "all-sets")]
    AllSets,
}

impl GlobalFacility {
    pub fn shape(&self) -> Shape {
        match self {
            Self::AllSequences => Shape::Sequence,
            Self::AllMappings => Shape::Mapping,
            Self::AllSets => Shape::Set,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::AllSequences => "all-sequences",
            Self::AllMappings => "all-mappings",
            Self::AllSets => "all-sets",
        }
    }
}

// ============================================================================
// WatchedEntity - 감시 대상
// ============================================================================

/// 감시/패치 대상 식별자 (인스턴스, 타입, 전역 facility)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchedEntity {
    Instance(EntityId),
    Type(String),
    Global(GlobalFacility),
}

impl WatchedEntity {
    /// 식별 가능한 대상인지 검증
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Instance(id) if !id.is_valid() => Err(Error::InvalidEntity(format!(
                "instance {} has no stable identity",
                id
            ))),
            Self::Type(name) if name.trim().is_empty() => Err(Error::InvalidEntity(
                "type name must not be empty".to_string(),
            )),
            Self::Type(name) if name.chars().any(char::is_whitespace) => Err(
                Error::InvalidEntity(format!("type name '{}' contains whitespace", name)),
            ),
            _ => Ok(()),
        }
    }

    /// 특이도 (낮을수록 구체적)
    pub fn specificity(&self) -> u8 {
        match self {
            Self::Instance(_) => 0,
            Self::Type(_) => 1,
            Self::Global(_) => 2,
        }
    }
}

impl fmt::Display for WatchedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(id) => write!(f, "instance {}", id),
            Self::Type(name) => write!(f, "type {}", name),
            Self::Global(tag) => write!(f, "global {}", tag.tag()),
        }
    }
}

// ============================================================================
// Locator - 변경 위치
// ============================================================================

/// 컨테이너 내부의 변경 위치
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    /// 속성 이름
    Attribute(String),
    /// 시퀀스 위치
    Index(usize),
    /// 매핑 키
    Key(String),
    /// 멤버 자체 (key == value)
    Member(Value),
}

impl Locator {
    /// 경로 표현 (`name`, `[3]`, `[key]`, `{member}`)
    pub fn path(&self) -> String {
        match self {
            Self::Attribute(name) => name.clone(),
            Self::Index(index) => format!("[{}]", index),
            Self::Key(key) => format!("[{}]", key),
            Self::Member(member) => format!("{{{}}}", member),
        }
    }

    pub fn facility(&self) -> Facility {
        match self {
            Self::Attribute(_) => Facility::AttributeSetter,
            Self::Index(_) => Facility::IndexWriter,
            Self::Key(_) => Facility::KeyWriter,
            Self::Member(_) => Facility::MemberWriter,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

// ============================================================================
// HookName - Hook 이름
// ============================================================================

/// 등록 가능한 Hook 이름
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookName {
    OnSetAttribute,
    OnDeleteAttribute,
    OnSetItem,
    OnDeleteItem,
    OnAddMember,
    OnRemoveMember,
}

impl HookName {
    pub const ALL: [HookName; 6] = [
        Self::OnSetAttribute,
        Self::OnDeleteAttribute,
        Self::OnSetItem,
        Self::OnDeleteItem,
        Self::OnAddMember,
        Self::OnRemoveMember,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnSetAttribute => "on_set_attribute",
            Self::OnDeleteAttribute => "on_delete_attribute",
            Self::OnSetItem => "on_set_item",
            Self::OnDeleteItem => "on_delete_item",
            Self::OnAddMember => "on_add_member",
            Self::OnRemoveMember => "on_remove_member",
        }
    }

    /// 이 Hook이 적용되는 facility인지 확인
    ///
    /// item Hook은 index writer와 key writer 모두에 적용됩니다.
    pub fn applies_to(&self, facility: Facility) -> bool {
        matches!(
            (self, facility),
            (Self::OnSetAttribute | Self::OnDeleteAttribute, Facility::AttributeSetter)
                | (
                    Self::OnSetItem | Self::OnDeleteItem,
                    Facility::IndexWriter | Facility::KeyWriter
                )
                | (Self::OnAddMember | Self::OnRemoveMember, Facility::MemberWriter)
        )
    }

    /// facility별 (설정 Hook, 제거 Hook)
    pub fn pair_for(facility: Facility) -> (HookName, HookName) {
        match facility {
            Facility::AttributeSetter => (Self::OnSetAttribute, Self::OnDeleteAttribute),
            Facility::IndexWriter | Facility::KeyWriter => (Self::OnSetItem, Self::OnDeleteItem),
            Facility::MemberWriter => (Self::OnAddMember, Self::OnRemoveMember),
        }
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::InvalidHookValue(format!("unknown hook name '{}'", s)))
    }
}

// ============================================================================
// 테스트
// ============================================================================
