//! Storage - 컨테이너 기본 저장소와 기본 변경 동작
//!
//! 여기의 `apply`가 "내장 기본 핸들러"의 실제 동작입니다. 가로채기와 무관하게
//! 변경을 그대로 반영하고, 위치별 `Change` 목록을 보고합니다.

use crate::dispatch::{Applied, Change, Mutation};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tripwire_foundation::{Error, Locator, Result, Shape};

/// 컨테이너 저장소
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    Object(BTreeMap<String, Value>),
    Sequence(Vec<Value>),
    Mapping(BTreeMap<String, Value>),
    /// 멤버의 JSON 표현 → 멤버
    Set(BTreeMap<String, Value>),
}

/// 집합 멤버 키
pub(crate) fn member_key(member: &Value) -> String {
    member.to_string()
}

impl Storage {
    /// 형태별 빈 저장소
    pub fn empty(shape: Shape) -> Self {
        match shape {
            Shape::Object => Self::Object(BTreeMap::new()),
            Shape::Sequence => Self::Sequence(Vec::new()),
            Shape::Mapping => Self::Mapping(BTreeMap::new()),
            Shape::Set => Self::Set(BTreeMap::new()),
        }
    }

    pub fn sequence(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Sequence(items.into_iter().collect())
    }

    pub fn mapping<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn set(members: impl IntoIterator<Item = Value>) -> Self {
        Self::Set(
            members
                .into_iter()
                .map(|m| (member_key(&m), m))
                .collect(),
        )
    }

    pub fn shape(&self) -> Shape {
        match self {
            Self::Object(_) => Shape::Object,
            Self::Sequence(_) => Shape::Sequence,
            Self::Mapping(_) => Shape::Mapping,
            Self::Set(_) => Shape::Set,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Object(m) | Self::Mapping(m) | Self::Set(m) => m.len(),
            Self::Sequence(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 위치의 현재 값 (없으면 None, 에러 아님)
    pub fn read(&self, locator: &Locator) -> Option<Value> {
        match (self, locator) {
            (Self::Object(m), Locator::Attribute(name)) => m.get(name).cloned(),
            (Self::Sequence(v), Locator::Index(i)) => v.get(*i).cloned(),
            (Self::Mapping(m), Locator::Key(key)) => m.get(key).cloned(),
            (Self::Set(m), Locator::Member(member)) => m.get(&member_key(member)).cloned(),
            _ => None,
        }
    }

    /// JSON 스냅샷 (집합은 배열)
    pub fn snapshot(&self) -> Value {
        match self {
            Self::Object(m) | Self::Mapping(m) => {
                Value::Object(m.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Map<_, _>>())
            }
            Self::Sequence(v) => Value::Array(v.clone()),
            Self::Set(m) => Value::Array(m.values().cloned().collect()),
        }
    }

    /// 변경 적용
    pub fn apply(&mut self, mutation: Mutation) -> Result<Applied> {
        if let Some(expected) = mutation.shape() {
            let found = self.shape();
            if expected != found {
                return Err(Error::ShapeMismatch { expected, found });
            }
        }

        match self {
            Self::Object(attrs) => apply_object(attrs, mutation),
            Self::Sequence(items) => apply_sequence(items, mutation),
            Self::Mapping(entries) => apply_mapping(entries, mutation),
            Self::Set(members) => apply_set(members, mutation),
        }
    }
}

// ============================================================================
// 형태별 동작
// ============================================================================

fn unsupported(shape: Shape, mutation: &Mutation) -> Error {
    Error::Internal(format!(
        "{} is not supported on a {} container",
        mutation.name(),
        shape
    ))
}

fn clear_map(map: &mut BTreeMap<String, Value>, locate: impl Fn(String, &Value) -> Locator) -> Applied {
    let drained = std::mem::take(map);
    Applied {
        changes: drained
            .into_iter()
            .map(|(k, v)| Change::new(locate(k, &v), Some(v), None))
            .collect(),
        output: None,
    }
}

fn apply_object(attrs: &mut BTreeMap<String, Value>, mutation: Mutation) -> Result<Applied> {
    match mutation {
        Mutation::Assign {
            locator: Locator::Attribute(name),
            value,
        } => {
            let old = attrs.insert(name.clone(), value.clone());
            Ok(Applied::single(Change::new(
                Locator::Attribute(name),
                old,
                Some(value),
            )))
        }
        Mutation::Delete {
            locator: Locator::Attribute(name),
        } => match attrs.remove(&name) {
            Some(old) => Ok(Applied::single(Change::new(
                Locator::Attribute(name),
                Some(old),
                None,
            ))),
            None => Err(Error::AttributeNotFound(name)),
        },
        Mutation::Clear => Ok(clear_map(attrs, |k, _| Locator::Attribute(k))),
        other => Err(unsupported(Shape::Object, &other)),
    }
}

fn apply_sequence(items: &mut Vec<Value>, mutation: Mutation) -> Result<Applied> {
    let len = items.len();
    match mutation {
        Mutation::Assign {
            locator: Locator::Index(index),
            value,
        } => {
            let slot = items
                .get_mut(index)
                .ok_or(Error::IndexOutOfRange { index, len })?;
            let old = std::mem::replace(slot, value.clone());
            Ok(Applied::single(Change::new(
                Locator::Index(index),
                Some(old),
                Some(value),
            )))
        }
        Mutation::Delete {
            locator: Locator::Index(index),
        } => {
            if index >= len {
                return Err(Error::IndexOutOfRange { index, len });
            }
            let old = items.remove(index);
            Ok(Applied::single(Change::new(
                Locator::Index(index),
                Some(old),
                None,
            )))
        }
        Mutation::Insert { index, value } => {
            let position = index.min(len);
            items.insert(position, value.clone());
            Ok(Applied::single(Change::new(
                Locator::Index(position),
                None,
                Some(value),
            )))
        }
        Mutation::Append(value) => {
            items.push(value.clone());
            Ok(Applied::single(Change::new(
                Locator::Index(len),
                None,
                Some(value),
            )))
        }
        Mutation::Extend(values) => {
            let changes = values
                .into_iter()
                .enumerate()
                .map(|(offset, value)| {
                    items.push(value.clone());
                    Change::new(Locator::Index(len + offset), None, Some(value))
                })
                .collect();
            Ok(Applied {
                changes,
                output: None,
            })
        }
        Mutation::Pop(index) => {
            let index = match index {
                Some(i) => i,
                None => len
                    .checked_sub(1)
                    .ok_or(Error::IndexOutOfRange { index: 0, len })?,
            };
            if index >= len {
                return Err(Error::IndexOutOfRange { index, len });
            }
            let old = items.remove(index);
            Ok(
                Applied::single(Change::new(Locator::Index(index), Some(old.clone()), None))
                    .with_output(old),
            )
        }
        Mutation::Remove(value) => {
            let position = items
                .iter()
                .position(|item| *item == value)
                .ok_or_else(|| Error::ValueNotFound(value.to_string()))?;
            let old = items.remove(position);
            Ok(Applied::single(Change::new(
                Locator::Index(position),
                Some(old),
                None,
            )))
        }
        Mutation::Clear => {
            let changes = std::mem::take(items)
                .into_iter()
                .enumerate()
                .map(|(i, old)| Change::new(Locator::Index(i), Some(old), None))
                .collect();
            Ok(Applied {
                changes,
                output: None,
            })
        }
        other => Err(unsupported(Shape::Sequence, &other)),
    }
}

fn apply_mapping(entries: &mut BTreeMap<String, Value>, mutation: Mutation) -> Result<Applied> {
    match mutation {
        Mutation::Assign {
            locator: Locator::Key(key),
            value,
        } => {
            let old = entries.insert(key.clone(), value.clone());
            Ok(Applied::single(Change::new(Locator::Key(key), old, Some(value))))
        }
        Mutation::Delete {
            locator: Locator::Key(key),
        } => match entries.remove(&key) {
            Some(old) => Ok(Applied::single(Change::new(
                Locator::Key(key),
                Some(old),
                None,
            ))),
            None => Err(Error::KeyNotFound(key)),
        },
        Mutation::Update(pairs) => {
            let mut changes = Vec::new();
            for (key, value) in pairs {
                let old = entries.insert(key.clone(), value.clone());
                // 값이 실제로 바뀐 키만 보고
                if old.as_ref() != Some(&value) {
                    changes.push(Change::new(Locator::Key(key), old, Some(value)));
                }
            }
            Ok(Applied {
                changes,
                output: None,
            })
        }
        Mutation::Clear => Ok(clear_map(entries, |k, _| Locator::Key(k))),
        other => Err(unsupported(Shape::Mapping, &other)),
    }
}

fn add_member(members: &mut BTreeMap<String, Value>, member: Value) -> Change {
    let old = members.insert(member_key(&member), member.clone());
    Change::new(Locator::Member(member.clone()), old, Some(member))
}

fn apply_set(members: &mut BTreeMap<String, Value>, mutation: Mutation) -> Result<Applied> {
    match mutation {
        Mutation::Add(member)
        | Mutation::Assign {
            locator: Locator::Member(member),
            ..
        } => Ok(Applied::single(add_member(members, member))),
        Mutation::Union(values) => Ok(Applied {
            changes: values
                .into_iter()
                .map(|member| add_member(members, member))
                .collect(),
            output: None,
        }),
        Mutation::Discard(member) => Ok(match members.remove(&member_key(&member)) {
            Some(old) => Applied::single(Change::new(Locator::Member(member), Some(old), None)),
            None => Applied::none(),
        }),
        Mutation::RemoveMember(member)
        | Mutation::Delete {
            locator: Locator::Member(member),
        } => match members.remove(&member_key(&member)) {
            Some(old) => Ok(Applied::single(Change::new(
                Locator::Member(member),
                Some(old),
                None,
            ))),
            None => Err(Error::MemberNotFound(member.to_string())),
        },
        Mutation::Clear => Ok(clear_map(members, |_, v| Locator::Member(v.clone()))),
        other => Err(unsupported(Shape::Set, &other)),
    }
}

// ============================================================================
// 테스트
// ============================================================================
