//! Type Table - 컨테이너 타입 정의
//!
//! 내장 타입(`list`, `dict`, `set`)은 모든 컨텍스트에 존재하며 타입 단위로 패치할 수 없습니다.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use tripwire_foundation::{Error, Result, Shape, WatchedEntity};

/// 타입 정의
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub shape: Shape,
    /// 내장 타입 여부
    #[serde(default)]
    pub builtin: bool,
    /// 봉인된 타입 (타입/인스턴스 단위 패치 불가)
    #[serde(default)]
    pub sealed: bool,
}

impl TypeDef {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            builtin: false,
            sealed: false,
        }
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Object)
    }

    pub fn sequence(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Sequence)
    }

    pub fn mapping(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Mapping)
    }

    pub fn set(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Set)
    }

    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    fn builtin(shape: Shape, name: &str) -> Self {
        Self {
            builtin: true,
            ..Self::new(name, shape)
        }
    }

    /// 해당 형태의 내장 타입
    pub fn builtin_for(shape: Shape) -> Option<Self> {
        shape.builtin_type().map(|name| Self::builtin(shape, name))
    }
}

/// 타입 테이블
pub struct TypeTable {
    types: RwLock<HashMap<String, TypeDef>>,
}

impl TypeTable {
    /// 내장 타입이 등록된 테이블 생성
    pub fn new() -> Self {
        let types = [Shape::Sequence, Shape::Mapping, Shape::Set]
            .into_iter()
            .filter_map(TypeDef::builtin_for)
            .map(|def| (def.name.clone(), def))
            .collect();
        Self {
            types: RwLock::new(types),
        }
    }

    /// 사용자 타입 정의
    pub fn define(&self, def: TypeDef) -> Result<()> {
        WatchedEntity::Type(def.name.clone()).validate()?;

        let mut types = self.types.write();
        if types.contains_key(&def.name) {
            return Err(Error::TypeAlreadyDefined(def.name));
        }
        debug!(type_name = %def.name, shape = %def.shape, sealed = def.sealed, "Defined type");
        types.insert(def.name.clone(), TypeDef { builtin: false, ..def });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<TypeDef> {
        self.types.read().get(name).cloned()
    }

    /// 타입 조회 (없으면 UnknownType)
    pub fn require(&self, name: &str) -> Result<TypeDef> {
        self.get(name)
            .ok_or_else(|| Error::UnknownType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.types.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}
