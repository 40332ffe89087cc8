//! # Entity
//!
//! 감시 가능한 컨테이너의 저장소와 타입 정의
//!
//! - [`EntityCell`]: 인스턴스 하나 (식별자 + 형태 + 저장소)
//! - [`Storage`]: 형태별 저장소와 기본 변경 동작
//! - [`TypeTable`]: 내장/사용자 타입 정의

mod cell;
mod storage;
mod types;

pub use cell::EntityCell;
pub use storage::Storage;
pub use types::{TypeDef, TypeTable};
