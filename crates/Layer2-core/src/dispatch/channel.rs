//! Mutation Channel - 컨테이너 형태별 가로채기 채널
//!
//! 네 채널 모두 같은 Trampoline 상태 기계를 공유하고, 형태별 차이(facility,
//! Hook 이름, advisory 지원 여부)만 여기서 정의합니다.

use std::fmt;
use std::sync::Arc;
use tripwire_foundation::{Facility, HookName};

/// 형태별 채널
pub trait MutationChannel: Send + Sync + fmt::Debug {
    fn facility(&self) -> Facility;

    /// 커밋 전 Hook 호출 지원 여부
    fn supports_advisory(&self) -> bool {
        true
    }

    /// 변경 종류별 Hook 이름
    fn hook_for(&self, removal: bool) -> HookName {
        let (set, delete) = HookName::pair_for(self.facility());
        if removal {
            delete
        } else {
            set
        }
    }
}

/// 속성 setter 채널
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeChannel;

impl MutationChannel for AttributeChannel {
    fn facility(&self) -> Facility {
        Facility::AttributeSetter
    }
}

/// 시퀀스 index writer 채널
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceChannel;

impl MutationChannel for SequenceChannel {
    fn facility(&self) -> Facility {
        Facility::IndexWriter
    }
}

/// 매핑 key writer 채널
#[derive(Debug, Clone, Copy, Default)]
pub struct MappingChannel;

impl MutationChannel for MappingChannel {
    fn facility(&self) -> Facility {
        Facility::KeyWriter
    }
}

/// 집합 멤버십 채널 (항상 커밋 후 통지)
#[derive(Debug, Clone, Copy, Default)]
pub struct MembershipChannel;

impl MutationChannel for MembershipChannel {
    fn facility(&self) -> Facility {
        Facility::MemberWriter
    }

    fn supports_advisory(&self) -> bool {
        false
    }
}

/// facility에 맞는 채널
pub fn channel_for(facility: Facility) -> Arc<dyn MutationChannel> {
    match facility {
        Facility::AttributeSetter => Arc::new(AttributeChannel),
        Facility::IndexWriter => Arc::new(SequenceChannel),
        Facility::KeyWriter => Arc::new(MappingChannel),
        Facility::MemberWriter => Arc::new(MembershipChannel),
    }
}
