//! Event Bus - 이벤트 브로드캐스트
//!
//! 가로채기 엔진은 동기 코드이므로 발행도 동기입니다.
//! 수신 측은 `broadcast::Receiver`를 async로 또는 `try_recv`로 사용할 수 있습니다.

use super::types::{InterceptionEvent, InterceptionEventKind};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::trace;

/// 이벤트 버스 설정
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// 브로드캐스트 채널 용량
    pub channel_capacity: usize,

    /// 이벤트 히스토리 보관 개수
    pub history_size: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            history_size: 100,
        }
    }
}

/// 이벤트 버스
pub struct EventBus {
    sender: broadcast::Sender<InterceptionEvent>,
    history: Mutex<VecDeque<InterceptionEvent>>,
    history_size: usize,
    event_count: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            history: Mutex::new(VecDeque::with_capacity(config.history_size)),
            history_size: config.history_size,
            event_count: AtomicU64::new(0),
        }
    }

    /// 이벤트 발행
    pub fn publish(&self, event: InterceptionEvent) {
        let count = self.event_count.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(
            event_id = %event.id,
            kind = %event.kind,
            "Publishing event #{}", count
        );

        if self.history_size > 0 {
            let mut history = self.history.lock();
            if history.len() == self.history_size {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        // 수신자가 없으면 에러지만 정상 상황
        let _ = self.sender.send(event);
    }

    /// 브로드캐스트 수신자 생성
    pub fn receiver(&self) -> broadcast::Receiver<InterceptionEvent> {
        self.sender.subscribe()
    }

    /// 최근 이벤트 (최신순)
    pub fn history(&self, limit: Option<usize>) -> Vec<InterceptionEvent> {
        let history = self.history.lock();
        let limit = limit.unwrap_or(history.len());
        history.iter().rev().take(limit).cloned().collect()
    }

    /// 종류별 히스토리 개수
    pub fn count_of(&self, kind: InterceptionEventKind) -> usize {
        self.history.lock().iter().filter(|e| e.kind == kind).count()
    }

    /// 총 발행된 이벤트 수
    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::SeqCst)
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Facility, GlobalFacility, WatchedEntity};

    #[test]
    fn test_publish_reaches_receiver() {
        let bus = EventBus::new();
        let mut rx = bus.receiver();

        let target = WatchedEntity::Global(GlobalFacility::AllSequences);
        bus.publish(
            InterceptionEvent::new(InterceptionEventKind::Installed)
                .on(&target, Facility::IndexWriter),
        );

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, InterceptionEventKind::Installed);
        assert_eq!(event.target, Some(target));
        assert_eq!(bus.event_count(), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let bus = EventBus::with_config(EventBusConfig {
            channel_capacity: 4,
            history_size: 3,
        });

        for i in 0..10 {
            bus.publish(
                InterceptionEvent::new(InterceptionEventKind::MutationAborted)
                    .with_detail(format!("abort {}", i)),
            );
        }

        let history = bus.history(None);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].detail.as_deref(), Some("abort 9"));
        assert_eq!(bus.count_of(InterceptionEventKind::MutationAborted), 3);

        bus.clear_history();
        assert!(bus.history(None).is_empty());
    }

    #[test]
    fn test_publish_without_receivers() {
        let bus = EventBus::new();
        bus.publish(InterceptionEvent::new(InterceptionEventKind::TornDown));
        assert_eq!(bus.history(Some(1)).len(), 1);
    }
}
