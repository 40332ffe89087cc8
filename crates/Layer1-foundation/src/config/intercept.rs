//! Interception Config - 가로채기 엔진 설정
//!
//! 글로벌 → 프로젝트 순서로 병합되며, 파일에 없는 항목은 기본값을 유지합니다.

use super::store::{read_file, ConfigStore};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// 설정 파일명
pub const INTERCEPT_CONFIG_FILE: &str = "intercept.json";

/// notify-only Hook 에러 처리 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyErrorPolicy {
    /// 호출자에게 에러 전파 (변경은 이미 커밋됨)
    #[default]
    Propagate,
    /// 로그만 남기고 성공 반환
    Log,
}

/// 가로채기 엔진 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptionConfig {
    /// 이미 패치된 대상에 install 시 AlreadyPatched 에러
    #[serde(default)]
    pub strict_install: bool,

    /// 같은 값 할당 시 advisory Hook 생략
    #[serde(default = "default_true")]
    pub skip_unchanged: bool,

    /// notify-only Hook 에러 정책
    #[serde(default)]
    pub notify_errors: NotifyErrorPolicy,

    /// 이벤트 브로드캐스트 채널 용량
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// 이벤트 히스토리 보관 개수
    #[serde(default = "default_event_history")]
    pub event_history: usize,
}

fn default_true() -> bool {
    true
}

fn default_event_capacity() -> usize {
    256
}

fn default_event_history() -> usize {
    100
}

impl Default for InterceptionConfig {
    fn default() -> Self {
        Self {
            strict_install: false,
            skip_unchanged: true,
            notify_errors: NotifyErrorPolicy::default(),
            event_capacity: default_event_capacity(),
            event_history: default_event_history(),
        }
    }
}

/// 설정 파일 한 겹 (지정된 항목만 덮어씀)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptionConfigLayer {
    pub strict_install: Option<bool>,
    pub skip_unchanged: Option<bool>,
    pub notify_errors: Option<NotifyErrorPolicy>,
    pub event_capacity: Option<usize>,
    pub event_history: Option<usize>,
}

impl InterceptionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        // 1. 글로벌 설정
        if let Ok(global) = ConfigStore::global() {
            if let Some(layer) = global.load_optional(INTERCEPT_CONFIG_FILE)? {
                config.merge(layer);
            }
        }

        // 2. 프로젝트 설정
        if let Ok(project) = ConfigStore::current_project() {
            if let Some(layer) = project.load_optional(INTERCEPT_CONFIG_FILE)? {
                config.merge(layer);
            }
        }

        Ok(config)
    }

    /// 특정 파일에서 로드 (.json 또는 .toml)
    pub fn load_from(path: &Path) -> Result<Self> {
        let layer: InterceptionConfigLayer = read_file(path)?;
        let mut config = Self::new();
        config.merge(layer);
        debug!("Loaded interception config from {}", path.display());
        Ok(config)
    }

    /// 저장소에 저장
    pub fn save(&self, store: &ConfigStore) -> Result<()> {
        store.save(INTERCEPT_CONFIG_FILE, self)
    }

    /// 지정된 항목만 덮어쓰기
    pub fn merge(&mut self, layer: InterceptionConfigLayer) {
        if let Some(v) = layer.strict_install {
            self.strict_install = v;
        }
        if let Some(v) = layer.skip_unchanged {
            self.skip_unchanged = v;
        }
        if let Some(v) = layer.notify_errors {
            self.notify_errors = v;
        }
        if let Some(v) = layer.event_capacity {
            self.event_capacity = v.max(1);
        }
        if let Some(v) = layer.event_history {
            self.event_history = v;
        }
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn strict(mut self) -> Self {
        self.strict_install = true;
        self
    }

    pub fn skip_unchanged(mut self, enabled: bool) -> Self {
        self.skip_unchanged = enabled;
        self
    }

    pub fn notify_errors(mut self, policy: NotifyErrorPolicy) -> Self {
        self.notify_errors = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = InterceptionConfig::default();
        assert!(!config.strict_install);
        assert!(config.skip_unchanged);
        assert_eq!(config.notify_errors, NotifyErrorPolicy::Propagate);
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn test_merge_only_overrides_present_fields() {
        let mut config = InterceptionConfig::default();
        config.merge(InterceptionConfigLayer {
            strict_install: Some(true),
            event_capacity: Some(0),
            ..Default::default()
        });

        assert!(config.strict_install);
        assert!(config.skip_unchanged);
        assert_eq!(config.event_capacity, 1);
    }

    #[test]
    fn test_load_from_json_and_toml() {
        let dir = tempdir().unwrap();

        let json_path = dir.path().join("intercept.json");
        std::fs::write(&json_path, r#"{"notifyErrors": "log", "skipUnchanged": false}"#).unwrap();
        let config = InterceptionConfig::load_from(&json_path).unwrap();
        assert_eq!(config.notify_errors, NotifyErrorPolicy::Log);
        assert!(!config.skip_unchanged);

        let toml_path = dir.path().join("intercept.toml");
        std::fs::write(&toml_path, "strictInstall = true\neventHistory = 5\n").unwrap();
        let config = InterceptionConfig::load_from(&toml_path).unwrap();
        assert!(config.strict_install);
        assert_eq!(config.event_history, 5);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        let config = InterceptionConfig::new().strict();
        config.save(&store).unwrap();

        let loaded = InterceptionConfig::load_from(&store.file_path(INTERCEPT_CONFIG_FILE)).unwrap();
        assert_eq!(loaded, config);
    }
}
