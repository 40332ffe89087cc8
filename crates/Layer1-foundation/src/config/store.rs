//! Config Store - 설정 파일 저장소
//!
//! JSON과 TOML 설정 파일을 확장자로 구분하여 읽고 씁니다.

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 프로젝트 설정 디렉토리 이름
pub const PROJECT_DIR: &str = ".tripwire";

/// 설정 파일 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// 파일 확장자로 형식 판별 (기본 JSON)
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// 설정 파일 저장소
#[derive(Debug, Clone)]
pub struct ConfigStore {
    base_dir: PathBuf,
}

impl ConfigStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// 글로벌 설정 (~/.config/tripwire/)
    pub fn global() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Cannot find config directory".to_string()))?
            .join("tripwire");
        Ok(Self::new(dir))
    }

    /// 프로젝트 설정 (<root>/.tripwire/)
    pub fn project(root: impl Into<PathBuf>) -> Self {
        Self::new(root.into().join(PROJECT_DIR))
    }

    /// 현재 디렉토리 프로젝트 설정
    pub fn current_project() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::Config(format!("Cannot get current directory: {}", e)))?;
        Ok(Self::project(cwd))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.base_dir.join(filename)
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.file_path(filename).exists()
    }

    /// 파일 로드
    pub fn load<T: DeserializeOwned>(&self, filename: &str) -> Result<T> {
        read_file(&self.file_path(filename))
    }

    /// 파일이 없으면 None
    pub fn load_optional<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        if !path.exists() {
            return Ok(None);
        }
        read_file(&path).map(Some)
    }

    /// 파일 저장 (디렉토리 자동 생성)
    pub fn save<T: Serialize>(&self, filename: &str, data: &T) -> Result<()> {
        if !self.base_dir.exists() {
            std::fs::create_dir_all(&self.base_dir)
                .map_err(|e| Error::Config(format!("Failed to create directory: {}", e)))?;
        }

        let path = self.file_path(filename);
        let content = match ConfigFormat::from_path(&path) {
            ConfigFormat::Json => serde_json::to_string_pretty(data)
                .map_err(|e| Error::Config(format!("Failed to serialize: {}", e)))?,
            ConfigFormat::Toml => toml::to_string_pretty(data)
                .map_err(|e| Error::Config(format!("Failed to serialize: {}", e)))?,
        };

        std::fs::write(&path, content)
            .map_err(|e| Error::Config(format!("Failed to write {}: {}", path.display(), e)))?;
        debug!("Saved config to {}", path.display());
        Ok(())
    }
}

/// 경로에서 직접 로드 (형식은 확장자로 결정)
pub fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

    match ConfigFormat::from_path(path) {
        ConfigFormat::Json => serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e))),
        ConfigFormat::Toml => toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested"));
        let sample = Sample {
            name: "a".into(),
            count: 2,
        };

        store.save("sample.json", &sample).unwrap();
        assert!(store.exists("sample.json"));

        let loaded: Sample = store.load("sample.json").unwrap();
        assert_eq!(loaded, sample);
    }

    #[test]
    fn test_save_and_load_toml() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        let sample = Sample {
            name: "b".into(),
            count: 7,
        };

        store.save("sample.toml", &sample).unwrap();
        let raw = std::fs::read_to_string(store.file_path("sample.toml")).unwrap();
        assert!(raw.contains("count = 7"));

        let loaded: Sample = store.load("sample.toml").unwrap();
        assert_eq!(loaded, sample);
    }

    #[test]
    fn test_load_optional_missing() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::project(dir.path());
        let loaded: Option<Sample> = store.load_optional("missing.json").unwrap();
        assert!(loaded.is_none());
        assert!(store.base_dir().ends_with(PROJECT_DIR));
    }
}
