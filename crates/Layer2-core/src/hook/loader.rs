//! Watch Loader - watches.json 로더
//!
//! 사용자 디렉토리와 프로젝트 디렉토리의 `.tripwire/watches.json`을 찾아 병합합니다.

use super::manifest::WatchManifest;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tripwire_foundation::{Error, Result, PROJECT_DIR};

/// 매니페스트 파일 이름
pub const WATCHES_FILE: &str = "watches.json";

/// 매니페스트 로더
pub struct WatchLoader {
    /// 검색 경로 (앞쪽이 낮은 우선순위)
    search_paths: Vec<PathBuf>,
}

impl WatchLoader {
    /// 기본 검색 경로로 생성
    pub fn new(working_dir: &Path) -> Self {
        let mut paths = Vec::new();

        // 1. User-level
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(PROJECT_DIR));
        }

        // 2. Project-level
        paths.push(working_dir.join(PROJECT_DIR));

        Self {
            search_paths: paths,
        }
    }

    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths: paths,
        }
    }

    pub fn add_path(&mut self, path: PathBuf) {
        self.search_paths.push(path);
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// 모든 경로에서 로드하여 병합 (읽을 수 없는 파일은 경고 후 건너뜀)
    pub fn load_all(&self) -> Result<WatchManifest> {
        let mut merged = WatchManifest::new();

        for search_path in &self.search_paths {
            let file = search_path.join(WATCHES_FILE);
            if !file.exists() {
                continue;
            }
            match load_manifest_from_file(&file) {
                Ok(manifest) => {
                    info!("Loaded watches from: {}", file.display());
                    merged.merge(manifest);
                }
                Err(e) => {
                    warn!("Failed to load watches from {}: {}", file.display(), e);
                }
            }
        }

        Ok(merged)
    }

    /// 특정 디렉토리에서만 로드
    pub fn load_from(&self, dir: &Path) -> Result<WatchManifest> {
        load_manifest_from_dir(dir)
    }
}

/// 파일에서 매니페스트 로드
pub fn load_manifest_from_file(path: &Path) -> Result<WatchManifest> {
    let content = std::fs::read_to_string(path)?;
    let manifest: WatchManifest = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Invalid {} at {}: {}", WATCHES_FILE, path.display(), e))
    })?;

    debug!("Loaded {} watches from {}", manifest.len(), path.display());
    Ok(manifest)
}

/// 디렉토리에서 매니페스트 로드 (없으면 빈 매니페스트)
pub fn load_manifest_from_dir(dir: &Path) -> Result<WatchManifest> {
    let file = dir.join(WATCHES_FILE);
    if file.exists() {
        load_manifest_from_file(&file)
    } else {
        Ok(WatchManifest::new())
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const WATCH: &str = r#"{
        "watches": [{
            "scope": { "global": "all_sequences" },
            "facility": "index_writer",
            "hooks": { "on_set_item": "log" }
        }]
    }"#;

    #[test]
    fn test_loader_new() {
        let loader = WatchLoader::new(Path::new("."));
        assert!(!loader.search_paths().is_empty());
        assert!(loader.search_paths().last().unwrap().ends_with(PROJECT_DIR));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(WATCHES_FILE), WATCH).unwrap();

        let manifest = load_manifest_from_dir(dir.path()).unwrap();
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn test_load_nonexistent() {
        let manifest = load_manifest_from_dir(Path::new("/nonexistent/path")).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join(WATCHES_FILE);
        fs::write(&file, "{ not json").unwrap();

        let err = load_manifest_from_file(&file).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_all_merges_and_skips_broken() {
        let user = tempdir().unwrap();
        let project = tempdir().unwrap();
        let broken = tempdir().unwrap();
        fs::write(user.path().join(WATCHES_FILE), WATCH).unwrap();
        fs::write(project.path().join(WATCHES_FILE), WATCH).unwrap();
        fs::write(broken.path().join(WATCHES_FILE), "{ broken").unwrap();

        let loader = WatchLoader::with_paths(vec![
            user.path().to_path_buf(),
            broken.path().to_path_buf(),
            project.path().to_path_buf(),
        ]);
        let manifest = loader.load_all().unwrap();
        assert_eq!(manifest.len(), 2);
    }
}
