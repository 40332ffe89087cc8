//! Config - 설정 관리
//!
//! - `intercept.rs` - InterceptionConfig (엔진 동작 설정)
//! - `store.rs` - ConfigStore (JSON/TOML 파일 저장소)

mod intercept;
mod store;

pub use intercept::{
    InterceptionConfig, InterceptionConfigLayer, NotifyErrorPolicy, INTERCEPT_CONFIG_FILE,
};
pub use store::{read_file, ConfigFormat, ConfigStore, PROJECT_DIR};
