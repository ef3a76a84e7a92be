// ==========================================
// 农场直销平台 - 进程级配置
// ==========================================
// 来源: 环境变量（启动期读取一次）
// ==========================================

use std::path::PathBuf;

/// 默认监听地址
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";

/// 服务进程配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub db_path: String,
    pub bind_addr: String,
}

impl ServerConfig {
    /// 从环境变量读取
    ///
    /// - FARM_LINK_DB_PATH: 数据库路径（缺省见 `get_default_db_path`）
    /// - FARM_LINK_BIND_ADDR: 监听地址（缺省 0.0.0.0:3001）
    pub fn from_env() -> Self {
        let bind_addr = non_empty_env("FARM_LINK_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        Self {
            db_path: get_default_db_path(),
            bind_addr,
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 获取默认数据库路径
///
/// 优先 FARM_LINK_DB_PATH；否则放在用户数据目录下，
/// 开发构建使用独立目录，避免污染生产数据。
pub fn get_default_db_path() -> String {
    if let Some(path) = non_empty_env("FARM_LINK_DB_PATH") {
        return path;
    }

    let mut path = PathBuf::from("./farm_link.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = if cfg!(debug_assertions) {
            data_dir.join("farm-link-dev")
        } else {
            data_dir.join("farm-link")
        };

        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("farm_link.db");
        }
    }

    path.to_string_lossy().to_string()
}
