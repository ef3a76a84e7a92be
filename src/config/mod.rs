// ==========================================
// 农场直销平台 - 配置层
// ==========================================
// 进程级: 环境变量 (ServerConfig)
// 运行期: config_kv 表 (ConfigManager → ServiceConfig)
// ==========================================

pub mod config_manager;
pub mod server_config;

// 重导出核心配置
pub use config_manager::{config_keys, ConfigManager, ServiceConfig};
pub use server_config::{get_default_db_path, ServerConfig};
