// ==========================================
// 农场直销平台 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::api::{CropApi, FarmerApi, OrderApi};
use crate::config::config_manager::{ConfigManager, ServiceConfig};
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::engine::allocator::AutoOrderAllocator;
use crate::engine::unit_conversion::UnitConverter;
use crate::repository::{CropStockRepository, FarmerRepository, OrderRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源，由 HTTP 路由以 `Arc<AppState>` 共享
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 启动时加载的业务配置
    pub service_config: ServiceConfig,

    /// 订单API
    pub order_api: Arc<OrderApi>,

    /// 作物API
    pub crop_api: Arc<CropApi>,

    /// 农户API
    pub farmer_api: Arc<FarmerApi>,

    /// 作物库存仓储（用于库存维护）
    pub crop_repo: Arc<CropStockRepository>,

    /// 农户仓储（用于农户/农场登记）
    pub farmer_repo: Arc<FarmerRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并幂等建表
    /// 2. 从 config_kv 加载业务配置
    /// 3. 初始化 Repository / Engine / API
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;

        Self::from_connection(db_path, Arc::new(Mutex::new(conn)))
    }

    /// 基于已打开的共享连接构建（连接需已建表）
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        // ==========================================
        // 加载配置
        // ==========================================
        let config_manager = ConfigManager::from_connection(conn.clone());
        let service_config = config_manager
            .load_service_config()
            .map_err(|e| format!("加载业务配置失败: {}", e))?;
        tracing::info!(
            unknown_unit_policy = %service_config.unknown_unit_policy,
            sql_dialect = %service_config.sql_dialect,
            max_retries = service_config.allocation_max_retries,
            "业务配置已加载"
        );

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let crop_repo = Arc::new(CropStockRepository::new(conn.clone()));
        let order_repo = Arc::new(OrderRepository::new(conn.clone()));
        let farmer_repo = Arc::new(FarmerRepository::new(conn));

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let converter = UnitConverter::new(
            service_config.unit_table.clone(),
            service_config.unknown_unit_policy,
        );
        let allocator = Arc::new(
            AutoOrderAllocator::new(crop_repo.clone(), converter)
                .with_max_commit_retries(service_config.allocation_max_retries),
        );

        // ==========================================
        // 初始化API层
        // ==========================================
        let order_api = Arc::new(OrderApi::new(
            allocator,
            order_repo,
            service_config.sql_dialect,
            service_config.max_page_limit,
        ));
        let crop_api = Arc::new(CropApi::new(crop_repo.clone()));
        let farmer_api = Arc::new(FarmerApi::new(
            farmer_repo.clone(),
            service_config.sql_dialect,
            service_config.max_page_limit,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            service_config,
            order_api,
            crop_api,
            farmer_api,
            crop_repo,
            farmer_repo,
        })
    }
}
