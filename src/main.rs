// ==========================================
// 农场直销平台 - HTTP 服务主入口
// ==========================================

use std::sync::Arc;

use anyhow::Context;
use farm_link::app::{build_router, AppState};
use farm_link::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    farm_link::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - 订单分配服务", farm_link::APP_NAME);
    tracing::info!("系统版本: {}", farm_link::VERSION);
    tracing::info!("==================================================");

    let config = ServerConfig::from_env();
    tracing::info!("使用数据库: {}", config.db_path);

    // AppState 初始化包含建表与配置加载（同步 IO）
    let db_path = config.db_path.clone();
    let state = tokio::task::spawn_blocking(move || AppState::new(db_path))
        .await
        .context("AppState 初始化任务失败")?
        .map_err(anyhow::Error::msg)
        .context("无法初始化AppState")?;

    let app = build_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("无法监听地址: {}", config.bind_addr))?;
    tracing::info!("HTTP 服务已启动: http://{}", config.bind_addr);
    tracing::info!("健康检查: GET /health");
    tracing::info!("自动下单: POST /orders/auto (JSON, 请求头 X-User-Id)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP 服务异常退出")?;

    tracing::info!("HTTP 服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("监听退出信号失败: {}", e);
    }
}
