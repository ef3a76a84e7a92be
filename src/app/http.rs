// ==========================================
// 农场直销平台 - HTTP 接口
// ==========================================
// 职责: axum 路由、请求解析、统一响应封装
// 约定: 业务 API 为同步调用，统一放入 spawn_blocking
// 响应: { success, data?, error?: { code, message, details? } }
// ==========================================

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::app::state::AppState;
use crate::domain::order::OrderRequestLine;

/// 下单人请求头
pub const USER_ID_HEADER: &str = "x-user-id";

// ==========================================
// 请求/响应结构
// ==========================================

/// POST /orders/auto 请求体
#[derive(Debug, Clone, Deserialize)]
pub struct AutoOrderRequest {
    pub crops: Vec<OrderRequestLine>,
}

/// PATCH /orders/{id}/status 请求体
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

/// 错误响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,

    /// 错误消息
    pub message: String,

    /// 详细信息（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// 统一响应封装
#[derive(Debug, Clone, Serialize)]
pub struct ApiEnvelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

// ==========================================
// 路由
// ==========================================

/// 构建路由
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/orders/auto", post(place_auto_order))
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order).delete(delete_order))
        .route("/orders/{id}/status", patch(update_order_status))
        .route("/crops/available", get(list_available_crops))
        .route(
            "/crops/availability-details/{crop_name}",
            get(crop_availability_details),
        )
        .route("/farmers", get(list_farmers))
        .with_state(state)
}

// ==========================================
// 处理器
// ==========================================

async fn health_check() -> Response {
    success(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}

async fn place_auto_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<AutoOrderRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return map_api_error(ApiError::InvalidInput(format!(
                "请求体格式错误: {}",
                rejection.body_text()
            )))
        }
    };

    let buyer_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .unwrap_or_default();
    if buyer_id.is_empty() {
        return map_api_error(ApiError::InvalidInput(
            "缺少请求头 X-User-Id".to_string(),
        ));
    }

    let api = state.order_api.clone();
    run_blocking(move || api.place_auto_order(&buyer_id, &request.crops)).await
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let api = state.order_api.clone();
    run_blocking(move || api.list_orders(&pairs)).await
}

async fn get_order(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let api = state.order_api.clone();
    run_blocking(move || api.get_order(&id)).await
}

async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return map_api_error(ApiError::InvalidInput(format!(
                "请求体格式错误: {}",
                rejection.body_text()
            )))
        }
    };

    let api = state.order_api.clone();
    run_blocking(move || api.update_order_status(&id, &request.status)).await
}

async fn delete_order(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let api = state.order_api.clone();
    run_blocking(move || api.delete_order(&id)).await
}

async fn list_available_crops(State(state): State<Arc<AppState>>) -> Response {
    let api = state.crop_api.clone();
    run_blocking(move || api.list_available()).await
}

async fn crop_availability_details(
    State(state): State<Arc<AppState>>,
    Path(crop_name): Path<String>,
) -> Response {
    let api = state.crop_api.clone();
    run_blocking(move || api.availability_details(&crop_name)).await
}

async fn list_farmers(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let api = state.farmer_api.clone();
    run_blocking(move || api.list_farmers(&pairs)).await
}

// ==========================================
// 公共工具：阻塞执行、响应封装、错误映射
// ==========================================

/// 在阻塞线程池执行同步 API
async fn run_blocking<T, F>(f: F) -> Response
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Serialize + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(data)) => success(data),
        Ok(Err(err)) => map_api_error(err),
        Err(join_err) => map_api_error(ApiError::InternalError(format!(
            "后台任务执行失败: {}",
            join_err
        ))),
    }
}

fn success<T: Serialize>(data: T) -> Response {
    let envelope = ApiEnvelope {
        success: true,
        data: Some(data),
        error: None,
    };
    (StatusCode::OK, Json(envelope)).into_response()
}

/// ApiError → HTTP 状态码
pub fn status_for(err: &ApiError) -> StatusCode {
    match err {
        ApiError::InvalidInput(_)
        | ApiError::OrderValidationError { .. }
        | ApiError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        ApiError::BusinessRuleViolation(_)
        | ApiError::InvalidStateTransition { .. }
        | ApiError::ConcurrentModification(_) => StatusCode::CONFLICT,
        ApiError::RetryablePersistence(_) | ApiError::DatabaseTransactionError(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ApiError::DatabaseError(_)
        | ApiError::DatabaseConnectionError(_)
        | ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// 将ApiError转换为错误响应
fn map_api_error(err: ApiError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(code = err.code(), error = %err, "请求处理失败");
    } else {
        tracing::debug!(code = err.code(), error = %err, "请求被拒绝");
    }

    let envelope: ApiEnvelope<()> = ApiEnvelope {
        success: false,
        data: None,
        error: Some(ErrorResponse {
            code: err.code().to_string(),
            message: err.to_string(),
            details: err.details(),
        }),
    };
    (status, Json(envelope)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::error::RepositoryError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&ApiError::InvalidInput("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ApiError::NotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&ApiError::InvalidStateTransition {
                from: "PENDING".to_string(),
                to: "DELIVERED".to_string()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&ApiError::from(RepositoryError::StockConflict {
                stock_id: 1,
                requested_kg: 1.0,
                available_kg: 0.0
            })),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&ApiError::DatabaseError("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
