// ==========================================
// 农场直销平台 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换下层错误为用户可读的错误消息
// 红线: 所有错误信息必须包含显式原因
// ==========================================

use crate::common::sql_builder::QueryError;
use crate::engine::allocator::{AllocatorError, LineProblem};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    /// 自动下单请求行校验失败（逐行原因）
    #[error("下单请求校验失败: {reason}")]
    OrderValidationError {
        reason: String,
        problems: Vec<LineProblem>,
    },

    /// 列表查询参数不合法（字段/排序不在白名单内）
    #[error("查询参数错误: {0}")]
    InvalidQuery(#[from] QueryError),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("并发修改冲突: {0}")]
    ConcurrentModification(String),

    /// 提交已回滚，可整体重试
    #[error("订单提交失败，可重试: {0}")]
    RetryablePersistence(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::StockConflict {
                stock_id,
                requested_kg,
                available_kg,
            } => ApiError::RetryablePersistence(format!(
                "库存记录{}已被其他订单占用（需{}kg，剩余{}kg）",
                stock_id, requested_kg, available_kg
            )),
            RepositoryError::ConcurrentModification { entity, id } => {
                ApiError::ConcurrentModification(format!("{}(id={})已被其他请求修改", entity, id))
            }

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            // 业务规则错误
            RepositoryError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),

            // 数据质量错误
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
        }
    }
}

// ==========================================
// 从 AllocatorError 转换
// ==========================================
impl From<AllocatorError> for ApiError {
    fn from(err: AllocatorError) -> Self {
        match err {
            AllocatorError::EmptyRequest => {
                ApiError::InvalidInput("下单请求至少包含一行".to_string())
            }
            AllocatorError::Validation(problems) => {
                let reason = AllocatorError::Validation(problems.clone()).to_string();
                ApiError::OrderValidationError { reason, problems }
            }
            AllocatorError::Persistence { message, retryable } => {
                if retryable {
                    ApiError::RetryablePersistence(message)
                } else {
                    ApiError::DatabaseError(message)
                }
            }
            AllocatorError::Repository(e) => ApiError::from(e),
        }
    }
}

impl ApiError {
    /// 错误代码（返回给调用方）
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::OrderValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidQuery(_) => "INVALID_QUERY",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            ApiError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            ApiError::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            ApiError::RetryablePersistence(_) => "PERSISTENCE_RETRYABLE",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::DatabaseTransactionError(_) => "DATABASE_TRANSACTION_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// 附加详情（可选）
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::OrderValidationError { problems, .. } => {
                Some(serde_json::json!({ "problems": problems }))
            }
            ApiError::InvalidStateTransition { from, to } => {
                Some(serde_json::json!({ "from": from, "to": to }))
            }
            _ => None,
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
