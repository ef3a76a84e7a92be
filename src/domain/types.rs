// ==========================================
// 农场直销平台 - 领域类型定义
// ==========================================
// 职责: 订单状态、单位策略等枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// 生命周期: PENDING → ACKNOWLEDGED → DISPATCHED → DELIVERED → RECEIVED
// 红线: 只允许逐级前进，不允许跳级或回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,      // 待确认（自动分配创建）
    Acknowledged, // 农户已确认
    Dispatched,   // 已发货
    Delivered,    // 已送达
    Received,     // 买家已签收
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl OrderStatus {
    /// 从字符串解析状态（未知值返回 None）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(OrderStatus::Pending),
            "ACKNOWLEDGED" => Some(OrderStatus::Acknowledged),
            "DISPATCHED" => Some(OrderStatus::Dispatched),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "RECEIVED" => Some(OrderStatus::Received),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Acknowledged => "ACKNOWLEDGED",
            OrderStatus::Dispatched => "DISPATCHED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Received => "RECEIVED",
        }
    }

    /// 下一个合法状态（终态返回 None）
    pub fn next(&self) -> Option<Self> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Acknowledged),
            OrderStatus::Acknowledged => Some(OrderStatus::Dispatched),
            OrderStatus::Dispatched => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => Some(OrderStatus::Received),
            OrderStatus::Received => None,
        }
    }

    /// 是否允许从当前状态迁移到 `to`
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        self.next() == Some(to)
    }

    /// 仅待确认订单可删除
    pub fn is_deletable(&self) -> bool {
        *self == OrderStatus::Pending
    }
}

// ==========================================
// 未知单位策略 (Unknown Unit Policy)
// ==========================================
// FAIL_OPEN: 未知单位按 1:1 公斤处理（历史行为）
// REJECT:    未知单位视为校验失败
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnknownUnitPolicy {
    FailOpen,
    Reject,
}

impl fmt::Display for UnknownUnitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownUnitPolicy::FailOpen => write!(f, "FAIL_OPEN"),
            UnknownUnitPolicy::Reject => write!(f, "REJECT"),
        }
    }
}

impl UnknownUnitPolicy {
    /// 从字符串解析策略（无法识别时返回默认值 REJECT）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "FAIL_OPEN" => UnknownUnitPolicy::FailOpen,
            _ => UnknownUnitPolicy::Reject,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_forward_only() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Acknowledged));
        assert!(OrderStatus::Acknowledged.can_transition_to(OrderStatus::Dispatched));
        assert!(OrderStatus::Dispatched.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Delivered.can_transition_to(OrderStatus::Received));

        // 跳级 / 回退 / 原地
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Dispatched));
        assert!(!OrderStatus::Dispatched.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
        assert!(OrderStatus::Received.next().is_none());
    }

    #[test]
    fn test_order_status_db_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Acknowledged,
            OrderStatus::Dispatched,
            OrderStatus::Delivered,
            OrderStatus::Received,
        ] {
            assert_eq!(OrderStatus::parse(status.to_db_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("pending"), Some(OrderStatus::Pending));
        assert_eq!(OrderStatus::parse("shipped"), None);
    }

    #[test]
    fn test_order_status_serde() {
        let json = serde_json::to_string(&OrderStatus::Acknowledged).unwrap();
        assert_eq!(json, "\"ACKNOWLEDGED\"");
    }

    #[test]
    fn test_unknown_unit_policy_parse() {
        assert_eq!(UnknownUnitPolicy::from_str("fail_open"), UnknownUnitPolicy::FailOpen);
        assert_eq!(UnknownUnitPolicy::from_str("REJECT"), UnknownUnitPolicy::Reject);
        assert_eq!(UnknownUnitPolicy::from_str("???"), UnknownUnitPolicy::Reject);
    }
}
