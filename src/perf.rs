// ==========================================
// 农场直销平台 - 性能观测
// ==========================================
// - PerfGuard: 记录单次 API 操作的耗时与 SQL 语句数
// - SQLite profile 回调: 慢 SQL 告警
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

static PERF_SQL_ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static SQL_COUNT: Cell<u64> = const { Cell::new(0) };
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        matches!(
            v.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

/// 安装 SQLite 语句 trace/profile
///
/// 开关：
/// - Debug 默认开启；Release 默认关闭
/// - `FARM_LINK_PERF_SQL=1` 强制开启
/// - `FARM_LINK_SLOW_SQL_MS=50` 慢 SQL 阈值（毫秒）
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = env_flag("FARM_LINK_PERF_SQL").unwrap_or(cfg!(debug_assertions));
    PERF_SQL_ENABLED.store(enabled, Ordering::Relaxed);

    if !enabled {
        conn.trace(None);
        conn.profile(None);
        return;
    }

    let slow_ms = std::env::var("FARM_LINK_SLOW_SQL_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
    SLOW_SQL_THRESHOLD_MS.store(slow_ms, Ordering::Relaxed);

    conn.trace(Some(on_sql_trace));
    conn.profile(Some(on_sql_profile));
}

fn on_sql_trace(_sql: &str) {
    SQL_COUNT.with(|c| c.set(c.get().saturating_add(1)));
}

fn on_sql_profile(sql: &str, duration: Duration) {
    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_THRESHOLD_MS.load(Ordering::Relaxed);
    if threshold == 0 || ms < threshold {
        return;
    }

    let mut sql_short: String = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if sql_short.chars().count() > 400 {
        sql_short = sql_short.chars().take(400).collect::<String>() + "…";
    }
    tracing::warn!(target: "slow_sql", duration_ms = ms, sql = %sql_short, "slow sql");
}

/// 操作耗时 Guard
///
/// ```ignore
/// let _perf = farm_link::perf::PerfGuard::new("order.place_auto_order");
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    sql_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            start: Instant::now(),
            sql_start: SQL_COUNT.with(|c| c.get()),
        }
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        let sql_count = if PERF_SQL_ENABLED.load(Ordering::Relaxed) {
            SQL_COUNT.with(|c| c.get()).saturating_sub(self.sql_start)
        } else {
            0
        };

        tracing::info!(target: "perf", op = self.op, elapsed_ms, sql_count, "done");
    }
}
