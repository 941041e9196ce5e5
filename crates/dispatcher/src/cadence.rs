use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, Utc, Weekday};
use cron::Schedule;
use tracing::debug;

use survey_scheduler_core::{SchedulerError, SchedulerResult};

/// 推导周内触发日集合时基础评估器最多前瞻的次数。
/// 一条命中全部7个工作日的规则在第8次前瞻终止，上限只防御病态规则。
const WEEKDAY_SCAN_LIMIT: usize = 16;

/// 节律表达式解析和求值工具
///
/// 接受标准5字段cron表达式（分 时 日 月 周），末尾可以跟一个
/// 周跳跃后缀 `X<n>`，例如 `"0 12 * * MON X2"` 表示按正常cron匹配，
/// 但每2个匹配周只取1个。没有后缀时 `n = 1`，完全等价于基础cron。
///
/// 求值在配置的固定偏移时区内进行，返回值统一折算回UTC。
pub struct CadenceExpression {
    schedule: Schedule,
    week_interval: u32,
    timezone: FixedOffset,
    end_week_on_sunday: bool,
}

impl CadenceExpression {
    /// 解析节律表达式
    pub fn parse(
        expr: &str,
        timezone: FixedOffset,
        end_week_on_sunday: bool,
    ) -> SchedulerResult<Self> {
        let mut fields: Vec<&str> = expr.split_whitespace().collect();

        let mut week_interval: u32 = 1;
        if let Some(digits) = fields.last().and_then(|last| last.strip_prefix('X')) {
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                week_interval = digits.parse().map_err(|_| SchedulerError::InvalidCadence {
                    expr: expr.to_string(),
                    message: "周跳跃后缀超出取值范围".to_string(),
                })?;
                fields.pop();
            }
        }

        if week_interval == 0 {
            return Err(SchedulerError::InvalidCadence {
                expr: expr.to_string(),
                message: "周跳跃间隔必须大于0".to_string(),
            });
        }

        if fields.len() != 5 {
            return Err(SchedulerError::InvalidCadence {
                expr: expr.to_string(),
                message: format!("期望5个cron字段, 实际{}个", fields.len()),
            });
        }

        // cron::Schedule 解析的是带秒字段的形式，线上表达式固定为5字段
        let with_seconds = format!("0 {}", fields.join(" "));
        let schedule =
            Schedule::from_str(&with_seconds).map_err(|e| SchedulerError::InvalidCadence {
                expr: expr.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            schedule,
            week_interval,
            timezone,
            end_week_on_sunday,
        })
    }

    pub fn week_interval(&self) -> u32 {
        self.week_interval
    }

    /// 计算 `after` 之后（`inclusive` 时含 `after` 本身）的下一次触发时间
    ///
    /// `n = 1` 时直接透传基础评估器。`n > 1` 时按锚点工作日跳过整周块：
    /// 先从规则自身的命中序列推导出一周内的触发日集合，集合中最早的
    /// 工作日即每个命中周的锚点；下一次触发若落在锚点之外（周中），
    /// 说明仍处于已开始的命中周内，原样返回；若恰是锚点（新周起点），
    /// 将搜索起点前移 `7 * (n - 1)` 天后重新查询。
    pub fn next_occurrence(
        &self,
        after: DateTime<Utc>,
        inclusive: bool,
    ) -> Option<DateTime<Utc>> {
        if self.week_interval <= 1 {
            return self.base_next(after, inclusive);
        }

        let weekdays = self.matching_weekdays(after);
        let anchor = *weekdays.first()?;

        let next = self.base_next(after, inclusive)?;
        if self.normalized_weekday(next) != anchor {
            return Some(next);
        }

        let skipped = after + Duration::days(7 * (i64::from(self.week_interval) - 1));
        debug!(
            "下一次触发落在锚点工作日{anchor}, 搜索起点前移至 {}",
            skipped
        );
        self.base_next(skipped, inclusive)
    }

    /// 从 `from` 开始依次链式求值 `count` 个触发时间
    pub fn upcoming(&self, from: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        let mut occurrences = Vec::with_capacity(count);
        let mut cursor = from;
        for _ in 0..count {
            match self.next_occurrence(cursor, false) {
                Some(next) => {
                    occurrences.push(next);
                    cursor = next;
                }
                None => break,
            }
        }
        occurrences
    }

    fn base_next(&self, after: DateTime<Utc>, inclusive: bool) -> Option<DateTime<Utc>> {
        let local = after.with_timezone(&self.timezone);
        if inclusive && self.schedule.includes(local) {
            return Some(after);
        }
        self.schedule
            .after(&local)
            .next()
            .map(|next| next.with_timezone(&Utc))
    }

    /// 推导基础规则一周内会触发的工作日集合（升序）
    ///
    /// 从 `from` 开始反复询问基础评估器，直到某个工作日重复出现。
    fn matching_weekdays(&self, from: DateTime<Utc>) -> Vec<u32> {
        let local = from.with_timezone(&self.timezone);
        let mut seen: Vec<u32> = Vec::new();
        for occurrence in self.schedule.after(&local).take(WEEKDAY_SCAN_LIMIT) {
            let day = self.normalize(occurrence.weekday());
            if seen.contains(&day) {
                break;
            }
            seen.push(day);
        }
        seen.sort_unstable();
        seen
    }

    fn normalized_weekday(&self, instant: DateTime<Utc>) -> u32 {
        self.normalize(instant.with_timezone(&self.timezone).weekday())
    }

    /// 周日记0；按周一至周日划分周边界时把周日折算为第7天
    fn normalize(&self, weekday: Weekday) -> u32 {
        let day = weekday.num_days_from_sunday();
        if self.end_week_on_sunday && day == 0 {
            7
        } else {
            day
        }
    }
}
