//! Aggregation Engine: pure functions over activity sets. The Entity Store
//! fetches and filters; everything here is in-memory computation.
//!
//! Precision note: the dashboard summary rounds completion rates to one
//! decimal, report statistics and breakdowns to two. The split is
//! intentional; consumers round differently.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{Activity, ActivityUpdate, Priority, Status, User};

pub const UNKNOWN_USER: &str = "Unknown";
pub const NO_DEPARTMENT: &str = "Not assigned";

/// Inclusive calendar-day range bounding every aggregation. Callers bound
/// computation cost by keeping this range narrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if start > end {
            return Err(AppError::bad_request("date range start is after end"));
        }
        Ok(Self { start, end })
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn start_at(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.start.and_time(NaiveTime::MIN))
    }

    /// First instant after the range; `end` itself is inclusive.
    pub fn end_exclusive(&self) -> DateTime<Utc> {
        let next = self.end.checked_add_days(Days::new(1)).unwrap_or(self.end);
        Utc.from_utc_datetime(&next.and_time(NaiveTime::MIN))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// done/total as a percentage; 0 when the set is empty, never NaN.
fn completion_rate(done: i64, total: i64, decimals: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(done as f64 / total as f64 * 100.0, decimals)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub total: i64,
    pub pending: i64,
    pub done: i64,
    /// one decimal (dashboard precision)
    pub completion_rate: f64,
}

pub fn summarize(activities: &[Activity]) -> ActivitySummary {
    let total = activities.len() as i64;
    let done = activities.iter().filter(|a| a.status == Status::Done).count() as i64;
    ActivitySummary {
        total,
        pending: total - done,
        done,
        completion_rate: completion_rate(done, total, 1),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityStatistics {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    /// two decimals (report precision)
    pub completion_rate: f64,
    pub by_priority: PriorityCounts,
}

pub fn statistics(activities: &[Activity], range: &DateRange) -> ActivityStatistics {
    let total = activities.len() as i64;
    let completed = activities.iter().filter(|a| a.status == Status::Done).count() as i64;
    let mut by_priority = PriorityCounts {
        low: 0,
        medium: 0,
        high: 0,
    };
    for activity in activities {
        match activity.priority {
            Priority::Low => by_priority.low += 1,
            Priority::Medium => by_priority.medium += 1,
            Priority::High => by_priority.high += 1,
        }
    }

    ActivityStatistics {
        start: range.start,
        end: range.end,
        total,
        completed,
        pending: total - completed,
        completion_rate: completion_rate(completed, total, 2),
        by_priority,
    }
}

/// Average hours from activity creation to the most recent update that set
/// status to done, over done activities only. Activities without such an
/// update are excluded; `None` when nothing qualifies.
pub fn average_resolution_hours(activities: &[Activity], updates: &[ActivityUpdate]) -> Option<f64> {
    let mut hours = Vec::new();

    for activity in activities.iter().filter(|a| a.status == Status::Done) {
        let resolved_at = updates
            .iter()
            .filter(|u| u.activity_id == activity.id && u.new_status == Status::Done)
            .map(|u| u.created_at)
            .max();

        if let Some(resolved_at) = resolved_at {
            let elapsed = resolved_at - activity.created_at;
            hours.push(elapsed.num_seconds() as f64 / 3600.0);
        }
    }

    if hours.is_empty() {
        return None;
    }
    let avg = hours.iter().sum::<f64>() / hours.len() as f64;
    Some(round_to(avg, 2))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBreakdown {
    pub user_id: Uuid,
    pub user_name: String,
    pub department: Option<String>,
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub completion_rate: f64,
}

/// Per-creator breakdown, sorted descending by total. The sort is stable, so
/// creators with equal totals keep first-seen order.
pub fn per_user_breakdown(activities: &[Activity], users: &[User]) -> Vec<UserBreakdown> {
    let directory: HashMap<Uuid, &User> = users.iter().map(|u| (u.id, u)).collect();

    let mut order: Vec<Uuid> = Vec::new();
    let mut counts: HashMap<Uuid, (i64, i64)> = HashMap::new();
    for activity in activities {
        let entry = counts.entry(activity.created_by).or_insert_with(|| {
            order.push(activity.created_by);
            (0, 0)
        });
        entry.0 += 1;
        if activity.status == Status::Done {
            entry.1 += 1;
        }
    }

    let mut rows: Vec<UserBreakdown> = order
        .into_iter()
        .map(|user_id| {
            let (total, completed) = counts[&user_id];
            let user = directory.get(&user_id);
            UserBreakdown {
                user_id,
                user_name: user.map(|u| u.name.clone()).unwrap_or_else(|| UNKNOWN_USER.to_string()),
                department: user.and_then(|u| u.department.clone()),
                total,
                completed,
                pending: total - completed,
                completion_rate: completion_rate(completed, total, 2),
            }
        })
        .collect();

    rows.sort_by(|a, b| b.total.cmp(&a.total));
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayBreakdown {
    pub date: NaiveDate,
    pub weekday: String,
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
}

/// One entry per calendar day in the range, zeros included. Counts only
/// activities created on that day.
pub fn per_day_breakdown(activities: &[Activity], range: &DateRange) -> Vec<DayBreakdown> {
    let mut per_day: HashMap<NaiveDate, (i64, i64)> = HashMap::new();
    for activity in activities {
        let day = activity.created_at.date_naive();
        if !range.contains(day) {
            continue;
        }
        let entry = per_day.entry(day).or_insert((0, 0));
        entry.0 += 1;
        if activity.status == Status::Done {
            entry.1 += 1;
        }
    }

    let mut rows = Vec::with_capacity(range.days() as usize);
    let mut day = range.start;
    loop {
        let (total, completed) = per_day.get(&day).copied().unwrap_or((0, 0));
        rows.push(DayBreakdown {
            date: day,
            weekday: day.format("%A").to_string(),
            total,
            completed,
            pending: total - completed,
        });
        if day >= range.end {
            break;
        }
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentBreakdown {
    pub department: String,
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub completion_rate: f64,
}

/// Grouped by the creator's department, first-seen order. Creators without a
/// department (or unknown creators) land under "Not assigned".
pub fn department_breakdown(activities: &[Activity], users: &[User]) -> Vec<DepartmentBreakdown> {
    let directory: HashMap<Uuid, &User> = users.iter().map(|u| (u.id, u)).collect();

    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, (i64, i64)> = HashMap::new();
    for activity in activities {
        let department = directory
            .get(&activity.created_by)
            .and_then(|u| u.department.clone())
            .unwrap_or_else(|| NO_DEPARTMENT.to_string());
        let entry = counts.entry(department.clone()).or_insert_with(|| {
            order.push(department);
            (0, 0)
        });
        entry.0 += 1;
        if activity.status == Status::Done {
            entry.1 += 1;
        }
    }

    order
        .into_iter()
        .map(|department| {
            let (total, completed) = counts[&department];
            DepartmentBreakdown {
                department,
                total,
                completed,
                pending: total - completed,
                completion_rate: completion_rate(completed, total, 2),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendGrouping {
    Day,
    Week,
    Month,
}

impl TrendGrouping {
    fn label(&self, date: NaiveDate) -> String {
        match self {
            TrendGrouping::Day => date.format("%Y-%m-%d").to_string(),
            TrendGrouping::Week => {
                let week = date.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            TrendGrouping::Month => date.format("%Y-%m").to_string(),
        }
    }
}

/// Parallel series shaped for charting: one label per bucket, one value
/// per bucket in each series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub labels: Vec<String>,
    pub total: Vec<i64>,
    pub completed: Vec<i64>,
    pub pending: Vec<i64>,
}

/// Bucket activities by day/week/month over the range. Every bucket the range
/// touches appears, including empty ones.
pub fn trends(activities: &[Activity], range: &DateRange, grouping: TrendGrouping) -> TrendSeries {
    // walk the range once to fix bucket order
    let mut labels: Vec<String> = Vec::new();
    let mut day = range.start;
    loop {
        let label = grouping.label(day);
        if labels.last() != Some(&label) {
            labels.push(label);
        }
        if day >= range.end {
            break;
        }
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }

    let mut counts: HashMap<String, (i64, i64)> = HashMap::new();
    for activity in activities {
        let created = activity.created_at.date_naive();
        if !range.contains(created) {
            continue;
        }
        let entry = counts.entry(grouping.label(created)).or_insert((0, 0));
        entry.0 += 1;
        if activity.status == Status::Done {
            entry.1 += 1;
        }
    }

    let mut total = Vec::with_capacity(labels.len());
    let mut completed = Vec::with_capacity(labels.len());
    let mut pending = Vec::with_capacity(labels.len());
    for label in &labels {
        let (t, c) = counts.get(label).copied().unwrap_or((0, 0));
        total.push(t);
        completed.push(c);
        pending.push(t - c);
    }

    TrendSeries {
        labels,
        total,
        completed,
        pending,
    }
}
