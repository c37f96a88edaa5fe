//! Report surface: wires the Entity Store, Cache Coordinator, and
//! Aggregation Engine together. Every operation is a cached wrapper around a
//! bounded fetch plus a pure computation from `stats`.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::cache::{cache_key, ttl, CacheCoordinator, InvalidationScope};
use crate::errors::AppResult;
use crate::models::{Priority, Status};
use crate::stats::{
    self, ActivityStatistics, ActivitySummary, DateRange, DayBreakdown, DepartmentBreakdown,
    TrendGrouping, TrendSeries, UserBreakdown,
};
use crate::store;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub statuses: Vec<String>,
    pub priorities: Vec<String>,
    pub departments: Vec<String>,
}

#[derive(Clone)]
pub struct ReportService {
    pool: SqlitePool,
    cache: CacheCoordinator,
}

impl ReportService {
    pub fn new(pool: SqlitePool, cache: CacheCoordinator) -> Self {
        Self { pool, cache }
    }

    /// Headline counts for the dashboard; completion rate at one decimal.
    pub async fn dashboard_summary(&self, range: &DateRange) -> AppResult<ActivitySummary> {
        let key = cache_key("reports.dashboard_summary", range);
        let pool = self.pool.clone();
        let range = *range;
        self.cache
            .get_or_compute(&key, ttl::DASHBOARD, || async move {
                let activities = store::list_activities_created_between(&pool, &range).await?;
                Ok(stats::summarize(&activities))
            })
            .await
    }

    /// Full report statistics; completion rate at two decimals.
    pub async fn report_statistics(&self, range: &DateRange) -> AppResult<ActivityStatistics> {
        let key = cache_key("reports.statistics", range);
        let pool = self.pool.clone();
        let range = *range;
        self.cache
            .get_or_compute(&key, ttl::REPORT, || async move {
                let activities = store::list_activities_created_between(&pool, &range).await?;
                Ok(stats::statistics(&activities, &range))
            })
            .await
    }

    pub async fn user_breakdown(&self, range: &DateRange) -> AppResult<Vec<UserBreakdown>> {
        let key = cache_key("reports.user_breakdown", range);
        let pool = self.pool.clone();
        let range = *range;
        self.cache
            .get_or_compute(&key, ttl::REPORT, || async move {
                let activities = store::list_activities_created_between(&pool, &range).await?;
                let users = store::list_users(&pool).await?;
                Ok(stats::per_user_breakdown(&activities, &users))
            })
            .await
    }

    pub async fn daily_breakdown(&self, range: &DateRange) -> AppResult<Vec<DayBreakdown>> {
        let key = cache_key("reports.daily_breakdown", range);
        let pool = self.pool.clone();
        let range = *range;
        self.cache
            .get_or_compute(&key, ttl::DASHBOARD, || async move {
                let activities = store::list_activities_created_between(&pool, &range).await?;
                Ok(stats::per_day_breakdown(&activities, &range))
            })
            .await
    }

    pub async fn department_breakdown(&self, range: &DateRange) -> AppResult<Vec<DepartmentBreakdown>> {
        let key = cache_key("reports.department_breakdown", range);
        let pool = self.pool.clone();
        let range = *range;
        self.cache
            .get_or_compute(&key, ttl::REPORT, || async move {
                let activities = store::list_activities_created_between(&pool, &range).await?;
                let users = store::list_users(&pool).await?;
                Ok(stats::department_breakdown(&activities, &users))
            })
            .await
    }

    pub async fn trends(&self, range: &DateRange, grouping: TrendGrouping) -> AppResult<TrendSeries> {
        let key = cache_key("reports.trends", &(range, grouping));
        let pool = self.pool.clone();
        let range = *range;
        self.cache
            .get_or_compute(&key, ttl::REPORT, || async move {
                let activities = store::list_activities_created_between(&pool, &range).await?;
                Ok(stats::trends(&activities, &range, grouping))
            })
            .await
    }

    /// Average resolution hours over done activities in the range; `None`
    /// when nothing qualifies.
    pub async fn average_resolution(&self, range: &DateRange) -> AppResult<Option<f64>> {
        let key = cache_key("reports.average_resolution", range);
        let pool = self.pool.clone();
        let range = *range;
        self.cache
            .get_or_compute(&key, ttl::REPORT, || async move {
                let activities = store::list_activities_created_between(&pool, &range).await?;
                let updates = store::list_updates_for_range(&pool, &range).await?;
                Ok(stats::average_resolution_hours(&activities, &updates))
            })
            .await
    }

    /// Dropdown feeds for report filters. Statuses and priorities are the
    /// closed enums; departments come from the user directory.
    pub async fn filter_options(&self) -> AppResult<FilterOptions> {
        let key = cache_key("reports.filter_options", &());
        let pool = self.pool.clone();
        self.cache
            .get_or_compute(&key, ttl::FILTER_OPTIONS, || async move {
                let departments = store::list_departments(&pool).await?;
                Ok(FilterOptions {
                    statuses: Status::all().iter().map(|s| s.as_str().to_string()).collect(),
                    priorities: Priority::all().iter().map(|p| p.as_str().to_string()).collect(),
                    departments,
                })
            })
            .await
    }

    /// Drop cached report data after a write. Coarse backends wipe the whole
    /// cache for this scope.
    pub async fn invalidate(&self) {
        self.cache
            .invalidate(InvalidationScope::Prefix("reports".to_string()))
            .await;
    }
}
