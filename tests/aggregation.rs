use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use activity_core::models::{Activity, ActivityUpdate, Priority, Status, User};
use activity_core::stats::{
    self, DateRange, TrendGrouping, NO_DEPARTMENT,
};

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn activity(status: Status, created_at: DateTime<Utc>, created_by: Uuid) -> Activity {
    Activity {
        id: Uuid::new_v4(),
        name: "activity".to_string(),
        description: None,
        status,
        priority: Priority::Medium,
        created_by,
        assigned_to: None,
        due_date: None,
        created_at,
        updated_at: created_at,
    }
}

fn user(id: Uuid, name: &str, department: Option<&str>) -> User {
    let now = Utc::now();
    User {
        id,
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        department: department.map(String::from),
        created_at: now,
        updated_at: now,
    }
}

fn done_update(activity: &Activity, created_at: DateTime<Utc>) -> ActivityUpdate {
    ActivityUpdate {
        id: Uuid::new_v4(),
        activity_id: activity.id,
        user_id: activity.created_by,
        previous_status: Status::Pending,
        new_status: Status::Done,
        remarks: "resolved".to_string(),
        ip_address: None,
        user_agent: None,
        created_at,
    }
}

#[test]
fn summarize_empty_set_is_all_zeros() {
    let summary = stats::summarize(&[]);
    assert_eq!(summary.total, 0);
    assert_eq!(summary.pending, 0);
    assert_eq!(summary.done, 0);
    assert_eq!(summary.completion_rate, 0.0);
}

#[test]
fn summarize_counts_and_one_decimal_rate() {
    let creator = Uuid::new_v4();
    let created = at(2026, 3, 2, 9);
    let activities = vec![
        activity(Status::Pending, created, creator),
        activity(Status::Pending, created, creator),
        activity(Status::Done, created, creator),
        activity(Status::Done, created, creator),
        activity(Status::Done, created, creator),
    ];

    let summary = stats::summarize(&activities);
    assert_eq!(summary.total, 5);
    assert_eq!(summary.pending, 2);
    assert_eq!(summary.done, 3);
    assert_eq!(summary.completion_rate, 60.0);
}

#[test]
fn completion_rate_stays_within_bounds() {
    let creator = Uuid::new_v4();
    let created = at(2026, 3, 2, 9);

    let all_pending = vec![activity(Status::Pending, created, creator); 3];
    assert_eq!(stats::summarize(&all_pending).completion_rate, 0.0);

    let all_done = vec![activity(Status::Done, created, creator); 3];
    assert_eq!(stats::summarize(&all_done).completion_rate, 100.0);
}

#[test]
fn statistics_use_two_decimals_and_count_priorities() {
    let creator = Uuid::new_v4();
    let created = at(2026, 3, 2, 9);
    let mut activities = vec![
        activity(Status::Done, created, creator),
        activity(Status::Pending, created, creator),
        activity(Status::Pending, created, creator),
    ];
    activities[0].priority = Priority::High;
    activities[1].priority = Priority::Low;

    let range = DateRange::new(day(2026, 3, 1), day(2026, 3, 7)).unwrap();
    let result = stats::statistics(&activities, &range);

    assert_eq!(result.total, 3);
    assert_eq!(result.completed, 1);
    assert_eq!(result.pending, 2);
    assert_eq!(result.completion_rate, 33.33);
    assert_eq!(result.by_priority.high, 1);
    assert_eq!(result.by_priority.medium, 1);
    assert_eq!(result.by_priority.low, 1);
}

#[test]
fn per_day_breakdown_covers_every_day_in_range() {
    let creator = Uuid::new_v4();
    let activities = vec![
        activity(Status::Done, at(2026, 3, 2, 9), creator),
        activity(Status::Pending, at(2026, 3, 2, 14), creator),
        activity(Status::Pending, at(2026, 3, 5, 8), creator),
        // outside the range, must not be counted
        activity(Status::Pending, at(2026, 2, 28, 8), creator),
    ];

    let range = DateRange::new(day(2026, 3, 1), day(2026, 3, 7)).unwrap();
    let days = stats::per_day_breakdown(&activities, &range);

    assert_eq!(days.len(), 7);
    assert_eq!(days[0].date, day(2026, 3, 1));
    assert_eq!(days[0].weekday, "Sunday");
    assert_eq!(days[0].total, 0);

    assert_eq!(days[1].date, day(2026, 3, 2));
    assert_eq!(days[1].weekday, "Monday");
    assert_eq!(days[1].total, 2);
    assert_eq!(days[1].completed, 1);
    assert_eq!(days[1].pending, 1);

    assert_eq!(days[4].total, 1);
    assert_eq!(days[6].total, 0);

    let counted: i64 = days.iter().map(|d| d.total).sum();
    assert_eq!(counted, 3);
}

#[test]
fn per_user_breakdown_sorts_descending_with_stable_ties() {
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let cara = Uuid::new_v4();
    let created = at(2026, 3, 2, 9);

    // alice first seen, 1 activity; bob 2; cara 1 (tie with alice)
    let activities = vec![
        activity(Status::Done, created, alice),
        activity(Status::Pending, created, bob),
        activity(Status::Done, created, bob),
        activity(Status::Pending, created, cara),
    ];
    let users = vec![
        user(alice, "Alice", Some("Support")),
        user(bob, "Bob", Some("IT")),
        user(cara, "Cara", None),
    ];

    let rows = stats::per_user_breakdown(&activities, &users);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].user_name, "Bob");
    assert_eq!(rows[0].total, 2);
    assert_eq!(rows[0].completed, 1);
    assert_eq!(rows[0].completion_rate, 50.0);
    // tie between alice and cara keeps first-seen order
    assert_eq!(rows[1].user_name, "Alice");
    assert_eq!(rows[2].user_name, "Cara");
}

#[test]
fn unknown_creators_get_placeholder_name() {
    let ghost = Uuid::new_v4();
    let activities = vec![activity(Status::Pending, at(2026, 3, 2, 9), ghost)];

    let rows = stats::per_user_breakdown(&activities, &[]);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_name, "Unknown");
    assert!(rows[0].department.is_none());
}

#[test]
fn department_breakdown_groups_in_first_seen_order() {
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let cara = Uuid::new_v4();
    let created = at(2026, 3, 2, 9);

    let activities = vec![
        activity(Status::Done, created, alice),   // Support
        activity(Status::Pending, created, cara), // no department
        activity(Status::Pending, created, bob),  // IT
        activity(Status::Done, created, alice),   // Support again
    ];
    let users = vec![
        user(alice, "Alice", Some("Support")),
        user(bob, "Bob", Some("IT")),
        user(cara, "Cara", None),
    ];

    let rows = stats::department_breakdown(&activities, &users);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].department, "Support");
    assert_eq!(rows[0].total, 2);
    assert_eq!(rows[0].completed, 2);
    assert_eq!(rows[0].completion_rate, 100.0);
    assert_eq!(rows[1].department, NO_DEPARTMENT);
    assert_eq!(rows[2].department, "IT");
}

#[test]
fn resolution_hours_average_over_qualifying_activities() {
    let creator = Uuid::new_v4();

    let fast = activity(Status::Done, at(2026, 3, 2, 9), creator);
    let slow = activity(Status::Done, at(2026, 3, 2, 9), creator);
    // done activity without any done-update: excluded from the average
    let orphan = activity(Status::Done, at(2026, 3, 2, 9), creator);
    // pending activity: never counted
    let open = activity(Status::Pending, at(2026, 3, 2, 9), creator);

    let updates = vec![
        done_update(&fast, at(2026, 3, 2, 12)),  // 3h
        done_update(&slow, at(2026, 3, 2, 10)),  // superseded
        done_update(&slow, at(2026, 3, 2, 18)),  // 9h, most recent wins
    ];

    let activities = vec![fast, slow, orphan, open];
    let avg = stats::average_resolution_hours(&activities, &updates);
    assert_eq!(avg, Some(6.0));
}

#[test]
fn resolution_hours_none_when_nothing_qualifies() {
    let creator = Uuid::new_v4();
    let activities = vec![
        activity(Status::Pending, at(2026, 3, 2, 9), creator),
        activity(Status::Done, at(2026, 3, 2, 9), creator), // no done-update
    ];
    assert_eq!(stats::average_resolution_hours(&activities, &[]), None);
}

#[test]
fn trends_by_day_align_labels_and_series() {
    let creator = Uuid::new_v4();
    let activities = vec![
        activity(Status::Done, at(2026, 3, 2, 9), creator),
        activity(Status::Pending, at(2026, 3, 2, 10), creator),
        activity(Status::Pending, at(2026, 3, 4, 8), creator),
    ];

    let range = DateRange::new(day(2026, 3, 1), day(2026, 3, 4)).unwrap();
    let series = stats::trends(&activities, &range, TrendGrouping::Day);

    assert_eq!(series.labels, vec!["2026-03-01", "2026-03-02", "2026-03-03", "2026-03-04"]);
    assert_eq!(series.total, vec![0, 2, 0, 1]);
    assert_eq!(series.completed, vec![0, 1, 0, 0]);
    assert_eq!(series.pending, vec![0, 1, 0, 1]);
}

#[test]
fn trends_by_week_bucket_across_boundaries() {
    let creator = Uuid::new_v4();
    let activities = vec![
        activity(Status::Done, at(2026, 3, 2, 9), creator),   // week 10
        activity(Status::Pending, at(2026, 3, 9, 9), creator), // week 11
    ];

    // 2026-03-02 is Monday of ISO week 10
    let range = DateRange::new(day(2026, 3, 2), day(2026, 3, 15)).unwrap();
    let series = stats::trends(&activities, &range, TrendGrouping::Week);

    assert_eq!(series.labels, vec!["2026-W10", "2026-W11"]);
    assert_eq!(series.total, vec![1, 1]);
}

#[test]
fn trends_by_month_include_empty_months() {
    let creator = Uuid::new_v4();
    let activities = vec![activity(Status::Done, at(2026, 1, 15, 9), creator)];

    let range = DateRange::new(day(2026, 1, 1), day(2026, 3, 31)).unwrap();
    let series = stats::trends(&activities, &range, TrendGrouping::Month);

    assert_eq!(series.labels, vec!["2026-01", "2026-02", "2026-03"]);
    assert_eq!(series.total, vec![1, 0, 0]);
    assert_eq!(series.completed, vec![1, 0, 0]);
}
