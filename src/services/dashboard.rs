//! Dashboard summary: lead/customer totals, today's activity, the status
//! pipeline, and per-user conversion for admins.
//!
//! The store is read once per request; [`aggregate`] is a pure function over
//! the fetched snapshots so it can be exercised without a database.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::lead::LeadStatus;
use crate::models::user::UserRole;

/// Bucket for leads whose status is missing or blank.
pub const UNKNOWN_STATUS: &str = "Unknown";

/// The lead columns the summary needs. Everything is optional so that rows
/// written outside the API can never abort aggregation.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct LeadSnapshot {
    pub status: Option<String>,
    pub agent_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct CustomerSnapshot {
    pub created_at: Option<DateTime<Utc>>,
}

/// Display identity of a user for the per-user breakdown.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserSnapshot {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Point-in-time dashboard summary.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_leads: i64,
    pub total_customers: i64,
    pub converted_leads: i64,
    pub today_leads: i64,
    pub today_customers: i64,
    pub leads_by_status: StatusCounts,
    /// Present for admins only; omitted entirely for agents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_stats: Option<Vec<UserStat>>,
}

/// Lead performance of one user.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStat {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub total_leads: i64,
    pub converted_leads: i64,
    /// Percentage rounded to one decimal; 0 for users without leads.
    pub conversion_rate: f64,
}

/// Lead counts keyed by status label.
///
/// Serializes as a JSON object whose keys follow the pipeline order
/// (`New`, `Contacted`, `In Progress`, `Converted`, `Lost`), then any other
/// label in the order it was first seen. Only labels with a count appear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusCounts {
    // Insertion order is first-seen order.
    entries: Vec<(String, i64)>,
}

impl StatusCounts {
    pub fn increment(&mut self, status: &str) {
        match self.entries.iter_mut().find(|(key, _)| key == status) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((status.to_string(), 1)),
        }
    }

    pub fn get(&self, status: &str) -> i64 {
        self.entries
            .iter()
            .find(|(key, _)| key == status)
            .map_or(0, |(_, count)| *count)
    }

    pub fn total(&self) -> i64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in display order.
    pub fn ordered(&self) -> Vec<(&str, i64)> {
        let known = LeadStatus::ALL.iter().filter_map(|status| {
            let count = self.get(status.label());
            (count > 0).then_some((status.label(), count))
        });
        let others = self
            .entries
            .iter()
            .filter(|(key, _)| LeadStatus::from_label(key).is_none())
            .map(|(key, count)| (key.as_str(), *count));
        known.chain(others).collect()
    }
}

impl Serialize for StatusCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ordered = self.ordered();
        let mut map = serializer.serialize_map(Some(ordered.len()))?;
        for (status, count) in ordered {
            map.serialize_entry(status, &count)?;
        }
        map.end()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    total: i64,
    converted: i64,
}

/// Bucket key for a raw status value. Surrounding whitespace is ignored.
fn status_key(raw: Option<&str>) -> &str {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => UNKNOWN_STATUS,
    }
}

/// Whether `created_at` falls on the calendar day of `now`, in `now`'s offset.
/// Records without a timestamp are never "today".
pub fn is_same_day(created_at: Option<DateTime<Utc>>, now: &DateTime<FixedOffset>) -> bool {
    created_at.is_some_and(|ts| ts.with_timezone(&now.timezone()).date_naive() == now.date_naive())
}

/// `converted / total * 100`, rounded to one decimal, and 0 when `total` is 0.
pub fn conversion_rate(converted: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (converted as f64 * 1000.0 / total as f64).round() / 10.0
}

/// Compute the dashboard summary from already-fetched collections.
///
/// `users` is only consulted for admins. Leads whose agent matches no user
/// still count toward the global totals but appear in no `userStats` entry.
/// `userStats` follows the order of `users`.
pub fn aggregate(
    leads: &[LeadSnapshot],
    customers: &[CustomerSnapshot],
    users: &[UserSnapshot],
    role: UserRole,
    now: DateTime<FixedOffset>,
) -> DashboardSummary {
    let converted_label = LeadStatus::Converted.label();

    let mut leads_by_status = StatusCounts::default();
    let mut today_leads = 0;
    let mut per_agent: HashMap<Uuid, Tally> = HashMap::new();

    for lead in leads {
        let key = status_key(lead.status.as_deref());
        leads_by_status.increment(key);

        if is_same_day(lead.created_at, &now) {
            today_leads += 1;
        }

        if let Some(agent_id) = lead.agent_id {
            let tally = per_agent.entry(agent_id).or_default();
            tally.total += 1;
            if key == converted_label {
                tally.converted += 1;
            }
        }
    }

    let today_customers = customers
        .iter()
        .filter(|c| is_same_day(c.created_at, &now))
        .count() as i64;

    let user_stats: Option<Vec<UserStat>> = role.is_admin().then(|| {
        users
            .iter()
            .map(|user| {
                let tally = per_agent.get(&user.id).copied().unwrap_or_default();
                UserStat {
                    id: user.id,
                    name: user.name.clone(),
                    email: user.email.clone(),
                    total_leads: tally.total,
                    converted_leads: tally.converted,
                    conversion_rate: conversion_rate(tally.converted, tally.total),
                }
            })
            .collect()
    });

    DashboardSummary {
        total_leads: leads.len() as i64,
        total_customers: customers.len() as i64,
        converted_leads: leads_by_status.get(converted_label),
        today_leads,
        today_customers,
        leads_by_status,
        user_stats,
    }
}

/// Fetch the collections and build the summary for a caller with `role`.
///
/// A failure reading any collection fails the whole request.
pub async fn get_summary(
    pool: &PgPool,
    role: UserRole,
    now: DateTime<FixedOffset>,
) -> Result<DashboardSummary, AppError> {
    let (leads, customers, users) = if role.is_admin() {
        tokio::try_join!(fetch_leads(pool), fetch_customers(pool), fetch_users(pool))?
    } else {
        let (leads, customers) = tokio::try_join!(fetch_leads(pool), fetch_customers(pool))?;
        (leads, customers, Vec::new())
    };

    tracing::debug!(
        leads = leads.len(),
        customers = customers.len(),
        users = users.len(),
        role = role.as_str(),
        "Aggregating dashboard summary"
    );

    Ok(aggregate(&leads, &customers, &users, role, now))
}

async fn fetch_leads(pool: &PgPool) -> Result<Vec<LeadSnapshot>, AppError> {
    let rows = sqlx::query_as::<_, LeadSnapshot>("SELECT status, agent_id, created_at FROM leads")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

async fn fetch_customers(pool: &PgPool) -> Result<Vec<CustomerSnapshot>, AppError> {
    let rows = sqlx::query_as::<_, CustomerSnapshot>("SELECT created_at FROM customers")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

async fn fetch_users(pool: &PgPool) -> Result<Vec<UserSnapshot>, AppError> {
    let rows = sqlx::query_as::<_, UserSnapshot>(
        "SELECT id, name, email FROM users ORDER BY created_at ASC, id ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn now() -> DateTime<FixedOffset> {
        utc().with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn today() -> Option<DateTime<Utc>> {
        Some(now().with_timezone(&Utc) - Duration::hours(2))
    }

    fn yesterday() -> Option<DateTime<Utc>> {
        Some(now().with_timezone(&Utc) - Duration::days(1))
    }

    fn lead(status: Option<&str>, created_at: Option<DateTime<Utc>>) -> LeadSnapshot {
        LeadSnapshot {
            status: status.map(str::to_string),
            agent_id: None,
            created_at,
        }
    }

    fn owned(status: &str, agent_id: Uuid) -> LeadSnapshot {
        LeadSnapshot {
            status: Some(status.to_string()),
            agent_id: Some(agent_id),
            created_at: yesterday(),
        }
    }

    fn user(id: Uuid, name: &str) -> UserSnapshot {
        UserSnapshot {
            id,
            name: name.to_string(),
            email: format!("{}@crm.test", name.to_lowercase()),
        }
    }

    #[test]
    fn empty_input_is_all_zero() {
        let summary = aggregate(&[], &[], &[], UserRole::Admin, now());
        assert_eq!(summary.total_leads, 0);
        assert_eq!(summary.total_customers, 0);
        assert_eq!(summary.converted_leads, 0);
        assert_eq!(summary.today_leads, 0);
        assert_eq!(summary.today_customers, 0);
        assert!(summary.leads_by_status.is_empty());
        assert_eq!(summary.user_stats, Some(vec![]));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["leadsByStatus"], serde_json::json!({}));
        assert_eq!(json["userStats"], serde_json::json!([]));
    }

    #[test]
    fn mixed_pipeline_scenario() {
        let leads = vec![
            lead(Some("New"), today()),
            lead(Some("Converted"), today()),
            lead(Some("Converted"), yesterday()),
            lead(Some("Lost"), yesterday()),
        ];
        let customers = vec![CustomerSnapshot {
            created_at: today(),
        }];

        let summary = aggregate(&leads, &customers, &[], UserRole::Agent, now());
        assert_eq!(summary.total_leads, 4);
        assert_eq!(summary.converted_leads, 2);
        assert_eq!(summary.today_leads, 2);
        assert_eq!(summary.total_customers, 1);
        assert_eq!(summary.today_customers, 1);
        assert_eq!(
            serde_json::to_value(&summary.leads_by_status).unwrap(),
            serde_json::json!({"New": 1, "Converted": 2, "Lost": 1})
        );
    }

    #[test]
    fn agents_never_receive_user_stats() {
        let agent = Uuid::new_v4();
        let leads = vec![owned("Converted", agent)];
        let users = vec![user(agent, "Avery")];

        let summary = aggregate(&leads, &[], &users, UserRole::Agent, now());
        assert!(summary.user_stats.is_none());

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("userStats").is_none());
        assert_eq!(json["totalLeads"], 1);
    }

    #[test]
    fn admin_sees_every_user_including_idle_ones() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let leads = vec![owned("Converted", a), owned("New", a), owned("Lost", a)];
        let users = vec![user(a, "Avery"), user(b, "Blake")];

        let stats = aggregate(&leads, &[], &users, UserRole::Admin, now())
            .user_stats
            .unwrap();
        assert_eq!(stats.len(), 2);

        assert_eq!(stats[0].id, a);
        assert_eq!(stats[0].total_leads, 3);
        assert_eq!(stats[0].converted_leads, 1);
        assert!((stats[0].conversion_rate - 33.3).abs() < 1e-9);

        assert_eq!(stats[1].id, b);
        assert_eq!(stats[1].total_leads, 0);
        assert_eq!(stats[1].converted_leads, 0);
        assert_eq!(stats[1].conversion_rate, 0.0);

        let json = serde_json::to_value(&stats[1]).unwrap();
        assert_eq!(json["_id"], b.to_string());
        assert_eq!(json["email"], "blake@crm.test");
        assert_eq!(json["conversionRate"], 0.0);
    }

    #[test]
    fn dangling_agent_reference_counts_globally_only() {
        let known = Uuid::new_v4();
        let ghost = Uuid::new_v4();
        let leads = vec![owned("Converted", known), owned("Converted", ghost)];
        let users = vec![user(known, "Avery")];

        let summary = aggregate(&leads, &[], &users, UserRole::Admin, now());
        assert_eq!(summary.total_leads, 2);
        assert_eq!(summary.converted_leads, 2);

        let stats = summary.user_stats.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].total_leads, 1);
        let attributed: i64 = stats.iter().map(|s| s.converted_leads).sum();
        assert!(attributed <= summary.converted_leads);
    }

    #[test]
    fn missing_and_unrecognised_status_get_their_own_buckets() {
        let leads = vec![
            lead(Some("Qualified"), None),
            lead(None, None),
            lead(Some("   "), None),
            lead(Some("New"), None),
            lead(Some("Converted"), None),
            lead(Some("On Hold"), None),
            lead(Some("Qualified"), None),
        ];

        let summary = aggregate(&leads, &[], &[], UserRole::Agent, now());
        assert_eq!(summary.leads_by_status.get(UNKNOWN_STATUS), 2);
        assert_eq!(summary.leads_by_status.get("Qualified"), 2);
        assert_eq!(summary.leads_by_status.total(), summary.total_leads);

        // Known statuses first in pipeline order, then first-seen order.
        let keys: Vec<&str> = summary
            .leads_by_status
            .ordered()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(
            keys,
            vec!["New", "Converted", "Qualified", UNKNOWN_STATUS, "On Hold"]
        );

        let rendered = serde_json::to_string(&summary.leads_by_status).unwrap();
        assert_eq!(
            rendered,
            r#"{"New":1,"Converted":1,"Qualified":2,"Unknown":2,"On Hold":1}"#
        );
    }

    #[test]
    fn pipeline_order_ignores_arrival_order() {
        let leads: Vec<LeadSnapshot> = ["Lost", "Converted", "In Progress", "Contacted", "New"]
            .into_iter()
            .map(|s| lead(Some(s), None))
            .collect();
        let summary = aggregate(&leads, &[], &[], UserRole::Agent, now());
        let keys: Vec<&str> = summary
            .leads_by_status
            .ordered()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["New", "Contacted", "In Progress", "Converted", "Lost"]);
    }

    #[test]
    fn status_totals_always_match_lead_total() {
        let labels = [
            Some("New"),
            Some("Contacted"),
            Some("In Progress"),
            Some("Converted"),
            Some("Lost"),
            Some("Archived"),
            None,
        ];
        // Deterministic spread of sizes and label mixes.
        for size in 0..60usize {
            let leads: Vec<LeadSnapshot> = (0..size)
                .map(|i| lead(labels[(i * 7 + size) % labels.len()], today()))
                .collect();
            let summary = aggregate(&leads, &[], &[], UserRole::Agent, now());
            assert_eq!(summary.leads_by_status.total(), summary.total_leads);
            assert_eq!(
                summary.converted_leads,
                summary.leads_by_status.get("Converted")
            );
            assert_eq!(summary.today_leads, size as i64);
        }
    }

    #[test]
    fn day_boundary_falls_in_exactly_one_day() {
        let now = now();
        let last_second = utc().with_ymd_and_hms(2026, 3, 9, 23, 59, 59).unwrap();
        let midnight = utc().with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();
        let end_of_today = utc().with_ymd_and_hms(2026, 3, 10, 23, 59, 59).unwrap();
        let tomorrow = utc().with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap();

        assert!(!is_same_day(Some(last_second.with_timezone(&Utc)), &now));
        assert!(is_same_day(Some(midnight.with_timezone(&Utc)), &now));
        assert!(is_same_day(Some(end_of_today.with_timezone(&Utc)), &now));
        assert!(!is_same_day(Some(tomorrow.with_timezone(&Utc)), &now));

        // The same instant is "today" for exactly one of two consecutive days.
        let next_day = now + Duration::days(1);
        for instant in [last_second, midnight, end_of_today, tomorrow] {
            let ts = Some(instant.with_timezone(&Utc));
            let hits = [is_same_day(ts, &now), is_same_day(ts, &next_day)]
                .iter()
                .filter(|hit| **hit)
                .count();
            assert!(hits <= 1);
        }
    }

    #[test]
    fn day_boundary_respects_business_offset() {
        let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let now = ist.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        // 20:00 UTC on the 9th is 01:30 on the 10th in +05:30.
        let evening_utc = Utc.with_ymd_and_hms(2026, 3, 9, 20, 0, 0).unwrap();
        assert!(is_same_day(Some(evening_utc), &now));
        assert!(!is_same_day(Some(evening_utc), &now.with_timezone(&utc())));
    }

    #[test]
    fn missing_timestamp_is_never_today() {
        let leads = vec![lead(Some("New"), None)];
        let customers = vec![CustomerSnapshot { created_at: None }];
        let summary = aggregate(&leads, &customers, &[], UserRole::Agent, now());
        assert_eq!(summary.total_leads, 1);
        assert_eq!(summary.today_leads, 0);
        assert_eq!(summary.total_customers, 1);
        assert_eq!(summary.today_customers, 0);
    }

    #[test]
    fn conversion_rate_rounds_to_one_decimal() {
        assert_eq!(conversion_rate(0, 0), 0.0);
        assert_eq!(conversion_rate(5, 0), 0.0);
        assert_eq!(conversion_rate(1, 3), 33.3);
        assert_eq!(conversion_rate(2, 3), 66.7);
        assert_eq!(conversion_rate(4, 4), 100.0);
        assert_eq!(conversion_rate(1, 8), 12.5);
    }

    #[test]
    fn status_whitespace_is_trimmed() {
        let leads = vec![lead(Some(" Converted "), None)];
        let summary = aggregate(&leads, &[], &[], UserRole::Agent, now());
        assert_eq!(summary.converted_leads, 1);
        assert_eq!(summary.leads_by_status.len(), 1);
    }
}
