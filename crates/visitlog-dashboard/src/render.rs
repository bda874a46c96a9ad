//! Terminal presentation of the visit table.

use std::fmt;
use std::io::Write;

use chrono::{Local, TimeZone};
use tabled::{Table, Tabled};

use visitlog_core::visit::{VisitRecord, VisitStats, UNKNOWN};

/// What the presenter receives on every refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSnapshot {
    /// Newest visits, at most `display_limit` of them.
    pub rows: Vec<VisitRecord>,
    /// Computed over the whole stored collection, not just `rows`.
    pub stats: VisitStats,
}

impl DashboardSnapshot {
    pub fn from_visits(visits: &[VisitRecord], display_limit: usize) -> Self {
        Self {
            rows: visits.iter().take(display_limit).cloned().collect(),
            stats: VisitStats::from_visits(visits),
        }
    }
}

pub trait Presenter: Send + Sync + 'static {
    fn present(&self, snapshot: &DashboardSnapshot) -> anyhow::Result<()>;
}

/// Prints the stats line and visit table to stdout.
#[derive(Debug, Default)]
pub struct TablePresenter;

impl Presenter for TablePresenter {
    fn present(&self, snapshot: &DashboardSnapshot) -> anyhow::Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", render_table(snapshot))?;
        out.flush()?;
        Ok(())
    }
}

#[derive(Tabled)]
struct VisitRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Browser")]
    browser: String,
    #[tabled(rename = "Platform")]
    platform: String,
    #[tabled(rename = "ID")]
    id: String,
}

/// Render in the local time zone.
pub fn render_table(snapshot: &DashboardSnapshot) -> String {
    render_table_in(snapshot, &Local)
}

pub fn render_table_in<Tz>(snapshot: &DashboardSnapshot, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let header = format!(
        "Total visits: {} | Unique IPs: {}",
        snapshot.stats.total, snapshot.stats.unique_ips
    );
    if snapshot.rows.is_empty() {
        return format!("{header}\nNo visitor data available");
    }

    let rows: Vec<VisitRow> = snapshot
        .rows
        .iter()
        .map(|visit| VisitRow {
            time: display_time(visit, tz),
            ip: or_unknown(&visit.ip),
            browser: or_unknown(&visit.browser),
            platform: or_unknown(&visit.platform),
            id: visit.id.clone(),
        })
        .collect();
    format!("{header}\n{}", Table::new(rows))
}

fn display_time<Tz>(visit: &VisitRecord, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    match visit.visited_at() {
        Some(at) => at.with_timezone(tz).format("%I:%M:%S %p").to_string(),
        None => or_unknown(&visit.time),
    }
}

fn or_unknown(value: &str) -> String {
    if value.is_empty() {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn visit(id: &str, ip: &str, timestamp: i64) -> VisitRecord {
        VisitRecord {
            id: id.to_string(),
            time: String::new(),
            ip: ip.to_string(),
            browser: "Chrome".to_string(),
            platform: "Windows".to_string(),
            timestamp,
        }
        .normalized()
    }

    #[test]
    fn snapshot_caps_rows_but_not_stats() {
        let visits: Vec<VisitRecord> = (0..5)
            .map(|i| visit(&format!("v{i}"), &format!("10.0.0.{}", i % 2), 1_000 + i))
            .collect();
        let snapshot = DashboardSnapshot::from_visits(&visits, 3);
        assert_eq!(snapshot.rows.len(), 3);
        assert_eq!(snapshot.rows[0].id, "v0");
        assert_eq!(snapshot.stats.total, 5);
        assert_eq!(snapshot.stats.unique_ips, 2);
    }

    #[test]
    fn empty_snapshot_renders_placeholder() {
        let rendered = render_table_in(&DashboardSnapshot::from_visits(&[], 100), &Utc);
        assert_eq!(
            rendered,
            "Total visits: 0 | Unique IPs: 0\nNo visitor data available"
        );
    }

    #[test]
    fn table_shows_twelve_hour_time_and_fields() {
        // 2024-05-01T13:05:09Z
        let visits = vec![visit("abc123", "8.8.8.8", 1_714_568_709_000)];
        let rendered = render_table_in(&DashboardSnapshot::from_visits(&visits, 100), &Utc);

        assert!(rendered.starts_with("Total visits: 1 | Unique IPs: 1\n"));
        for expected in ["Time", "IP", "Browser", "Platform", "ID"] {
            assert!(rendered.contains(expected), "missing header {expected}");
        }
        assert!(rendered.contains("01:05:09 PM"), "{rendered}");
        assert!(rendered.contains("8.8.8.8"));
        assert!(rendered.contains("abc123"));
    }

    #[test]
    fn blank_fields_render_as_unknown() {
        let mut record = visit("x", "", 0);
        record.time = String::new();
        let rendered =
            render_table_in(&DashboardSnapshot::from_visits(&[record], 100), &Utc);
        assert!(rendered.contains("Unknown"));
    }
}
