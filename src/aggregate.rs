//! Chart-ready series derived from cached collections.
//!
//! Everything here is a pure function of its input: no network access, no
//! cache writes. Output is deterministic, colors included.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::inventory::types::{
  ExpenseAnalysis, OrderByStatus, PaymentByMethod, SalesAnalysis, TransactionByType,
};

/// Colors handed out to groups, in order of sorted group key.
pub const PALETTE: [&str; 4] = ["#0088FE", "#00C49F", "#FFBB28", "#FF8042"];

/// One slice of a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
  pub name: String,
  pub amount: f64,
  pub color: &'static str,
}

/// Group `records` by `group_key` and count them, keeping only those for
/// which `keep` holds.
pub fn aggregate<R>(
  records: &[R],
  group_key: impl Fn(&R) -> &str,
  keep: impl Fn(&R) -> bool,
) -> Vec<SeriesPoint> {
  aggregate_sum(records, group_key, |_| 1.0, keep)
}

/// Group `records` by `group_key` and sum `value` per group.
///
/// Groups appear in the order they are first seen. Display names have
/// underscores replaced by spaces.
pub fn aggregate_sum<R>(
  records: &[R],
  group_key: impl Fn(&R) -> &str,
  value: impl Fn(&R) -> f64,
  keep: impl Fn(&R) -> bool,
) -> Vec<SeriesPoint> {
  let mut order: Vec<&str> = Vec::new();
  let mut totals: HashMap<&str, f64> = HashMap::new();

  for record in records.iter().filter(|r| keep(r)) {
    let key = group_key(record);
    match totals.get_mut(key) {
      Some(total) => *total += value(record),
      None => {
        order.push(key);
        totals.insert(key, value(record));
      }
    }
  }

  let ranks: HashMap<&str, usize> = order
    .iter()
    .copied()
    .collect::<BTreeSet<_>>()
    .into_iter()
    .enumerate()
    .map(|(rank, key)| (key, rank))
    .collect();

  order
    .into_iter()
    .map(|key| SeriesPoint {
      name: key.replace('_', " "),
      amount: totals[key],
      color: PALETTE[ranks[key] % PALETTE.len()],
    })
    .collect()
}

/// Layouts of local datetimes without an offset, as emitted by most backends.
const NAIVE_LAYOUTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// `YYYY-MM-DD` day of a timestamp, in UTC.
///
/// Accepts RFC 3339 timestamps, datetimes without an offset (read as UTC)
/// and anything starting with a plain date.
pub fn day_of(timestamp: &str) -> Option<NaiveDate> {
  let timestamp = timestamp.trim();
  if let Ok(ts) = DateTime::parse_from_rfc3339(timestamp) {
    return Some(ts.with_timezone(&Utc).date_naive());
  }
  for layout in NAIVE_LAYOUTS {
    if let Ok(ts) = NaiveDateTime::parse_from_str(timestamp, layout) {
      return Some(ts.date());
    }
  }
  let prefix = timestamp.get(..10)?;
  NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Inclusive range of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
  pub start: NaiveDate,
  pub end: NaiveDate,
}

impl DateRange {
  pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
    Self { start, end }
  }

  /// Whether `timestamp` falls on a day inside the range. Unparseable
  /// timestamps never match.
  pub fn contains(&self, timestamp: &str) -> bool {
    day_of(timestamp).is_some_and(|day| self.start <= day && day <= self.end)
  }
}

/// Which group values a chart shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
  #[default]
  All,
  Only(String),
}

impl Selection {
  pub fn matches(&self, value: &str) -> bool {
    match self {
      Selection::All => true,
      Selection::Only(wanted) => wanted == value,
    }
  }
}

/// Value selector plus optional date range, as offered by the chart page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
  pub selection: Selection,
  pub range: Option<DateRange>,
}

impl RecordFilter {
  pub fn matches(&self, group: &str, timestamp: &str) -> bool {
    self.selection.matches(group) && self.range.map_or(true, |r| r.contains(timestamp))
  }
}

/// A record that can be charted by group over time.
pub trait ChartRecord {
  fn group(&self) -> &str;
  fn timestamp(&self) -> &str;
}

impl ChartRecord for OrderByStatus {
  fn group(&self) -> &str {
    &self.status
  }

  fn timestamp(&self) -> &str {
    &self.created_at
  }
}

impl ChartRecord for PaymentByMethod {
  fn group(&self) -> &str {
    &self.method
  }

  fn timestamp(&self) -> &str {
    &self.timestamp
  }
}

impl ChartRecord for TransactionByType {
  fn group(&self) -> &str {
    &self.kind
  }

  fn timestamp(&self) -> &str {
    &self.timestamp
  }
}

/// Count `records` per group after applying `filter`.
pub fn chart_series<R: ChartRecord>(records: &[R], filter: &RecordFilter) -> Vec<SeriesPoint> {
  aggregate(records, R::group, |r| filter.matches(r.group(), r.timestamp()))
}

/// Headline numbers of the sales card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesSummary {
  pub total: f64,
  pub average_change: f64,
  /// Period with the highest sales; on ties the later one wins.
  pub peak: Option<SalesAnalysis>,
}

pub fn sales_summary(sales: &[SalesAnalysis]) -> SalesSummary {
  let total = sales.iter().map(|s| s.total_sales).sum();
  let average_change = if sales.is_empty() {
    0.0
  } else {
    sales.iter().map(|s| s.percentage_change).sum::<f64>() / sales.len() as f64
  };
  let peak = sales
    .iter()
    .fold(None::<&SalesAnalysis>, |best, s| match best {
      Some(b) if b.total_sales > s.total_sales => Some(b),
      _ => Some(s),
    })
    .cloned();

  SalesSummary {
    total,
    average_change,
    peak,
  }
}

/// Expense categories as a chart series plus their total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseBreakdown {
  pub categories: Vec<SeriesPoint>,
  pub total: f64,
}

pub fn expense_breakdown(expenses: &[ExpenseAnalysis]) -> ExpenseBreakdown {
  let categories = aggregate_sum(expenses, |e| e.category.as_str(), |e| e.total, |_| true);
  let total = categories.iter().map(|c| c.amount).sum();
  ExpenseBreakdown { categories, total }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn order(id: u64, status: &str, created_at: &str) -> OrderByStatus {
    OrderByStatus {
      order_id: id,
      status: status.into(),
      created_at: created_at.into(),
    }
  }

  fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
  }

  fn january() -> DateRange {
    DateRange::new(date("2024-01-01"), date("2024-01-31"))
  }

  #[test]
  fn test_orders_grouped_by_status_in_first_seen_order() {
    let orders = vec![
      order(1, "PENDING", "2024-01-03T10:00:00Z"),
      order(2, "COMPLETED", "2024-01-04T10:00:00Z"),
      order(3, "PENDING", "2024-01-05T10:00:00Z"),
    ];
    let series = chart_series(&orders, &RecordFilter::default());
    let summary: Vec<_> = series.iter().map(|p| (p.name.as_str(), p.amount)).collect();
    assert_eq!(summary, vec![("PENDING", 2.0), ("COMPLETED", 1.0)]);
  }

  #[test]
  fn test_date_range_is_inclusive_and_excludes_outside() {
    let orders = vec![
      order(1, "PENDING", "2024-01-01T00:00:00Z"),
      order(2, "PENDING", "2024-01-31T23:59:59Z"),
      order(3, "PENDING", "2024-02-01T00:00:00Z"),
    ];
    let filter = RecordFilter {
      selection: Selection::All,
      range: Some(january()),
    };
    let series = chart_series(&orders, &filter);
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].amount, 2.0);
  }

  #[test]
  fn test_range_compares_utc_day() {
    // 23:30 at -02:00 is already February in UTC.
    let range = january();
    assert!(!range.contains("2024-01-31T23:30:00-02:00"));
    assert!(range.contains("2024-01-15"));
    assert!(!range.contains("yesterday"));
  }

  #[test]
  fn test_range_accepts_datetimes_without_offset() {
    let range = january();
    assert!(range.contains("2024-01-15T10:00:00"));
    assert!(range.contains("2024-01-15 10:00:00"));
    assert!(range.contains("2024-01-15T10:00:00.123"));
    assert!(range.contains("2024-01-31T23:59:59.999999"));
    assert!(!range.contains("2024-02-01T00:00:00"));
    assert!(!range.contains("2024-13-01T00:00:00"));
    assert!(!range.contains(""));
  }

  #[test]
  fn test_day_of_falls_back_to_date_prefix() {
    assert_eq!(day_of("2024-01-15T10:00"), Some(date("2024-01-15")));
    assert_eq!(day_of(" 2024-01-15 "), Some(date("2024-01-15")));
    assert_eq!(day_of("15/01/2024"), None);
  }

  #[test]
  fn test_chart_keeps_offset_less_records_in_range() {
    let orders = vec![
      order(1, "PENDING", "2024-01-03T10:00:00"),
      order(2, "COMPLETED", "2024-01-04 08:15:00"),
      order(3, "PENDING", "2024-02-02T10:00:00"),
    ];
    let filter = RecordFilter {
      selection: Selection::All,
      range: Some(january()),
    };
    let series = chart_series(&orders, &filter);
    let summary: Vec<_> = series.iter().map(|p| (p.name.as_str(), p.amount)).collect();
    assert_eq!(summary, vec![("PENDING", 1.0), ("COMPLETED", 1.0)]);
  }

  #[test]
  fn test_selection_filters_group() {
    let orders = vec![
      order(1, "PENDING", "2024-01-03T10:00:00Z"),
      order(2, "COMPLETED", "2024-01-04T10:00:00Z"),
    ];
    let filter = RecordFilter {
      selection: Selection::Only("COMPLETED".into()),
      range: None,
    };
    let series = chart_series(&orders, &filter);
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].name, "COMPLETED");
  }

  #[test]
  fn test_names_and_colors_are_deterministic() {
    let payments = vec![
      PaymentByMethod {
        payment_id: 1,
        method: "CREDIT_CARD".into(),
        timestamp: "2024-01-01T00:00:00Z".into(),
      },
      PaymentByMethod {
        payment_id: 2,
        method: "BANK_TRANSFER".into(),
        timestamp: "2024-01-01T00:00:00Z".into(),
      },
    ];
    let first = chart_series(&payments, &RecordFilter::default());
    let second = chart_series(&payments, &RecordFilter::default());
    assert_eq!(first, second);

    assert_eq!(first[0].name, "CREDIT CARD");
    // BANK_TRANSFER sorts first, so it gets the first color.
    assert_eq!(first[0].color, PALETTE[1]);
    assert_eq!(first[1].color, PALETTE[0]);
  }

  #[test]
  fn test_palette_cycles() {
    let keys = ["a", "b", "c", "d", "e"];
    let series = aggregate(&keys, |k| *k, |_| true);
    assert_eq!(series[4].color, PALETTE[0]);
  }

  #[test]
  fn test_sales_summary() {
    let sales = vec![
      SalesAnalysis {
        period: "2024-01-01".into(),
        total_sales: 100.0,
        percentage_change: 10.0,
      },
      SalesAnalysis {
        period: "2024-01-08".into(),
        total_sales: 300.0,
        percentage_change: -4.0,
      },
    ];
    let summary = sales_summary(&sales);
    assert_eq!(summary.total, 400.0);
    assert_eq!(summary.average_change, 3.0);
    assert_eq!(summary.peak.map(|p| p.period), Some("2024-01-08".to_string()));

    let empty = sales_summary(&[]);
    assert_eq!(empty.average_change, 0.0);
    assert!(empty.peak.is_none());
  }

  #[test]
  fn test_expense_breakdown() {
    let expenses = vec![
      ExpenseAnalysis {
        category: "Office".into(),
        total: 120.5,
      },
      ExpenseAnalysis {
        category: "Salaries".into(),
        total: 1000.0,
      },
    ];
    let breakdown = expense_breakdown(&expenses);
    assert_eq!(breakdown.total, 1120.5);
    assert_eq!(breakdown.categories[1].name, "Salaries");
  }
}
