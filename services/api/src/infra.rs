use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use xnscore::scoring::{
    InMemoryScorePublisher, InMemoryScoreStore, ScorePolicy, ScoreService,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type MemoryScoreService = ScoreService<InMemoryScoreStore, InMemoryScorePublisher>;

/// Wire the scoring core onto the in-memory store with the current policy.
pub(crate) fn build_score_service() -> Arc<MemoryScoreService> {
    let store = Arc::new(InMemoryScoreStore::default());
    let publisher = Arc::new(InMemoryScorePublisher::default());
    Arc::new(ScoreService::new(store, publisher, ScorePolicy::default()))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_month(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    match trimmed.split_once('-') {
        Some((year, month))
            if year.len() == 4
                && month.len() == 2
                && year.chars().all(|c| c.is_ascii_digit())
                && matches!(month.parse::<u8>(), Ok(1..=12)) =>
        {
            Ok(trimmed.to_string())
        }
        _ => Err(format!("failed to parse '{raw}' as YYYY-MM")),
    }
}

pub(crate) fn midday_utc(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).expect("valid midday time"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_month_accepts_calendar_months_only() {
        assert_eq!(parse_month(" 2026-08 ").as_deref(), Ok("2026-08"));
        assert!(parse_month("2026-13").is_err());
        assert!(parse_month("26-08").is_err());
        assert!(parse_month("august").is_err());
    }
}
