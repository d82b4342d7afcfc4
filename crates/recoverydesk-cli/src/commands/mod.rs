pub mod alerts;
pub mod clients;
pub mod config;
pub mod sobriety;

use chrono::{DateTime, NaiveDate, Utc};
use recoverydesk_core::{AlertPriority, AlertStatus, AlertType, CheckInStatus, Event};

/// Accepts RFC 3339 (`2026-05-04T09:00:00Z`) or a bare date (`2026-05-04`,
/// read as midnight UTC).
pub fn parse_when(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid date '{s}': expected YYYY-MM-DD or RFC 3339"))
}

pub fn parse_priority(s: &str) -> Result<AlertPriority, String> {
    AlertPriority::parse(&s.to_lowercase())
        .ok_or_else(|| format!("invalid priority '{s}': expected low, medium, high or urgent"))
}

pub fn parse_alert_type(s: &str) -> Result<AlertType, String> {
    AlertType::parse(&s.to_lowercase()).ok_or_else(|| format!("invalid alert type '{s}'"))
}

pub fn parse_status(s: &str) -> Result<AlertStatus, String> {
    AlertStatus::parse(&s.to_lowercase())
        .ok_or_else(|| format!("invalid status '{s}': expected active, snoozed or resolved"))
}

pub fn parse_check_in_status(s: &str) -> Result<CheckInStatus, String> {
    CheckInStatus::parse(&s.to_lowercase())
        .ok_or_else(|| format!("invalid check-in status '{s}': expected sober or relapse"))
}

/// Print notifications on stderr; stdout carries the JSON result.
pub fn print_events(events: &[Event]) {
    for event in events {
        let n = event.notification();
        eprintln!(
            "{} [{}] {}",
            event.at().format("%Y-%m-%d %H:%M:%S"),
            n.title,
            n.description
        );
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_when_accepts_date_and_rfc3339() {
        let midnight = Utc.with_ymd_and_hms(2026, 5, 4, 0, 0, 0).unwrap();
        assert_eq!(parse_when("2026-05-04").unwrap(), midnight);
        assert_eq!(
            parse_when("2026-05-04T11:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap()
        );
        assert!(parse_when("May 4").is_err());
    }

    #[test]
    fn enum_parsers_ignore_case() {
        assert_eq!(parse_priority("URGENT").unwrap(), AlertPriority::Urgent);
        assert!(parse_alert_type("party").is_err());
        assert_eq!(parse_check_in_status("Relapse").unwrap(), CheckInStatus::Relapse);
    }
}
