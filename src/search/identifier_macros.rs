use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use serde_json::Value;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3fZ";

/// Value of a date/time identifier macro at `now` (UTC).
///
/// Datetime macros are formatted with [`DATETIME_FORMAT`]; the component
/// macros are integers, with `@weekday` counting from Sunday = 0.
pub fn macro_value(name: &str, now: DateTime<Utc>) -> Option<Value> {
    let today = now.date_naive();
    let value = match name {
        "@now" => format_datetime(now),
        "@second" => Value::from(now.second()),
        "@minute" => Value::from(now.minute()),
        "@hour" => Value::from(now.hour()),
        "@day" => Value::from(now.day()),
        "@month" => Value::from(now.month()),
        "@weekday" => Value::from(now.weekday().num_days_from_sunday()),
        "@year" => Value::from(now.year()),
        "@todayStart" => format_datetime(start_of(today)),
        "@todayEnd" => format_datetime(end_of(today)),
        "@monthStart" => format_datetime(start_of(month_start(today)?)),
        "@monthEnd" => format_datetime(end_of(next_month_start(today)? - Duration::days(1))),
        "@yearStart" => format_datetime(start_of(NaiveDate::from_ymd_opt(today.year(), 1, 1)?)),
        "@yearEnd" => format_datetime(end_of(NaiveDate::from_ymd_opt(today.year(), 12, 31)?)),
        _ => return None,
    };
    Some(value)
}

fn format_datetime(dt: DateTime<Utc>) -> Value {
    Value::String(dt.format(DATETIME_FORMAT).to_string())
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn end_of(date: NaiveDate) -> DateTime<Utc> {
    start_of(date) + Duration::days(1) - Duration::milliseconds(1)
}

fn month_start(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
}

fn next_month_start(date: NaiveDate) -> Option<NaiveDate> {
    match date.month() {
        12 => NaiveDate::from_ymd_opt(date.year() + 1, 1, 1),
        m => NaiveDate::from_ymd_opt(date.year(), m + 1, 1),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn at() -> DateTime<Utc> {
        // a Thursday
        Utc.with_ymd_and_hms(2024, 2, 15, 13, 45, 30).unwrap()
    }

    #[test]
    fn component_macros() {
        assert_eq!(macro_value("@second", at()), Some(json!(30)));
        assert_eq!(macro_value("@minute", at()), Some(json!(45)));
        assert_eq!(macro_value("@hour", at()), Some(json!(13)));
        assert_eq!(macro_value("@day", at()), Some(json!(15)));
        assert_eq!(macro_value("@month", at()), Some(json!(2)));
        assert_eq!(macro_value("@weekday", at()), Some(json!(4)));
        assert_eq!(macro_value("@year", at()), Some(json!(2024)));
    }

    #[test]
    fn datetime_macros() {
        assert_eq!(macro_value("@now", at()), Some(json!("2024-02-15 13:45:30.000Z")));
        assert_eq!(macro_value("@todayStart", at()), Some(json!("2024-02-15 00:00:00.000Z")));
        assert_eq!(macro_value("@todayEnd", at()), Some(json!("2024-02-15 23:59:59.999Z")));
        assert_eq!(macro_value("@monthStart", at()), Some(json!("2024-02-01 00:00:00.000Z")));
        assert_eq!(macro_value("@monthEnd", at()), Some(json!("2024-02-29 23:59:59.999Z")));
        assert_eq!(macro_value("@yearStart", at()), Some(json!("2024-01-01 00:00:00.000Z")));
        assert_eq!(macro_value("@yearEnd", at()), Some(json!("2024-12-31 23:59:59.999Z")));
    }

    #[test]
    fn december_month_end_rolls_over() {
        let dec = Utc.with_ymd_and_hms(2023, 12, 5, 8, 0, 0).unwrap();
        assert_eq!(macro_value("@monthEnd", dec), Some(json!("2023-12-31 23:59:59.999Z")));
    }

    #[test]
    fn unknown_macro() {
        assert_eq!(macro_value("@tomorrow", at()), None);
    }
}
