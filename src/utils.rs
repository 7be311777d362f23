use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use eyre::{Context, OptionExt};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Start of a `history --since` window: a duration ago (`90m`, `1h 30m`),
/// an RFC 3339 timestamp, or a UTC date with an optional time of day.
pub fn parse_since(input: &str) -> eyre::Result<DateTime<Utc>> {
    since_at(input, Utc::now())
}

fn since_at(input: &str, now: DateTime<Utc>) -> eyre::Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(ago) = humantime::parse_duration(input) {
        let ago = chrono::Duration::from_std(ago)
            .wrap_err_with(|| format!("{} is too far back", input))?;
        return now
            .checked_sub_signed(ago)
            .ok_or_eyre("Duration reaches before the representable range");
    }

    if let Ok(time) = DateTime::parse_from_rfc3339(input) {
        return Ok(time.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| eyre::eyre!("Can't read {:?} as a duration, date or timestamp", input))?;

    Ok(naive.and_utc())
}

pub fn format_timestamp(time: DateTime<Utc>, to_local_time: bool) -> String {
    if to_local_time {
        return time
            .with_timezone(&Local)
            .to_rfc3339_opts(SecondsFormat::Secs, true);
    }

    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    #[test]
    fn durations_count_back_from_now() {
        let now = at(10_000_000);

        assert_eq!(since_at("1h", now).unwrap(), at(10_000_000 - 3_600_000));
        assert_eq!(since_at("1m 30s", now).unwrap(), at(10_000_000 - 90_000));
    }

    #[test]
    fn absolute_times_ignore_now() {
        let now = at(10_000_000);

        assert_eq!(since_at("1970-01-01T00:00:01Z", now).unwrap(), at(1_000));
        assert_eq!(since_at("1970-01-01T02:00:01+02:00", now).unwrap(), at(1_000));
        assert_eq!(since_at("1970-01-01 00:00:01", now).unwrap(), at(1_000));
        assert_eq!(since_at("1970-01-02", now).unwrap(), at(86_400_000));
    }

    #[test]
    fn unreadable_input_is_rejected() {
        let err = since_at("yesterday-ish", Utc::now()).unwrap_err();
        assert!(err.to_string().contains("yesterday-ish"));
    }

    #[test]
    fn formats_utc_timestamps() {
        assert_eq!(format_timestamp(at(1_000), false), "1970-01-01T00:00:01Z");
    }
}
