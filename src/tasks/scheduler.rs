use super::{briefing::send_briefing_now, BriefingService};
use crate::config::ScheduleConfig;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use std::sync::Arc;
use tracing::{error, info};

/// First scheduled briefing strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>, schedule: &ScheduleConfig) -> DateTime<Utc> {
    let today = now.with_timezone(&schedule.timezone).date_naive();
    (0..=2)
        .filter_map(|offset| {
            let day = today + Duration::days(offset);
            resolve_local(schedule, day.and_time(schedule.time))
        })
        .find(|candidate| *candidate > now)
        .unwrap_or_else(|| now + Duration::days(1))
}

// A wall-clock time skipped by a DST change runs an hour later.
fn resolve_local(schedule: &ScheduleConfig, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    schedule
        .timezone
        .from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            schedule
                .timezone
                .from_local_datetime(&(local + Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
}

/// Send the briefing every day at the configured local time. Runs until the
/// process stops; a failed run is logged and the next one still happens.
pub async fn start(service: Arc<BriefingService>, schedule: ScheduleConfig) {
    loop {
        let now = Utc::now();
        let next = next_run_after(now, &schedule);
        info!(
            next_run = %next.with_timezone(&schedule.timezone).format("%Y-%m-%d %H:%M %Z"),
            "Next briefing scheduled"
        );
        tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;

        match send_briefing_now(&service).await {
            Ok(report) => info!("{}", report.summary()),
            Err(e) => error!(error = %e, "Daily briefing failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn schedule(time: &str, timezone: chrono_tz::Tz) -> ScheduleConfig {
        ScheduleConfig {
            time: NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
            timezone,
        }
    }

    #[test]
    fn test_later_today() {
        // 07:00 KST on the 19th
        let next = next_run_after(utc("2026-10-18T22:00:00Z"), &ScheduleConfig::default());
        assert_eq!(next, utc("2026-10-18T23:00:00Z"));
    }

    #[test]
    fn test_already_passed_rolls_to_tomorrow() {
        let sched = ScheduleConfig::default();
        assert_eq!(next_run_after(utc("2026-10-18T23:00:00Z"), &sched), utc("2026-10-19T23:00:00Z"));
        assert_eq!(next_run_after(utc("2026-10-19T03:00:00Z"), &sched), utc("2026-10-19T23:00:00Z"));
    }

    #[test]
    fn test_dst_gap() {
        // 02:30 does not exist in New York on 2026-03-08
        let sched = schedule("02:30", chrono_tz::America::New_York);
        let next = next_run_after(utc("2026-03-08T05:00:00Z"), &sched);
        assert_eq!(next, utc("2026-03-08T07:30:00Z"));
    }

    #[test]
    fn test_dst_overlap_uses_first_occurrence() {
        // 01:30 happens twice in New York on 2026-11-01
        let sched = schedule("01:30", chrono_tz::America::New_York);
        let next = next_run_after(utc("2026-11-01T04:00:00Z"), &sched);
        assert_eq!(next, utc("2026-11-01T05:30:00Z"));
    }
}
