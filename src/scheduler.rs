//! Daily scheduling for the `schedule` command.

use chrono::{DateTime, Duration, NaiveTime, TimeZone};
use std::fmt::Display;
use std::future::Future;

/// Next strictly-future occurrence of `hour:minute` in `now`'s time zone.
///
/// Today's slot is used if it is still ahead, otherwise tomorrow's. A slot
/// that falls in a DST gap runs an hour later; an ambiguous slot runs at its
/// first occurrence.
pub fn next_run_after<Tz: TimeZone>(now: DateTime<Tz>, hour: u32, minute: u32) -> DateTime<Tz> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
    let tz = now.timezone();
    let mut date = now.date_naive();

    for _ in 0..3 {
        let naive = date.and_time(time);
        let candidate = tz
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest());
        if let Some(candidate) = candidate {
            if candidate > now {
                return candidate;
            }
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    now + Duration::days(1)
}

/// Runs `job` every day at `hour:minute` local time until Ctrl-C.
///
/// A failing run is logged and the schedule continues.
pub async fn run_daily<F, Fut, E>(hour: u32, minute: u32, job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C, stopping scheduler");
        }
    };
    run_daily_until(hour, minute, job, shutdown).await;
}

async fn run_daily_until<F, Fut, E, S>(hour: u32, minute: u32, mut job: F, shutdown: S)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let now = chrono::Local::now();
        let next = next_run_after(now, hour, minute);
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!(
            next_run = %next.format("%Y-%m-%d %H:%M"),
            wait_secs = wait.as_secs(),
            "Next digest scheduled"
        );

        tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!("Scheduler stopped");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        match job().await {
            Ok(()) => tracing::info!("Scheduled digest run completed"),
            Err(e) => tracing::error!(error = %e, "Scheduled digest run failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Local, Timelike, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_later_today() {
        let now = utc(2024, 3, 10, 6, 30, 0);
        assert_eq!(next_run_after(now, 8, 0), utc(2024, 3, 10, 8, 0, 0));
    }

    #[test]
    fn test_already_passed_rolls_to_tomorrow() {
        let now = utc(2024, 3, 10, 9, 15, 0);
        assert_eq!(next_run_after(now, 8, 0), utc(2024, 3, 11, 8, 0, 0));
    }

    #[test]
    fn test_exact_time_is_not_in_the_future() {
        let now = utc(2024, 3, 10, 8, 0, 0);
        assert_eq!(next_run_after(now, 8, 0), utc(2024, 3, 11, 8, 0, 0));
    }

    #[test]
    fn test_one_second_before() {
        let now = utc(2024, 3, 10, 7, 59, 59);
        assert_eq!(next_run_after(now, 8, 0), utc(2024, 3, 10, 8, 0, 0));
    }

    #[test]
    fn test_year_rollover() {
        let now = utc(2023, 12, 31, 23, 0, 0);
        assert_eq!(next_run_after(now, 8, 30), utc(2024, 1, 1, 8, 30, 0));
    }

    #[test]
    fn test_fixed_offset_uses_local_wall_clock() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap();
        let next = next_run_after(now, 8, 0);
        assert_eq!(next, tz.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap());
        assert_eq!(next.with_timezone(&Utc).hour(), 6);
    }

    #[test]
    fn test_local_result_within_a_day() {
        let now = Local::now();
        let next = next_run_after(now, 8, 0);
        assert!(next > now);
        assert!(next - now <= Duration::hours(25));
        assert_eq!(next.minute(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_run_does_not_stop_schedule() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mut tx = Some(tx);
        let calls = Arc::new(AtomicUsize::new(0));
        let job_calls = calls.clone();

        run_daily_until(
            8,
            0,
            move || {
                let n = job_calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 2 {
                    if let Some(tx) = tx.take() {
                        let _ = tx.send(());
                    }
                }
                async move {
                    if n == 1 {
                        Err("smtp unavailable")
                    } else {
                        Ok(())
                    }
                }
            },
            async {
                let _ = rx.await;
            },
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
