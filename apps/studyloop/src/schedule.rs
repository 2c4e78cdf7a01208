//! # Daily Scheduler
//!
//! The `serve` mode: sleep until the configured local time, execute one run
//! on a blocking task, log the outcome, repeat. A failed run leaves progress
//! untouched and the loop keeps going - the next firing retries from the
//! same cursors. Ctrl-C exits cleanly.

use crate::config::Settings;
use crate::run;
use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone};
use std::time::Duration;
use studyloop_core::StudyloopError;

/// Run the daily loop until interrupted.
pub async fn serve(settings: Settings) -> Result<(), StudyloopError> {
    loop {
        let next = next_occurrence(Local::now(), settings.schedule.hour, settings.schedule.minute);
        let wait = (next - Local::now())
            .to_std()
            .unwrap_or(Duration::from_secs(0));
        tracing::info!(next = %next.to_rfc3339(), "waiting for next scheduled run");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            result = tokio::signal::ctrl_c() => {
                result.map_err(|e| StudyloopError::Io(format!("signal handler failed: {e}")))?;
                tracing::info!("interrupted, shutting down");
                return Ok(());
            }
        }

        let run_settings = settings.clone();
        match tokio::task::spawn_blocking(move || run::run_once(&run_settings)).await {
            Ok(Ok(report)) => {
                tracing::info!(
                    lesson = %report.lesson_path.display(),
                    units = report.units_used,
                    links = report.links_used,
                    "scheduled run completed"
                );
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "scheduled run failed; progress untouched");
            }
            Err(e) => {
                tracing::error!(error = %e, "scheduled run panicked");
            }
        }
    }
}

/// The next strictly-future occurrence of `HH:MM` local time.
///
/// Ambiguous or skipped local times (DST transitions) fall forward to the
/// next representable instant.
pub fn next_occurrence(now: DateTime<Local>, hour: u32, minute: u32) -> DateTime<Local> {
    let mut date = now.date_naive();
    for _ in 0..3 {
        if let Some(naive) = date.and_hms_opt(hour, minute, 0) {
            if let Some(candidate) = Local.from_local_datetime(&naive).earliest() {
                if candidate > now {
                    return candidate;
                }
            }
        }
        date = date.succ_opt().unwrap_or(date);
    }
    // Unreachable for validated hour/minute; still return something sane.
    now + ChronoDuration::days(1)
}

// =============================================================================
// TESTS
// =============================================================================
