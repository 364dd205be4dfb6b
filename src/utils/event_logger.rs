use anyhow::Result;
use chrono::Utc;
use log::{debug, info};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;

use crate::strategy::exit_controller::{ExitOutcome, ExitTrigger};
use crate::strategy::position::TrackedPosition;

/// One JSON line per finished lifecycle
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleReport {
    pub recorded_at: String,
    pub base_mint: String,
    pub pool: String,
    /// Short label of how the lifecycle ended
    pub outcome: String,
    pub trigger: Option<ExitTrigger>,
    pub holding_seconds: i64,
    pub position: TrackedPosition,
}

impl LifecycleReport {
    pub fn new(position: &TrackedPosition, exit: Option<&ExitOutcome>) -> Self {
        let (outcome, trigger) = match exit {
            Some(ExitOutcome::Disposed { trigger, .. }) => ("disposed", Some(*trigger)),
            Some(ExitOutcome::NothingToDispose { trigger }) => ("nothing_to_dispose", Some(*trigger)),
            Some(ExitOutcome::Exhausted { trigger, .. }) => ("disposal_exhausted", Some(*trigger)),
            None => ("not_acquired", None),
        };

        Self {
            recorded_at: Utc::now().to_rfc3339(),
            base_mint: position.base_mint.to_string(),
            pool: position.pool.to_string(),
            outcome: outcome.to_string(),
            trigger,
            holding_seconds: position.get_holding_duration(),
            position: position.clone(),
        }
    }
}

/// Appends lifecycle reports to a JSONL file
pub struct EventLogger {
    log_file_path: String,
}

impl EventLogger {
    /// Defaults to a timestamped file in the working directory
    pub fn new(log_file_path: Option<String>) -> Self {
        let log_file_path = log_file_path.unwrap_or_else(|| {
            let now = Utc::now();
            format!("lifecycle_events_{}.jsonl", now.format("%Y%m%d_%H%M%S"))
        });

        info!("📝 Lifecycle reports go to {}", log_file_path);
        Self { log_file_path }
    }

    pub fn path(&self) -> &str {
        &self.log_file_path
    }

    pub async fn log_report(&self, report: &LifecycleReport) -> Result<()> {
        let json_line = serde_json::to_string(report)?;

        // file io stays off the runtime threads
        let log_file_path = self.log_file_path.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_file_path)?;

            writeln!(file, "{}", json_line)?;
            file.flush()?;
            Ok(())
        }).await??;

        debug!("📝 Report written for {}", report.position.base_mint);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey::Pubkey;

    #[tokio::test]
    async fn test_reports_are_appended_as_json_lines() {
        let path = std::env::temp_dir().join(format!("lifecycle_report_{}.jsonl", Pubkey::new_unique()));
        let logger = EventLogger::new(Some(path.to_string_lossy().into_owned()));

        let position = TrackedPosition::new(Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique(), Some(7));
        let exit = ExitOutcome::NothingToDispose { trigger: ExitTrigger::StopLoss };
        logger.log_report(&LifecycleReport::new(&position, Some(&exit))).await.unwrap();
        logger.log_report(&LifecycleReport::new(&position, None)).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["outcome"], "nothing_to_dispose");
        assert_eq!(lines[0]["trigger"], "stop_loss");
        assert_eq!(lines[1]["outcome"], "not_acquired");
        assert_eq!(lines[1]["base_mint"], position.base_mint.to_string());

        let _ = std::fs::remove_file(path);
    }
}
