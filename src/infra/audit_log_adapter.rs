use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::app::ports::AuditOutputPort;
use crate::constants::DATE_FORMAT;
use crate::pipeline::audit::{AuditStage, AuditTrail};

/// Renders the audit trail as one plain-text file per stage under `<logs>/<date>/`
pub struct AuditLogAdapter {
    pub logs_dir: PathBuf,
    pub run_date: NaiveDate,
    pub run_id: String,
}

impl AuditLogAdapter {
    pub fn new(logs_dir: impl Into<PathBuf>, run_date: NaiveDate, run_id: impl Into<String>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            run_date,
            run_id: run_id.into(),
        }
    }

    pub fn run_dir(&self) -> PathBuf {
        self.logs_dir.join(self.run_date.format(DATE_FORMAT).to_string())
    }

    fn render_stage(&self, trail: &AuditTrail, stage: AuditStage) -> String {
        let mut text = format!("# {:?} decisions, run {} ({})\n", stage, self.run_id, self.run_date);
        for decision in trail.for_stage(stage) {
            text.push_str(&decision.to_string());
            text.push('\n');
        }
        text
    }
}

#[async_trait]
impl AuditOutputPort for AuditLogAdapter {
    async fn write_audit(&self, trail: &AuditTrail) -> Result<(), String> {
        let dir = self.run_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| format!("Failed to create audit directory {:?}: {}", dir, e))?;

        for stage in AuditStage::ALL {
            let path = dir.join(stage.file_name());
            let mut file = tokio::fs::File::create(&path)
                .await
                .map_err(|e| format!("Failed to create {:?}: {}", path, e))?;
            file.write_all(self.render_stage(trail, stage).as_bytes())
                .await
                .map_err(|e| format!("Failed to write {:?}: {}", path, e))?;
            file.flush().await.map_err(|e| e.to_string())?;
            debug!("Wrote {} {:?} decisions to {:?}", trail.for_stage(stage).count(), stage, path);
        }
        Ok(())
    }
}
