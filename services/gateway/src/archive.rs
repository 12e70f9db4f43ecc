//! On-disk archive of normalized schedule responses

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::models::ScheduleEnvelope;

/// Writes `courses_<date>.json` files under a data directory
#[derive(Debug, Clone)]
pub struct ScheduleArchive {
    dir: PathBuf,
}

impl ScheduleArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File the schedule for `date_str` is written to
    pub fn path_for(&self, date_str: &str) -> PathBuf {
        self.dir.join(format!("courses_{}.json", date_str))
    }

    /// Persist a schedule, replacing any earlier copy for the same date
    pub async fn store(&self, date_str: &str, schedule: &ScheduleEnvelope) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(date_str);
        let pretty = serde_json::to_vec_pretty(schedule)?;
        tokio::fs::write(&path, pretty).await?;

        debug!("Archived schedule to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CourseRecord;

    #[tokio::test]
    async fn test_store_creates_directory_and_file() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let archive = ScheduleArchive::new(tmp.path().join("data"));

        let schedule = ScheduleEnvelope {
            status: "0".to_string(),
            total: "1".to_string(),
            result: vec![CourseRecord {
                course_name: "Compilers".to_string(),
                ..Default::default()
            }],
        };

        let path = archive.store("20240115", &schedule).await?;
        assert_eq!(path, tmp.path().join("data").join("courses_20240115.json"));

        let written: ScheduleEnvelope = serde_json::from_slice(&std::fs::read(&path)?)?;
        assert_eq!(written, schedule);
        Ok(())
    }

    #[tokio::test]
    async fn test_store_fails_when_directory_is_a_file() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let blocker = tmp.path().join("data");
        std::fs::write(&blocker, b"not a directory")?;

        let archive = ScheduleArchive::new(&blocker);
        assert!(archive.store("20240115", &ScheduleEnvelope::default()).await.is_err());
        Ok(())
    }
}
