use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::catalog::{Dialogue, Episode, Show};
use crate::error::{Result, LineRunError};
use crate::evaluate::EvaluationResult;

const RECORDS_FILE: &str = "practice_records.json";
const PROGRESS_FILE: &str = "user_progress.json";

/// One evaluated attempt, appended to the practice log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeRecord {
    pub id: String,
    pub show_id: String,
    pub show_title: String,
    pub episode_id: String,
    pub episode_title: String,
    pub dialogue_id: String,
    pub user_translation: String,
    pub score: u8,
    #[serde(default)]
    pub feedback: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PracticeRecord {
    pub fn new(
        show: &Show,
        episode: &Episode,
        dialogue: &Dialogue,
        user_translation: &str,
        result: &EvaluationResult,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            show_id: show.id.clone(),
            show_title: show.title.clone(),
            episode_id: episode.id.clone(),
            episode_title: episode.title.clone(),
            dialogue_id: dialogue.id.clone(),
            user_translation: user_translation.to_string(),
            score: result.score,
            feedback: result.feedback.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Last practiced position within a show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub show_id: String,
    pub episode_id: String,
    pub dialogue_index: usize,
    pub last_practice_time: DateTime<Utc>,
}

impl UserProgress {
    /// Line to practice next in `episode_id`: the one after the saved line, starting
    /// over once the episode has been finished.
    pub fn resume_index(progress: Option<&UserProgress>, episode_id: &str, line_count: usize) -> usize {
        match progress {
            Some(p) if p.episode_id == episode_id && p.dialogue_index + 1 < line_count => {
                p.dialogue_index + 1
            }
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_sentences: usize,
    pub average_score: f64,
    pub weekly_sentences: usize,
    pub weekly_average_score: f64,
    pub monthly_sentences: usize,
    pub monthly_average_score: f64,
}

impl UserStats {
    /// Totals over all records plus the last 7 and 30 days before `now`
    pub fn compute(records: &[PracticeRecord], now: DateTime<Utc>) -> Self {
        let week_start = now - Duration::days(7);
        let month_start = now - Duration::days(30);

        let (total_sentences, average_score) = summarize(records.iter());
        let (weekly_sentences, weekly_average_score) =
            summarize(records.iter().filter(|r| r.timestamp >= week_start));
        let (monthly_sentences, monthly_average_score) =
            summarize(records.iter().filter(|r| r.timestamp >= month_start));

        Self {
            total_sentences,
            average_score,
            weekly_sentences,
            weekly_average_score,
            monthly_sentences,
            monthly_average_score,
        }
    }
}

/// Count and one-decimal average score
fn summarize<'a>(records: impl Iterator<Item = &'a PracticeRecord>) -> (usize, f64) {
    let (count, sum) = records.fold((0usize, 0u64), |(count, sum), r| (count + 1, sum + r.score as u64));
    if count == 0 {
        return (0, 0.0);
    }
    let average = sum as f64 / count as f64;
    (count, (average * 10.0).round() / 10.0)
}

/// JSON-file store for practice records and progress
pub struct PracticeStore {
    data_dir: PathBuf,
}

impl PracticeStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub async fn save_record(&self, record: PracticeRecord) -> Result<()> {
        let mut records = self.records().await?;
        debug!("Saving practice record {} (score {})", record.id, record.score);
        records.push(record);
        self.write_json(RECORDS_FILE, &records).await
    }

    /// All records in insertion order
    pub async fn records(&self) -> Result<Vec<PracticeRecord>> {
        self.read_json(RECORDS_FILE).await
    }

    /// Insert or replace the progress entry for its show
    pub async fn save_progress(&self, progress: UserProgress) -> Result<()> {
        let mut all = self.all_progress().await?;
        match all.iter_mut().find(|p| p.show_id == progress.show_id) {
            Some(existing) => *existing = progress,
            None => all.push(progress),
        }
        self.write_json(PROGRESS_FILE, &all).await
    }

    pub async fn all_progress(&self) -> Result<Vec<UserProgress>> {
        self.read_json(PROGRESS_FILE).await
    }

    pub async fn show_progress(&self, show_id: &str) -> Result<Option<UserProgress>> {
        Ok(self
            .all_progress()
            .await?
            .into_iter()
            .find(|p| p.show_id == show_id))
    }

    pub async fn stats(&self, now: DateTime<Utc>) -> Result<UserStats> {
        let records = self.records().await?;
        Ok(UserStats::compute(&records, now))
    }

    async fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let path = self.data_dir.join(name);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(&path).await?;
        serde_json::from_str(&content).map_err(|e| {
            LineRunError::Storage(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    async fn write_json<T: Serialize>(&self, name: &str, items: &[T]) -> Result<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let path = self.data_dir.join(name);
        let content = serde_json::to_string_pretty(items)?;
        tokio::fs::write(&path, content).await?;
        info!("Saved {} entries to {}", items.len(), path.display());
        Ok(())
    }
}
