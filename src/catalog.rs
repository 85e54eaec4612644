use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{Result, LineRunError};

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    pub id: String,
    pub title: String,
    pub title_en: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub seasons: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub show_id: String,
    pub season: u32,
    pub episode: u32,
    pub title: String,
    pub title_en: String,
    pub dialogues: Vec<Dialogue>,
}

/// One subtitle line: the Chinese prompt and its reference English translation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dialogue {
    pub id: String,
    pub order: u32,
    pub chinese: String,
    pub english: String,
    #[serde(default)]
    pub character: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    shows: Vec<Show>,
    episodes: Vec<Episode>,
}

impl Catalog {
    /// Catalog bundled with the binary
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading catalog from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    fn from_json(content: &str) -> Result<Self> {
        let mut catalog: Catalog = serde_json::from_str(content)?;
        for episode in &mut catalog.episodes {
            episode.dialogues.sort_by_key(|d| d.order);
        }
        Ok(catalog)
    }

    pub fn shows(&self) -> &[Show] {
        &self.shows
    }

    pub fn show(&self, id: &str) -> Option<&Show> {
        self.shows.iter().find(|s| s.id == id)
    }

    pub fn episodes_for<'a>(&'a self, show_id: &'a str) -> impl Iterator<Item = &'a Episode> + 'a {
        self.episodes.iter().filter(move |e| e.show_id == show_id)
    }

    pub fn episode(&self, id: &str) -> Result<&Episode> {
        self.episodes
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| LineRunError::NotFound(format!("episode '{}'", id)))
    }

    /// Dialogue line at `index` in playback order
    pub fn dialogue(&self, episode_id: &str, index: usize) -> Result<&Dialogue> {
        let episode = self.episode(episode_id)?;
        episode.dialogues.get(index).ok_or_else(|| {
            LineRunError::NotFound(format!(
                "dialogue {} in episode '{}' ({} lines)",
                index,
                episode_id,
                episode.dialogues.len()
            ))
        })
    }
}
