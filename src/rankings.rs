//! Quiz leaderboard
//!
//! A separate JSON document, `{rankings: [...]}`, kept sorted by score
//! (highest first) and capped at [`MAX_RANKINGS`] entries. It has no links
//! to the graph.

use crate::graph::ErrorKind;
use crate::persistence::{FileStorage, JsonDocument, Storage, StorageError};
use chrono::{SecondsFormat, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Entries kept after every submission
pub const MAX_RANKINGS: usize = 100;

/// Ranking errors
#[derive(Error, Debug)]
pub enum RankingError {
    #[error("Invalid ranking: {0}")]
    Invalid(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl RankingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RankingError::Invalid(_) => ErrorKind::Invalid,
            RankingError::Storage(_) => ErrorKind::StorageFailure,
        }
    }
}

pub type RankingResult<T> = Result<T, RankingError>;

/// One finished game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    /// Older boards stored numeric ids
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub player_name: String,
    pub score: i64,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub wrong_answers: u32,
    #[serde(default)]
    pub total_questions: u32,
    /// Play time in seconds
    #[serde(default)]
    pub game_time: f64,
    /// RFC 3339 submission time
    #[serde(default)]
    pub date: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("invalid ranking id: {}", other))),
    }
}

/// Persisted shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingFile {
    #[serde(default)]
    pub rankings: Vec<RankingEntry>,
}

/// Payload of a score submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewRanking {
    pub player_name: Option<String>,
    pub score: Option<i64>,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub wrong_answers: u32,
    #[serde(default)]
    pub total_questions: u32,
    #[serde(default)]
    pub game_time: f64,
}

impl NewRanking {
    pub fn new(player_name: impl Into<String>, score: i64) -> Self {
        NewRanking {
            player_name: Some(player_name.into()),
            score: Some(score),
            ..Default::default()
        }
    }

    fn into_entry(self) -> RankingResult<RankingEntry> {
        let player_name = self
            .player_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| RankingError::Invalid("playerName is required".to_string()))?;
        let score = self
            .score
            .ok_or_else(|| RankingError::Invalid("score is required".to_string()))?;

        Ok(RankingEntry {
            id: Uuid::new_v4().to_string(),
            player_name,
            score,
            correct_answers: self.correct_answers,
            wrong_answers: self.wrong_answers,
            total_questions: self.total_questions,
            game_time: self.game_time,
            date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}

/// Result of a submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub entry: RankingEntry,
    /// 1-based position, `None` when the score did not make the board
    pub rank: Option<usize>,
}

/// Leaderboard store
pub struct RankingBoard {
    document: JsonDocument<RankingFile>,
    writer: Mutex<()>,
}

impl RankingBoard {
    pub fn open(path: impl AsRef<Path>) -> RankingResult<Self> {
        Ok(Self::with_storage(FileStorage::open(path)?))
    }

    pub fn with_storage(storage: impl Storage + 'static) -> Self {
        let document = JsonDocument::new(storage);
        info!("Ranking board ready at {}", document.describe());
        Self {
            document,
            writer: Mutex::new(()),
        }
    }

    /// Top entries, best first
    pub fn list(&self, limit: Option<usize>) -> RankingResult<Vec<RankingEntry>> {
        let _guard = self.lock()?;
        let mut rankings = self.document.load().rankings;
        sort_rankings(&mut rankings);
        rankings.truncate(limit.unwrap_or(MAX_RANKINGS).min(MAX_RANKINGS));
        Ok(rankings)
    }

    /// Record a score, re-sort and prune the lowest entries
    pub fn submit(&self, request: NewRanking) -> RankingResult<Submission> {
        let entry = request.into_entry()?;
        let _guard = self.lock()?;

        let mut file = self.document.load();
        file.rankings.push(entry.clone());
        sort_rankings(&mut file.rankings);
        file.rankings.truncate(MAX_RANKINGS);
        self.document.save(&file)?;

        let rank = file
            .rankings
            .iter()
            .position(|e| e.id == entry.id)
            .map(|index| index + 1);
        debug!("Ranked {} at {:?}", entry.player_name, rank);
        Ok(Submission { entry, rank })
    }

    fn lock(&self) -> RankingResult<std::sync::MutexGuard<'_, ()>> {
        self.writer
            .lock()
            .map_err(|_| StorageError::Unavailable("ranking lock poisoned".to_string()).into())
    }
}

/// Descending by score; ties keep submission order
fn sort_rankings(rankings: &mut [RankingEntry]) {
    rankings.sort_by(|a, b| b.score.cmp(&a.score));
}
