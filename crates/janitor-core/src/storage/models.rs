use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Analysis lifecycle of a stored file: `pending → processing → completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
        }
    }
}

impl FromStr for AnalysisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AnalysisStatus::Pending),
            "processing" => Ok(AnalysisStatus::Processing),
            "completed" => Ok(AnalysisStatus::Completed),
            other => Err(format!("unknown analysis status '{}'", other)),
        }
    }
}

/// Category of a cleanup recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Duplicate,
    LargeFile,
    OldFile,
}

impl RecommendationKind {
    pub const ALL: [RecommendationKind; 3] = [
        RecommendationKind::Duplicate,
        RecommendationKind::LargeFile,
        RecommendationKind::OldFile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationKind::Duplicate => "duplicate",
            RecommendationKind::LargeFile => "large_file",
            RecommendationKind::OldFile => "old_file",
        }
    }
}

impl FromStr for RecommendationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "duplicate" => Ok(RecommendationKind::Duplicate),
            "large_file" => Ok(RecommendationKind::LargeFile),
            "old_file" => Ok(RecommendationKind::OldFile),
            other => Err(format!("unknown recommendation kind '{}'", other)),
        }
    }
}

impl fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

sql_text_enum!(AnalysisStatus);
sql_text_enum!(RecommendationKind);

/// A remote file as stored locally, unique per `(owner_id, remote_id)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub id: i64,
    pub owner_id: String,
    pub remote_id: String,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: Option<i64>,
    pub modified_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub parent_folders: Vec<String>,
    pub is_shared: bool,
    pub analysis_status: AnalysisStatus,
    pub status_changed_at: DateTime<Utc>,
    pub synced_at: DateTime<Utc>,
}

/// Normalized ingestion row. Always written with `AnalysisStatus::Pending`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFileRecord {
    pub owner_id: String,
    pub remote_id: String,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: Option<i64>,
    pub modified_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub parent_folders: Vec<String>,
    pub is_shared: bool,
}

/// A persisted cleanup recommendation for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub id: i64,
    pub owner_id: String,
    pub file_id: i64,
    pub kind: RecommendationKind,
    pub confidence: f64,
    pub estimated_savings_bytes: i64,
    pub rationale: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecommendation {
    pub owner_id: String,
    pub file_id: i64,
    pub kind: RecommendationKind,
    pub confidence: f64,
    pub estimated_savings_bytes: i64,
    pub rationale: String,
}

/// Bytes per media family, keyed off the mime type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeBreakdown {
    pub videos: i64,
    pub images: i64,
    pub documents: i64,
    pub audio: i64,
    pub other: i64,
}

impl TypeBreakdown {
    pub fn add(&mut self, mime_type: &str, size_bytes: i64) {
        if mime_type.starts_with("video/") {
            self.videos += size_bytes;
        } else if mime_type.starts_with("image/") {
            self.images += size_bytes;
        } else if mime_type.contains("document")
            || mime_type.contains("text")
            || mime_type.contains("pdf")
        {
            self.documents += size_bytes;
        } else if mime_type.starts_with("audio/") {
            self.audio += size_bytes;
        } else {
            self.other += size_bytes;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub total_files: i64,
    pub total_size_bytes: i64,
    pub duplicate_count: i64,
    pub potential_savings_bytes: i64,
    pub recommendation_count: i64,
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub breakdown: TypeBreakdown,
}
