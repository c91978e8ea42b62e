use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "document_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Identity,
    Certificate,
    Invoice,
    #[default]
    Other,
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "identity" | "id" => Ok(DocumentType::Identity),
            "certificate" => Ok(DocumentType::Certificate),
            "invoice" => Ok(DocumentType::Invoice),
            "other" | "" => Ok(DocumentType::Other),
            _ => Err(format!("Unknown document type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub user_id: i64,
    pub doc_type: DocumentType,
    pub original_filename: String,
    #[serde(skip_serializing)]
    pub storage_path: String,
    pub size_bytes: i64,
    pub mime_type: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub user_id: i64,
    pub doc_type: DocumentType,
    pub original_filename: String,
    pub storage_path: String,
    pub size_bytes: i64,
    pub mime_type: Option<String>,
}
