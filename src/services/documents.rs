//! Trainee documents. Files live under the upload directory; the database
//! row records where.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{Document, DocumentType, NewDocument, Store};
use crate::error::{AppError, AppResult};

const MAX_STORED_NAME_LEN: usize = 100;

#[derive(Debug, Clone)]
pub struct Upload {
    pub user_id: i64,
    pub doc_type: DocumentType,
    pub original_filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Reduce a client-supplied file name to a safe single path component.
pub fn sanitize_filename(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STORED_NAME_LEN)
        .collect();

    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn io_error(context: &str, path: &Path, err: std::io::Error) -> AppError {
    AppError::InternalServerError(format!("{} {}: {}", context, path.display(), err))
}

pub async fn upload(
    store: &dyn Store,
    upload_dir: &Path,
    max_bytes: usize,
    upload: Upload,
) -> AppResult<Document> {
    if upload.bytes.is_empty() {
        return Err(AppError::Validation("uploaded file is empty".into()));
    }
    if upload.bytes.len() > max_bytes {
        return Err(AppError::Validation(format!(
            "uploaded file exceeds the {} byte limit",
            max_bytes
        )));
    }
    let original_filename = upload.original_filename.trim().to_string();
    if original_filename.is_empty() {
        return Err(AppError::Validation("file name is required".into()));
    }

    let mut tx = store.begin().await?;
    if tx.user(upload.user_id).await?.is_none() {
        return Err(AppError::NotFound(format!("student {}", upload.user_id)));
    }

    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| io_error("cannot create upload directory", upload_dir, e))?;
    let path: PathBuf = upload_dir.join(format!(
        "{}-{}",
        Uuid::new_v4().simple(),
        sanitize_filename(&original_filename)
    ));
    tokio::fs::write(&path, &upload.bytes)
        .await
        .map_err(|e| io_error("cannot write", &path, e))?;

    let record = NewDocument {
        user_id: upload.user_id,
        doc_type: upload.doc_type,
        original_filename,
        storage_path: path.to_string_lossy().into_owned(),
        size_bytes: upload.bytes.len() as i64,
        mime_type: upload.mime_type,
    };
    let saved = async {
        let document = tx.insert_document(&record).await?;
        tx.commit().await?;
        Ok::<_, AppError>(document)
    }
    .await;

    match saved {
        Ok(document) => {
            info!(document_id = document.id, user_id = document.user_id, "Document uploaded");
            Ok(document)
        }
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %cleanup, "Failed to remove orphaned upload");
            }
            Err(e)
        }
    }
}

pub async fn list(store: &dyn Store, user_id: Option<i64>) -> AppResult<Vec<Document>> {
    let mut tx = store.begin().await?;
    Ok(tx.list_documents(user_id).await?)
}

/// Delete the row, then the file. A file that is already gone is only logged.
pub async fn delete(store: &dyn Store, id: i64) -> AppResult<Document> {
    let mut tx = store.begin().await?;
    let document = tx
        .document(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("document {}", id)))?;
    tx.delete_document(id).await?;
    tx.commit().await?;

    match tokio::fs::remove_file(&document.storage_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(document_id = id, path = %document.storage_path, "Document file was already missing");
        }
        Err(e) => {
            warn!(document_id = id, path = %document.storage_path, error = %e, "Failed to remove document file");
        }
    }

    info!(document_id = id, "Document deleted");
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_names_stay_inside_the_upload_dir() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\kimlik kartı.pdf"), "kimlik_kart_.pdf");
        assert_eq!(sanitize_filename("..."), "upload");
        assert_eq!(sanitize_filename(".env"), "env");
    }

    #[test]
    fn long_names_are_truncated() {
        let long = format!("{}.pdf", "a".repeat(300));
        assert_eq!(sanitize_filename(&long).len(), MAX_STORED_NAME_LEN);
    }
}
