use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    response::Json,
};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::db::{Document, DocumentType};
use crate::error::{AppError, AppResult};
use crate::i18n::I18n;
use crate::modules::flash::Flash;
use crate::services::documents::{self, Upload};

#[derive(Debug, Default, Deserialize)]
pub struct DocumentQuery {
    pub user_id: Option<i64>,
}

pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<DocumentQuery>,
) -> AppResult<Json<Vec<Document>>> {
    Ok(Json(documents::list(state.store(), query.user_id).await?))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(err.body_text())
}

/// Collect the `user_id`, `doc_type` and `file` fields of an upload form.
async fn read_upload(mut multipart: Multipart) -> AppResult<Upload> {
    let mut user_id = None;
    let mut doc_type = DocumentType::default();
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "user_id" => {
                let raw = field.text().await.map_err(multipart_error)?;
                user_id = Some(raw.trim().parse::<i64>().map_err(|_| {
                    AppError::Validation(format!("user_id has an invalid value: {}", raw))
                })?);
            }
            "doc_type" => {
                let raw = field.text().await.map_err(multipart_error)?;
                doc_type = raw.parse().map_err(AppError::Validation)?;
            }
            "file" => {
                let original_filename = field.file_name().unwrap_or_default().to_string();
                let mime_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((original_filename, mime_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let user_id = user_id.ok_or_else(|| AppError::Validation("user_id is required".into()))?;
    let (original_filename, mime_type, bytes) =
        file.ok_or_else(|| AppError::Validation("file is required".into()))?;

    Ok(Upload {
        user_id,
        doc_type,
        original_filename,
        mime_type,
        bytes,
    })
}

pub async fn upload_document(
    State(state): State<AppState>,
    i18n: I18n,
    multipart: Result<Multipart, MultipartRejection>,
) -> Flash {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            let e = AppError::BadRequest(rejection.body_text());
            return Flash::failure("/admin/documents", &e, &i18n);
        }
    };
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(e) => return Flash::failure("/admin/documents", &e, &i18n),
    };
    let location = format!("/admin/students/{}", upload.user_id);

    match documents::upload(
        state.store(),
        &state.env.app.upload_dir,
        state.env.app.upload_max_bytes,
        upload,
    )
    .await
    {
        Ok(_) => Flash::success(location, i18n.get("document-uploaded")),
        Err(e) => Flash::failure(location, &e, &i18n),
    }
}

pub async fn delete_document(
    State(state): State<AppState>,
    i18n: I18n,
    Path(id): Path<i64>,
) -> Flash {
    match documents::delete(state.store(), id).await {
        Ok(document) => Flash::success(
            format!("/admin/students/{}", document.user_id),
            i18n.get("document-deleted"),
        ),
        Err(e) => Flash::failure("/admin/documents", &e, &i18n),
    }
}
