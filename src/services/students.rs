use serde::Serialize;

use crate::db::{BookingDetails, Document, Store, StudentSummary, User, UserRole};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct StudentDetail {
    pub student: User,
    pub bookings: Vec<BookingDetails>,
    pub documents: Vec<Document>,
}

pub async fn list_students(store: &dyn Store) -> AppResult<Vec<StudentSummary>> {
    let mut tx = store.begin().await?;
    Ok(tx.list_students().await?)
}

pub async fn student_detail(store: &dyn Store, id: i64) -> AppResult<StudentDetail> {
    let mut tx = store.begin().await?;
    let student = tx
        .user(id)
        .await?
        .filter(|u| u.role == UserRole::Trainee)
        .ok_or_else(|| AppError::NotFound(format!("student {}", id)))?;
    let bookings = tx.bookings_for_user(id).await?;
    let documents = tx.list_documents(Some(id)).await?;

    Ok(StudentDetail {
        student,
        bookings,
        documents,
    })
}
