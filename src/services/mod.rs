//! Business operations. Each one runs in its own store transaction and
//! reports failures as [`crate::error::AppError`].

pub mod booking;
pub mod catalog;
pub mod documents;
pub mod schedule;
pub mod students;
pub mod wizard;
