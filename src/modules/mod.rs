pub mod admin;
pub mod booking;
pub mod catalog;
pub mod flash;
