pub mod advice;
pub mod analytics;
pub mod catalog;
pub mod chat;
pub mod events;
