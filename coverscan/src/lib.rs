//! Book-cover recognition service.
//!
//! An uploaded cover is sent to one of several vision providers (hosted or
//! local) and the reply is normalized into a title, an author and a
//! confidence score, ready to be saved in a personal library.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod recognition;
pub mod storage;
