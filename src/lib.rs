//! Attendance streaks, statistics and presence matrices over a raw check-in feed.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod filter;
pub mod history;
pub mod matrix;
pub mod models;
pub mod normalize;
pub mod prefs;
pub mod report;
pub mod stats;
pub mod student;
