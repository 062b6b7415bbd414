//! Warden: retention lifecycle engine for companion conversation transcripts.
//!
//! Records are classified on ingest, archived, anonymized or hard-deleted
//! on fixed per-category schedules, and subjects are warned ahead of
//! deletion. Erasure requests are honoured except where a safeguarding
//! legal hold applies.

pub mod config;
pub mod db;
pub mod models;
pub mod notifications;
pub mod observability;
pub mod retention;
