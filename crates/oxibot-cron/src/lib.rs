//! Scheduled task service for Oxibot — job types and the async timer loop.

pub mod service;
pub mod types;

pub use service::{CronService, OnJobFn};
pub use types::{CronJob, CronPayload, CronSchedule, CronStore, JobStatus, ScheduleKind};
