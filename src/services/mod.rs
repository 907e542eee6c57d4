pub mod backend;
pub mod calendar_service;
pub mod conflict;
pub mod dedup;
pub mod normalizer;
pub mod review_service;
pub mod schedule_utils;
pub mod week;
