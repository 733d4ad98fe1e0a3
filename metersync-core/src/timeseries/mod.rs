//! Time-series logic for incremental hourly sync.
//!
//! Modules include:
//! - `window`: plan the next window to request from the watermark
//! - `normalize`: parse, filter, sort and dedup raw upstream records
//! - `watermark`: forward-only watermark advancement
//! - `accumulate`: fold readings into cumulative statistic points
//! - `util`: time-zone aware hour and midnight helpers
/// Statistic accumulation.
pub mod accumulate;
/// Record parsing and normalization.
pub mod normalize;
/// Hour truncation and local midnight helpers.
pub mod util;
/// Watermark advancement.
pub mod watermark;
/// Window planning.
pub mod window;
