//! Core library for mnnbench: task configuration, case-matrix expansion,
//! external tool execution, output parsing and SQLite persistence.

pub mod cases;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod model;
pub mod parse;
pub mod report;
pub mod storage;
pub mod sweep;
