//! # Studyloop - THE BINARY (library surface)
//!
//! Application modules behind the `studyloop` binary: configuration,
//! collaborator clients, the run driver, the daily scheduler, and the CLI.
//! The deterministic engine itself lives in `studyloop-core`.

pub mod cli;
pub mod config;
pub mod deliver;
pub mod fetcher;
pub mod generate;
pub mod http;
pub mod reader;
pub mod review;
pub mod run;
pub mod schedule;
pub mod vision;
