//! LineRun - Subtitle Line Translation Practice
//!
//! Presents bilingual subtitle lines from TV shows, asks the learner to translate
//! them and scores the attempt through a remote language model, falling back to a
//! local lexical-overlap heuristic when the remote service is unavailable.

pub mod cli;
pub mod config;
pub mod catalog;
pub mod evaluate;
pub mod storage;
pub mod error;
