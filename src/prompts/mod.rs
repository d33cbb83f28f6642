//! Prompt module for LLM-based operations.
//!
//! This module provides the prompt templates used to summarize papers.

pub mod summary;

pub use summary::*;
