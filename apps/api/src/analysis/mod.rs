//! Resume / job-description analysis: content-addressed caching in front of
//! the external LLM provider, with the requested sections filtered through
//! the tier feature gate.

pub mod cache;
pub mod engine;
pub mod fingerprint;
pub mod handlers;
pub mod prompts;
pub mod provider;
