//! Payments and the subscription lifecycle.
//!
//! State machine: `pending -> active -> (expired | cancelled)`, plus
//! `pending -> failed`. Activation happens only on a verified successful
//! gateway callback; failed payments are never retried automatically — a
//! retry is a user-initiated new transaction.

pub mod gateway;
pub mod handlers;
pub mod lifecycle;
