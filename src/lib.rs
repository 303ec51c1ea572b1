//! Settlement core of a content marketplace.
//!
//! Turns payment signals (gateway webhooks, client status polls, internal
//! wallet debits) into durable, exactly-once order state: completion,
//! author commission credit, product income accounting and single-use
//! download token issuance.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
