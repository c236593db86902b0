//! KYC Intake Library
//!
//! This library provides a multi-step KYC form: field validation, the step
//! schema, the form state machine, resumable persistence and submission to an
//! intake service. It also carries the reference intake service itself.
//!
//! # Modules
//!
//! - `models`: Fields, steps, option tables and the submitted record.
//! - `validation`: Per-field validation rules.
//! - `schema`: Step-to-field mapping and step/submission validity.
//! - `session`: Form state machine (current step, values, submission status).
//! - `slot_entry`: Checksummed envelope for saved slots.
//! - `circuit_breaker`: Autosave circuit breaker.
//! - `persistence`: Durable slot stores and the persistence bridge.
//! - `intake_client`: Multipart client for the intake service.
//! - `submission`: Single-flight submission coordinator.
//! - `form`: Form controller tying session, persistence and submission together.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: Intake service state, routes and health check.
//! - `intake_handler`: Intake endpoint receiving KYC records.

pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod form;
pub mod handlers;
pub mod intake_client;
pub mod intake_handler;
pub mod models;
pub mod persistence;
pub mod schema;
pub mod session;
pub mod slot_entry;
pub mod submission;
pub mod validation;
