//! Subscription Payments - Payment verification and webhook reconciliation.
//!
//! Accounts buy a one-year subscription through one of several Indian
//! payment providers. This crate creates provider orders, verifies payments
//! when the client returns, reconciles asynchronous provider webhooks and
//! keeps each account's subscription state consistent under retries.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
