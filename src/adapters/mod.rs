//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum routers, extractors and error responses
//! - `memory` - In-memory repositories for tests and local development
//! - `payments` - Cashfree, PhonePe and RupeePayments gateways
//! - `postgres` - PostgreSQL repositories

pub mod http;
pub mod memory;
pub mod payments;
pub mod postgres;
