//! Oracle card readings: a hardened generation proxy and the client-side
//! reading pipeline that sits in front of it.

pub mod card;
pub mod config;
pub mod error;
pub mod gateway;
pub mod policy;
pub mod provider;
pub mod rate_limit;
pub mod reading;
pub mod request;
pub mod routes;
pub mod state;
pub mod validate;
