//! Core types and trait definitions for the Bayesball data sync.
//!
//! No HTTP or database code lives here. The record store, the sports-data
//! source and the raw payload sink are traits; backends live in their own
//! crates and the jobs in `bayesball-sync` are generic over them.

// Trait methods spell out `+ Send` futures where callers need them.
#![allow(async_fn_in_trait)]

pub mod blob;
pub mod error;
pub mod fixture;
pub mod league;
pub mod season;
pub mod source;
pub mod store;

pub use error::{Classify, Error, ErrorKind, Result};
