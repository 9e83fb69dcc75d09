//! memo-core - Core library for Memo
//!
//! This crate contains the shared models, document-store abstraction, live
//! snapshot feeds, and screen state machines used by all Memo front ends.

pub mod auth;
pub mod error;
pub mod filter;
pub mod live;
pub mod models;
pub mod screens;
pub mod store;
pub mod util;

pub use error::{Error, Result};
pub use models::{Memo, MemoId};
