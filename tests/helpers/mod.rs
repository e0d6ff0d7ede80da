//! Test helpers module
//!
//! This module provides utilities and helpers for testing ClubHub.
//! It includes the in-memory test context, fixture builders and the
//! optional Postgres database helper.

#![allow(dead_code)]

pub mod database_helper;
pub mod test_context;
pub mod test_data;

pub use database_helper::*;
pub use test_context::*;
pub use test_data::*;
