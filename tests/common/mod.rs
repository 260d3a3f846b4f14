//! Shared test doubles and fixtures for the integration tests.

#![allow(dead_code)]

pub mod fake_confluence;
pub mod fake_vision;
pub mod fixtures;
