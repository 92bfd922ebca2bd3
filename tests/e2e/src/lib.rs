//! End-to-end test support for knards
//!
//! - `harness`: isolated on-disk stores
//! - `mocks`: factories for cards, series and tagged scenarios

pub mod harness;

pub use harness::TestDatabaseManager;
pub use mocks::{BatchConfig, TestDataFactory, TestScenario};
