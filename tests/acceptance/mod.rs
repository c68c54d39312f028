//! End-to-end scenarios over the fixture timing descriptions.

mod common;
mod export_test;
mod scenario_test;
