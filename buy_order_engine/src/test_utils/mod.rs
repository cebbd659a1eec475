//! Helpers for tests of the engine and of crates built on it. Enabled with the `test_utils` feature.
pub mod mock_processor;
pub mod prepare_env;
