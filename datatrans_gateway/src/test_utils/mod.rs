//! Helpers shared by the unit tests and the integration tests. Only compiled with the `test_utils` feature.
mod memory_store;
mod prepare_env;

pub use memory_store::{MemoryStore, MemoryStoreError};
pub use prepare_env::{prepare_test_env, test_config, TEST_MPO_MERCHANT_ID, TEST_WEB_MERCHANT_ID};
