use log::*;

use crate::config::{DatatransConfig, MerchantCredentials};

pub const TEST_WEB_MERCHANT_ID: &str = "1111111111";
pub const TEST_MPO_MERCHANT_ID: &str = "2222222222";

pub fn prepare_test_env() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
}

/// A sandbox configuration with fixed keys, so that signatures in tests are predictable.
pub fn test_config() -> DatatransConfig {
    let web = MerchantCredentials::new(TEST_WEB_MERCHANT_ID, vec![0xAA; 64]);
    let mpo = MerchantCredentials::new(TEST_MPO_MERCHANT_ID, vec![0xBB; 64]);
    DatatransConfig::new(web, mpo)
}
