pub mod local;
pub mod partition_api;

pub use local::LocalBackend;
pub use partition_api::PartitionApiBackend;

use crate::models::BackendConfig;
use crate::traits::ExtractionBackend;
use std::sync::Arc;

/// The partition service when one is configured, local extraction otherwise.
pub fn backend_from_config(config: &BackendConfig) -> Arc<dyn ExtractionBackend> {
    match &config.partition_url {
        Some(url) => Arc::new(PartitionApiBackend::new(
            url.clone(),
            config.partition_api_key.clone(),
        )),
        None => Arc::new(LocalBackend),
    }
}
