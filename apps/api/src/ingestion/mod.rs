pub mod producer_client;
pub mod readiness;

pub use producer_client::ProducerClient;
pub use readiness::{ReadinessConfig, ReadinessState};
