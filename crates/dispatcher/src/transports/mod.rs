//! Transport implementations
//!
//! Contains LogTransport, FileTransport and the ScriptedTransport test double.

mod file;
mod log;
mod mock;

pub use self::file::{FileTransport, FileTransportConfig};
pub use self::log::LogTransport;
pub use self::mock::{ScriptedReply, ScriptedTransport};

use contracts::{
    ContractError, DeliveryReceipt, OutboundMessage, Transport, TransportConfig, TransportType,
};
use tracing::instrument;

/// Transport selected by configuration
pub enum ConfiguredTransport {
    Log(LogTransport),
    File(FileTransport),
}

impl Transport for ConfiguredTransport {
    fn name(&self) -> &str {
        match self {
            Self::Log(t) => t.name(),
            Self::File(t) => t.name(),
        }
    }

    async fn send(&mut self, message: &OutboundMessage) -> Result<DeliveryReceipt, ContractError> {
        match self {
            Self::Log(t) => t.send(message).await,
            Self::File(t) => t.send(message).await,
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        match self {
            Self::Log(t) => t.close().await,
            Self::File(t) => t.close().await,
        }
    }
}

/// Create the transport described by `config`
#[instrument(
    name = "dispatcher_create_transport",
    skip(config),
    fields(transport_type = ?config.transport_type)
)]
pub fn create_transport(config: &TransportConfig) -> Result<ConfiguredTransport, ContractError> {
    match config.transport_type {
        TransportType::Log => Ok(ConfiguredTransport::Log(LogTransport::new("log"))),
        TransportType::File => Ok(ConfiguredTransport::File(FileTransport::from_params(
            "file",
            &config.params,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_create_log_transport() {
        let config = TransportConfig {
            transport_type: TransportType::Log,
            params: HashMap::new(),
        };
        let transport = create_transport(&config).unwrap();
        assert_eq!(transport.name(), "log");
    }

    #[test]
    fn test_file_transport_without_path_fails() {
        let config = TransportConfig {
            transport_type: TransportType::File,
            params: HashMap::new(),
        };
        assert!(matches!(
            create_transport(&config),
            Err(ContractError::TransportSetup { .. })
        ));
    }
}
