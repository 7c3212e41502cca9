//! FileTransport - appends messages to a JSON-lines outbox

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use contracts::{ContractError, DeliveryReceipt, OutboundMessage, RecipientId, Transport};
use serde::Serialize;
use tracing::{debug, error, instrument};

/// Configuration for FileTransport
#[derive(Debug, Clone)]
pub struct FileTransportConfig {
    /// Outbox file, created if missing
    pub path: PathBuf,
}

impl FileTransportConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Option<Self> {
        params.get("path").map(|path| Self {
            path: PathBuf::from(path),
        })
    }
}

/// One outbox line
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutboxLine<'a> {
    id: String,
    recipient: &'a RecipientId,
    recipient_name: &'a str,
    variant: usize,
    body: &'a str,
    queued_at: DateTime<Utc>,
}

/// Transport that appends every message to a file
pub struct FileTransport {
    name: String,
    config: FileTransportConfig,
    file: File,
    written: u64,
}

impl FileTransport {
    /// Create a new FileTransport, opening the outbox for append
    pub fn new(name: impl Into<String>, config: FileTransportConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            config,
            file,
            written: 0,
        })
    }

    /// Create from params map (for the factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = FileTransportConfig::from_params(params).ok_or_else(|| {
            ContractError::transport_setup(&name, "file transport requires a path")
        })?;
        Self::new(name.clone(), config)
            .map_err(|e| ContractError::transport_setup(name, e.to_string()))
    }

    fn append(&mut self, message: &OutboundMessage) -> std::io::Result<String> {
        let id = format!("{}-{}", self.name, self.written + 1);
        let line = OutboxLine {
            id: id.clone(),
            recipient: &message.recipient,
            recipient_name: &message.recipient_name,
            variant: message.variant,
            body: &message.body,
            queued_at: Utc::now(),
        };

        let mut json = serde_json::to_vec(&line)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        json.push(b'\n');
        self.file.write_all(&json)?;
        self.written += 1;
        Ok(id)
    }
}

impl Transport for FileTransport {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_transport_send",
        skip(self, message),
        fields(transport = %self.name, identity = %message.recipient)
    )]
    async fn send(&mut self, message: &OutboundMessage) -> Result<DeliveryReceipt, ContractError> {
        match self.append(message) {
            Ok(id) => Ok(DeliveryReceipt::accepted(id)),
            Err(e) => {
                error!(
                    transport = %self.name,
                    path = %self.config.path.display(),
                    error = %e,
                    "Outbox write failed"
                );
                Err(ContractError::transport(&self.name, e.to_string()))
            }
        }
    }

    #[instrument(name = "file_transport_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.file.sync_all()?;
        debug!(transport = %self.name, written = self.written, "FileTransport closed");
        Ok(())
    }
}
