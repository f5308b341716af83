//! Individual connection handling

use super::manager::SessionManager;
use anyhow::Result;
use mm_envelope::codec::{AssemblerConfig, ResponseAssembler};
use mm_envelope::Validator;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

/// Per-connection totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSummary {
    pub received: u64,
    pub invalid: u64,
}

/// One inbound envelope stream
pub struct SinkSession<R> {
    peer: String,
    reader: R,
    assembler: ResponseAssembler,
    validator: Validator,
    manager: Arc<SessionManager>,
    read_buf: Vec<u8>,
    summary: SessionSummary,
}

impl<R: AsyncRead + Unpin> SinkSession<R> {
    /// Create a new session over a byte stream
    pub fn new(
        peer: impl Into<String>,
        reader: R,
        assembler: AssemblerConfig,
        validator: Validator,
        manager: Arc<SessionManager>,
    ) -> Self {
        Self {
            peer: peer.into(),
            reader,
            assembler: ResponseAssembler::new(assembler),
            validator,
            manager,
            read_buf: vec![0u8; 4096],
            summary: SessionSummary::default(),
        }
    }

    /// Receive and validate envelopes until the peer disconnects
    pub async fn run(mut self) -> Result<SessionSummary> {
        self.manager.session_opened();
        let result = self.read_loop().await;
        self.manager.session_closed();
        result?;
        Ok(self.summary)
    }

    async fn read_loop(&mut self) -> Result<()> {
        loop {
            let n = self.reader.read(&mut self.read_buf).await?;
            if n == 0 {
                info!("Client disconnected: {}", self.peer);
                break;
            }
            self.assembler.extend(&self.read_buf[..n]);

            // Process all complete envelopes
            loop {
                match self.assembler.next_response() {
                    Ok(Some(response)) => self.handle_response(&response),
                    Ok(None) => break,
                    Err(e) => {
                        warn!("[{}] decode error: {}", self.peer, e);
                        self.manager.record_decode_error();
                    }
                }
            }
        }

        match self.assembler.finish() {
            Ok(Some(response)) => self.handle_response(&response),
            Ok(None) => {}
            Err(e) => {
                warn!("[{}] decode error: {}", self.peer, e);
                self.manager.record_decode_error();
            }
        }
        Ok(())
    }

    fn handle_response(&mut self, response: &Value) {
        self.summary.received += 1;
        let errors = self.validator.validate_all(response);
        self.manager.record(errors.is_empty());

        if errors.is_empty() {
            debug!("[{}] valid envelope: {}", self.peer, response);
            return;
        }

        self.summary.invalid += 1;
        for err in &errors {
            warn!("[{}] invalid envelope: {}", self.peer, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(input: &'static [u8], validator: Validator) -> (SinkSession<&'static [u8]>, Arc<SessionManager>) {
        let manager = Arc::new(SessionManager::new());
        let session = SinkSession::new(
            "test",
            input,
            AssemblerConfig::default(),
            validator,
            manager.clone(),
        );
        (session, manager)
    }

    #[tokio::test]
    async fn test_counts_valid_and_invalid() {
        let (session, manager) = session(
            b"{\"cmd\": \"read_reg\", \"result\": \"Success\"}\n\
              noise\n\
              {\"result\": \"Success\"}\n",
            Validator::default(),
        );

        let summary = session.run().await.expect("session failed");

        assert_eq!(summary, SessionSummary { received: 2, invalid: 1 });
        let stats = manager.stats();
        assert_eq!(stats.valid, 1);
        assert_eq!(stats.invalid, 1);
        assert_eq!(stats.active_sessions, 0);
    }

    #[tokio::test]
    async fn test_strict_validator_rejects_extra_fields() {
        let (session, _) = session(
            b"{\"cmd\": \"x\", \"result\": \"Error\", \"version\": \"0.0.1\"}\n",
            Validator::strict(),
        );

        let summary = session.run().await.expect("session failed");
        assert_eq!(summary.invalid, 1);
    }

    #[tokio::test]
    async fn test_incomplete_tail_is_decode_error() {
        let (session, manager) = session(b"{\"cmd\": \"x\"}\n", Validator::default());

        let summary = session.run().await.expect("session failed");
        assert_eq!(summary.received, 0);
        assert_eq!(manager.stats().decode_errors, 1);
    }
}
