//! Stream reader - feeds raw input through the assembler and checker

use super::executor::{CheckExecutor, CheckReport};
use anyhow::{Context, Result};
use bytes::BytesMut;
use mm_envelope::codec::{AssemblerConfig, ResponseAssembler};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// Read a stream to the end, checking every assembled envelope
///
/// `emit` is called with each report as soon as the envelope completes.
/// Returns the number of envelopes checked.
pub async fn check_stream<R, F>(
    source: &str,
    mut reader: R,
    config: AssemblerConfig,
    executor: &CheckExecutor,
    mut emit: F,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
    F: FnMut(&CheckReport),
{
    let mut assembler = ResponseAssembler::new(config);
    let mut buf = BytesMut::with_capacity(4096);
    let mut index = 0;

    loop {
        buf.clear();
        let n = reader
            .read_buf(&mut buf)
            .await
            .with_context(|| format!("read error from {}", source))?;
        if n == 0 {
            debug!("[{}] end of input", source);
            break;
        }

        assembler.extend(&buf);

        // Process all complete responses
        loop {
            match assembler.next_response() {
                Ok(Some(response)) => {
                    index += 1;
                    emit(&executor.check(source, index, &response));
                }
                Ok(None) => break,
                Err(e) => executor.record_decode_error(source, &e),
            }
        }
    }

    match assembler.finish() {
        Ok(Some(response)) => {
            index += 1;
            emit(&executor.check(source, index, &response));
        }
        Ok(None) => {}
        Err(e) => executor.record_decode_error(source, &e),
    }

    Ok(index)
}
