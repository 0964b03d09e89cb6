//! JSON I/O handling for CLI
//!
//! - Input: one `RequestData` JSON object per line
//! - Output: one `ResponseData` JSON object per line
//! - UTF-8 only

use std::io::Write;
use std::path::Path;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::errors::{CliError, CliResult};
use crate::core::error::{GatewayResult, ServerError};
use crate::core::request::RequestData;
use crate::core::response::ResponseData;

/// Parse one request. Malformed input is a bad request, not a CLI error.
pub fn parse_request(input: &str) -> GatewayResult<RequestData> {
    serde_json::from_str(input.trim())
        .map_err(|e| ServerError::bad_request(format!("Malformed request: {}", e)))
}

/// Read a single request line from an async reader
pub async fn read_request_line<R>(reader: &mut R) -> CliResult<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    if line.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }
    Ok(line)
}

/// Read a request from a file
pub fn read_request_file(path: &Path) -> CliResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("Failed to read request {}: {}", path.display(), e)))
}

/// Write a response as a single JSON line
pub fn write_response<W: Write>(writer: &mut W, response: &ResponseData) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, response)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
