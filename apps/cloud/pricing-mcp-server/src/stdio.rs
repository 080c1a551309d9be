//! stdio transport: one JSON-RPC message per line on stdin, replies on stdout

use futures::stream::{FuturesUnordered, StreamExt};
use pricing_mcp::McpHandler;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

/// Serve MCP over the process's stdin/stdout until stdin closes
pub async fn run(handler: &McpHandler) -> eyre::Result<()> {
    info!("Serving MCP over stdio");
    serve(handler, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

/// Read newline-delimited requests from `input` and write one reply line each.
///
/// Requests are handled concurrently, so replies may arrive out of order; callers
/// correlate them by `id`. Notifications (requests without an `id`) get no reply.
pub async fn serve<R, W>(handler: &McpHandler, input: R, mut output: W) -> eyre::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut pending = FuturesUnordered::new();
    let mut input_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    info!(pending = pending.len(), "stdin closed, draining MCP requests");
                    input_open = false;
                    continue;
                };
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if is_notification(&line) {
                    debug!("Ignoring MCP notification");
                    continue;
                }
                pending.push(async move { handler.handle_json(&line).await });
            }
            Some(response) = pending.next(), if !pending.is_empty() => {
                output.write_all(response.as_bytes()).await?;
                output.write_all(b"\n").await?;
                output.flush().await?;
            }
            else => break,
        }
    }

    info!("Stopping MCP server");
    Ok(())
}

fn is_notification(line: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(line)
        .map(|message| message.get("method").is_some() && message.get("id").is_none())
        .unwrap_or(false)
}
