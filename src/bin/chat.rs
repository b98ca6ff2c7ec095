use clap::Parser;
use groundchat::client::{ChatSession, HttpChatProxy};
use groundchat::retry::RetryPolicy;
use groundchat::utils::logging::init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use url::Url;

/// Terminal chat against a running groundchat proxy.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root URL of the proxy.
    #[arg(long, default_value = "http://127.0.0.1:8188/")]
    server: Url,

    /// Total attempts per message, first attempt included.
    #[arg(long, default_value_t = RetryPolicy::DEFAULT_MAX_ATTEMPTS)]
    max_attempts: usize,

    /// Delay before the first retry in milliseconds; doubles on each further retry.
    #[arg(long, default_value_t = 1000)]
    base_delay_ms: u64,

    /// Also request an illustration of every message in the background.
    #[arg(long, default_value_t = false)]
    illustrate: bool,

    /// Log level when RUST_LOG is unset.
    #[arg(long, default_value = "warn")]
    loglevel: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(&args.loglevel);

    let proxy = Arc::new(HttpChatProxy::new(&args.server)?);
    let retry = RetryPolicy::new(args.max_attempts, Duration::from_millis(args.base_delay_ms));
    let mut session = ChatSession::connect(proxy, retry).await;

    let mut stdout = tokio::io::stdout();
    if !session.input_enabled() {
        stdout
            .write_all(b"The chat proxy is unavailable or has no API key configured.\n")
            .await?;
        return Ok(());
    }

    stdout
        .write_all(b"Connected. Type a message, or an empty line to quit.\n> ")
        .await?;
    stdout.flush().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            break;
        }

        if args.illustrate {
            let handle = session.illustrate(line.clone());
            tokio::spawn(async move {
                if let Ok(Some(image)) = handle.await {
                    println!(
                        "\n[illustration ready: {}, {} base64 chars]",
                        image.mime_type,
                        image.data.len()
                    );
                }
            });
        }

        let turn = session.send(&line).await?;

        let mut out = format!("\n{}\n", turn.text);
        if !turn.sources.is_empty() {
            out.push_str("\nSources:\n");
            for (i, source) in turn.sources.iter().enumerate() {
                let title = source.title.as_deref().unwrap_or(&source.uri);
                out.push_str(&format!("  [{}] {} <{}>\n", i + 1, title, source.uri));
            }
        }
        out.push_str("\n> ");
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}
