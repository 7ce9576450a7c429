use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payfast_bridge::application::attempt::PaymentBridge;
use payfast_bridge::config::BridgeConfig;
use payfast_bridge::domain::ports::PaymentHooks;
use payfast_bridge::domain::protocol::CHANNEL_NAME;
use payfast_bridge::infrastructure::process::ChildProcessHost;
use payfast_bridge::interfaces::json::request_reader::DocumentReader;
use std::fs::File;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Payment request JSON file, an object with a `data` member
    request: PathBuf,

    /// Presentation options JSON file merged on top of the request
    #[arg(long)]
    options: Option<PathBuf>,

    /// Name of the channel opened to the embedded process
    #[arg(long, env = "PAYFAST_BRIDGE_CHANNEL", default_value = CHANNEL_NAME)]
    channel: String,

    /// Seconds to wait for a payment outcome (0 waits forever)
    #[arg(long, env = "PAYFAST_BRIDGE_TIMEOUT_SECS", default_value_t = 300)]
    timeout_secs: u64,

    /// Command that starts the embedded payment process. Without it the
    /// outbound payload is printed instead.
    #[arg(last = true)]
    embedded: Vec<String>,
}

struct ConsoleHooks;

impl PaymentHooks for ConsoleHooks {
    fn on_payment_completed(&self) {
        println!("completed");
    }

    fn on_payment_cancelled(&self) {
        println!("cancelled");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "payfast_bridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = BridgeConfig::new()
        .with_channel_name(cli.channel)
        .with_timeout_secs(cli.timeout_secs);

    // Validate before anything is started
    let file = File::open(&cli.request).into_diagnostic()?;
    let request = DocumentReader::new(file).read_request().into_diagnostic()?;

    let payload = match cli.options {
        Some(path) => {
            let file = File::open(path).into_diagnostic()?;
            let options = DocumentReader::new(file).read_options().into_diagnostic()?;
            request.with_options(&options).into_diagnostic()?
        }
        None => request.into_payload(),
    };

    let Some(host) = ChildProcessHost::from_command_line(&cli.embedded) else {
        println!("{}", payload.to_json().into_diagnostic()?);
        return Ok(());
    };

    let bridge = PaymentBridge::new(Box::new(host), config);
    let outcome = bridge.run(payload, &ConsoleHooks).await.into_diagnostic()?;
    info!(%outcome, "payment attempt finished");

    Ok(())
}
