use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use viera_client::{
    Credentials, Key, RemoteControl, RemoteControlBuilder, TcpTransport, TvType, DEFAULT_DEVICE_NAME,
    DEFAULT_PORT, DEFAULT_TIMEOUT,
};

/// Remote control for Panasonic Viera TVs.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TV address (IP or host name).
    host: String,
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Per-request deadline in seconds.
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,
    /// Name shown on the TV while pairing.
    #[arg(long, default_value = DEFAULT_DEVICE_NAME)]
    device_name: String,
    /// Application id from an earlier pairing.
    #[arg(long, env = "VIERA_APP_ID", requires = "encryption_key")]
    app_id: Option<String>,
    /// Encryption key from an earlier pairing (base64).
    #[arg(long, env = "VIERA_ENCRYPTION_KEY", requires = "app_id", hide_env_values = true)]
    encryption_key: Option<String>,
    /// Treat the TV as one that requires PIN pairing.
    #[arg(short, long)]
    encrypted: bool,
    /// Log protocol details.
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pair with the TV using the PIN it displays.
    Pair,
    /// Press a key, by short name (`epg`) or wire code (`NRC_EPG-ONOFF`).
    Key { key: String },
    /// List the known key names.
    Keys,
    /// Show the volume, or set it (0-100).
    Volume { level: Option<u8> },
    /// Show mute state, or set it.
    Mute { state: Option<Switch> },
    /// Check whether the TV needs PIN pairing.
    Detect,
    /// Open a URL in the TV's web browser.
    Open { url: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Switch {
    On,
    Off,
}

fn setup_logging(verbose: bool) {
    // --verbose wins over RUST_LOG
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn build_remote(cli: &Cli) -> Result<RemoteControl<TcpTransport>> {
    let mut builder = RemoteControlBuilder::new(cli.host.clone())
        .port(cli.port)
        .timeout(Duration::from_secs(cli.timeout))
        .device_name(cli.device_name.clone())
        .encrypted(cli.encrypted || matches!(cli.command, Command::Pair));

    if let (Some(app_id), Some(key)) = (&cli.app_id, &cli.encryption_key) {
        let credentials =
            Credentials::from_base64(app_id.clone(), key).context("invalid stored credentials")?;
        builder = builder.credentials(credentials);
    }

    Ok(builder.build()?)
}

async fn pair(remote: &mut RemoteControl<TcpTransport>) -> Result<()> {
    remote
        .request_pin_code()
        .await
        .context("TV did not start pairing")?;

    eprint!("Enter the PIN shown on the TV: ");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read PIN")?;

    let credentials = remote.authorize_pin_code(line.trim()).await?;
    println!("Paired. Store these to skip pairing next time:");
    println!("  VIERA_APP_ID={}", credentials.application_id());
    println!(
        "  VIERA_ENCRYPTION_KEY={}",
        credentials.encryption_key().to_base64()
    );
    Ok(())
}

async fn press(remote: &mut RemoteControl<TcpTransport>, key: &str) -> Result<()> {
    match key.parse::<Key>() {
        Ok(key) => remote.send_key(key).await?,
        Err(_) if key.starts_with("NRC_") => remote.send_key_code(key).await?,
        Err(e) => bail!("{} (run `keys` for the list)", e),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut remote = build_remote(&cli)?;
    tracing::debug!(
        host = %cli.host,
        encrypted = remote.is_encrypted(),
        "remote ready"
    );

    match cli.command {
        Command::Pair => pair(&mut remote).await?,
        Command::Key { ref key } => press(&mut remote, key).await?,
        Command::Keys => {
            for key in Key::ALL {
                println!("{:<16} {}", key.short_name().to_lowercase(), key.code());
            }
        }
        Command::Volume { level: Some(level) } => remote.set_volume(level).await?,
        Command::Volume { level: None } => println!("{}", remote.get_volume().await?),
        Command::Mute { state: Some(state) } => {
            remote.set_mute(matches!(state, Switch::On)).await?
        }
        Command::Mute { state: None } => {
            let muted = remote.get_mute().await?;
            println!("{}", if muted { "on" } else { "off" });
        }
        Command::Detect => match remote.detect_tv_type().await? {
            TvType::Encrypted => println!("encrypted (PIN pairing required)"),
            TvType::Plain => println!("plain"),
        },
        Command::Open { ref url } => remote
            .open_webpage(url)
            .await
            .with_context(|| format!("failed to open {}", url))?,
    }

    Ok(())
}
