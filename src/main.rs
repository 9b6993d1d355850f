use chat_relay::config::{ProviderCredentials, RelayConfig};
use chat_relay::relay_state::RelayState;
use chat_relay::server::{init_logging, periodic_logging, startup};
use clap::Parser;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(name = "chat-relay")]
#[command(
    about = "Chat relay - dispatches chat turns across hosted LLM providers and streams the replies"
)]
struct CliArgs {
    /// Host address to bind the server
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Timeout in seconds for upstream provider calls
    #[arg(long, default_value_t = 600)]
    timeout: u64,

    /// Interval in seconds between store statistics log lines
    #[arg(long, default_value_t = 60)]
    log_interval: u64,

    /// Maximum number of messages kept per session
    #[arg(long, default_value_t = 200)]
    max_history: usize,
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging();

    let credentials = ProviderCredentials::from_env();
    credentials.warn_missing();

    let config = RelayConfig {
        host: args.host,
        port: args.port,
        timeout: args.timeout,
        log_interval: args.log_interval,
        max_history: args.max_history,
        credentials,
    };
    let app_state = RelayState::new(&config)?;

    actix_web::rt::System::new().block_on(async move {
        tokio::select! {
            _ = periodic_logging(app_state.clone()) => {
                unreachable!()
            }
            res = startup(config, app_state) => {
                res?;
            }
            _ = signal::ctrl_c() => {
                println!("Received Ctrl+C, shutting down");
            }
        }
        Ok(())
    })
}
