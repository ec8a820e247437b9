use clap::Parser;
use std::io::Write;

#[derive(Parser)]
#[command(name = "slack-bridge", version)]
#[command(about = "Route Slack RTM events and verify interaction callbacks", long_about = None)]
struct Cli {
    /// Bot user token
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Bot user id; messages from it are ignored
    #[arg(long = "botID", visible_alias = "botId", env = "BOT_ID")]
    bot_id: Option<String>,

    /// Channel the bot listens to
    #[arg(long = "channelID", visible_alias = "channelId", env = "BOT_CHANNEL")]
    channel_id: Option<String>,

    /// Verification token expected in interaction callbacks
    #[arg(long = "checkToken", env = "CHECK_TOKEN", hide_env_values = true)]
    check_token: Option<String>,

    /// Interaction endpoint port (default from config or 3000)
    #[arg(long)]
    port: Option<u16>,

    /// Enable debug logging (raw RTM frames, every received event)
    #[arg(long)]
    debug: bool,

    /// Config file path (default: BRIDGE_CONFIG_PATH or ~/.slack-bridge/config.json)
    #[arg(long, short, value_name = "PATH")]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stdout)
        .format(|buf, record| writeln!(buf, "{} {}", record.level(), record.args()))
        .init();

    let settings = match load_settings(cli) {
        Ok(s) => s,
        Err(e) => {
            log::error!("{:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = bridge::runtime::run_bridge(settings).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn load_settings(cli: Cli) -> anyhow::Result<bridge::config::Settings> {
    let (config, path) = bridge::config::load_config(cli.config)?;
    log::debug!("using config {}", path.display());
    let overrides = bridge::config::Overrides {
        token: cli.token,
        bot_id: cli.bot_id,
        channel_id: cli.channel_id,
        check_token: cli.check_token,
        port: cli.port,
    };
    Ok(bridge::config::resolve_settings(&config, overrides)?)
}
