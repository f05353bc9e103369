mod cli;

use clap::Parser;
use common::logger::init_logger;
use relay::feed::{FeedConfig, run_feed};
use relay::{RelayClient, RelayConfig, RelayServer};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let env_cfg = RelayConfig::from_env()?;

    match cli.command {
        Command::Serve(args) => {
            let cfg = args.apply(env_cfg);
            init_logger("tickrelay", cfg.log_json);
            cfg.validate()?;

            let server = RelayServer::from_config(&cfg).await?;
            cancel_on_ctrl_c(server.shutdown_token());

            info!(
                window = cfg.window_capacity,
                history = cfg.history_capacity,
                interval_ms = cfg.stream_interval_ms,
                "starting relay"
            );
            server.run().await
        }

        Command::Feed(args) => {
            init_logger("tickrelay-feed", env_cfg.log_json);

            let shutdown = CancellationToken::new();
            cancel_on_ctrl_c(shutdown.clone());

            run_feed(FeedConfig::binance(&args.symbol, args.relay), shutdown).await
        }

        Command::Watch(args) => {
            init_logger("tickrelay-watch", env_cfg.log_json);

            let client = RelayClient::connect(&args.relay).await?;
            let mut stream = client.stream_prices(args.symbols).await?;

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    next = stream.next() => match next {
                        Some(u) => println!("{} {:.2} {}", u.symbol, u.price, u.timestamp),
                        None => break,
                    },
                }
            }

            stream.close().await;
            Ok(())
        }
    }
}

fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("ctrl-c received, shutting down"),
            Err(e) => error!(error = %e, "failed to listen for ctrl-c, shutting down"),
        }
        token.cancel();
    });
}
