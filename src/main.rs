mod command;
mod config;
mod dispatch;
mod error;
mod event;
mod ingest;
mod irc;
mod message;
mod relay;
mod request;
mod server;
mod source;
mod tls;

use std::{error::Error, sync::Arc};

use log::{error, info};

use command::Commands;
use config::Config;
use relay::Relay;
use server::Server;
use source::Source;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let matches = config::app().get_matches();
    let config = Config::from_matches(&matches)?;

    let level = if config.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let mut logger = pretty_env_logger::formatted_timed_builder();
    logger.filter(Some("ircsockets"), level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    let client = Arc::new(irc::Client::connect(&config.irc).await?);

    let acceptor = if config.ws_tls {
        match tls::acceptor(&config.keystore) {
            Ok(x) => Some(x),
            Err(e) => {
                error!("Cannot load keystore {}: {}", config.keystore.display(), e);
                client.quit("Shutting down").await?;

                return Err(e.into());
            }
        }
    } else {
        None
    };

    let server = Arc::new(Server::new(client.clone(), acceptor));
    let (addr, listener) = server.listen(config.ws_port).await?;
    info!("Accepting subscribers on {}", addr);

    let relay = Relay::new(client, server, Commands::new(config.command_prefix, config.accounts));

    let shutdown = relay.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted");
            shutdown.cancel();
        }
    });

    relay.run().await?;
    listener.await?;

    Ok(())
}
