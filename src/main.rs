use rudis::expire::Expirer;
use rudis::{run_server, Config, RudisResult, Server};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> RudisResult<()> {
    let config = Config::from_args(std::env::args().skip(1))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.loglevel.clone())),
        )
        .init();

    let server = Server::new();
    let expirer = Expirer::start(
        server.clone(),
        Duration::from_millis(config.expire_tick_ms),
        config.expire_sample_keys,
        config.expire_again_percentage,
    );

    let result = run_server(server, config).await;
    expirer.stop().await;
    result
}
