use anyhow::Result;
use predict_gateway::{
    cli::Cli,
    config::{Config, GatewayConfig},
    server,
};

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Cli::parse();
    let cfg = Config::load(args.config.clone());
    log::debug!("config file: {}", cfg.config_path.display());
    let gateway = GatewayConfig::resolve(&cfg, &args)?;

    server::run(gateway).await
}
