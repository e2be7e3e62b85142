use polyref_db::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to suppress sqlx debug logs
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .parse_default_env()
        .init();

    println!("polyref-db: polymorphic reference document server");

    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{} store={:?} dangling={:?}",
        config.server.host, config.server.port, config.store.backend, config.populate.dangling
    );

    polyref_db::run_server(config).await
}
