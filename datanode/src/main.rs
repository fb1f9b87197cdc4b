use aegisfs_common::Config;
use aegisfs_datanode::block_store::BlockStore;

const DEFAULT_ADDR: &str = "127.0.0.1:9101";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = Config::load()?;
    std::fs::create_dir_all(&cfg.log_dir)?;

    let store = BlockStore::open(&cfg.data_dir)?;
    tracing::info!(data_dir = %cfg.data_dir.display(), "DataNode starting");

    aegisfs_datanode::server::serve(DEFAULT_ADDR, store).await?;
    Ok(())
}
