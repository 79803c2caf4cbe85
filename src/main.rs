use tracing::info;
use shoebox_lib::api;
use shoebox_lib::api::ApiContext;
use shoebox_lib::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    api::init_tracing();

    let config = Config::parse();
    info!("{:?}", &config);

    let ctx = ApiContext::init(config).await?;
    api::serve(ctx).await?;

    Ok(())
}
