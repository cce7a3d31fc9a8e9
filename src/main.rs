use anyhow::Result;
use clap::Parser;
use tracing::error;
use timekeeper::{
    config::Config,
    server::{args::ServerArgs, start_server},
    utils::{
        logging::{enable_logging, SERVER_PREFIX},
        runtime::multi_thread_runtime,
    },
};

fn main() -> Result<()> {
    let args = ServerArgs::parse();
    // A missing .env is the normal case outside of development.
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    std::fs::create_dir_all(&args.dir)?;
    enable_logging(SERVER_PREFIX, &args.dir.join("logs"), args.log, !args.quiet)?;

    multi_thread_runtime()?
        .block_on(async move { start_server(args, config).await })
        .inspect_err(|e| {
            error!("Error running server {e:?}");
        })
}
