use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

pub const DEFAULT_PORT: u16 = 3333;

#[derive(Parser, Debug)]
#[command(name = "timekeeper", version, long_about = None)]
#[command(about = "Tracks time spent on labeled activities over HTTP", long_about = None)]
pub struct ServerArgs {
    #[arg(default_value_t = DEFAULT_PORT, help = "Port to listen on")]
    pub port: u16,
    #[arg(
        long,
        default_value = ".",
        help = "Directory holding stamps.json and the logs directory"
    )]
    pub dir: PathBuf,
    #[arg(long, help = "HTML template served on /. The built-in page is used by default")]
    pub index: Option<PathBuf>,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
    #[arg(long, help = "Don't write logs to stdout")]
    pub quiet: bool,
}
