pub mod commands;
pub mod dispatch;

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "prerender")]
#[command(version, about = "Headless Chrome rendering pipeline")]
#[command(
    long_about = "Renders script-executed pages into static artifacts: serialized HTML, JPEG screenshots, or MP4 animation recordings"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: commands::Command,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Path to Chrome executable")]
    pub chrome_path: Option<PathBuf>,

    #[arg(long, global = true, help = "Chrome debugging port")]
    pub port: Option<u16>,

    #[arg(
        long,
        global = true,
        help = "Connect to a running Chrome instead of launching one"
    )]
    pub connect: bool,

    #[arg(long, global = true, help = "Navigation timeout in seconds")]
    pub timeout: Option<u64>,
}

pub async fn run() -> crate::Result<()> {
    let cli = Cli::parse();
    dispatch::dispatch(cli).await
}
