use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(about = "Serialize the script-executed DOM to static HTML")]
    Serialize {
        #[arg(help = "URL to render")]
        url: String,
        #[arg(long, help = "Emulate a mobile device")]
        mobile: bool,
        #[arg(short, long, help = "Write markup to a file instead of stdout")]
        output: Option<PathBuf>,
    },

    #[command(about = "Capture a JPEG screenshot of the rendered page")]
    Screenshot {
        #[arg(help = "URL to render")]
        url: String,
        #[arg(short, long, help = "Output file path")]
        output: PathBuf,
        #[arg(long, help = "Emulate a mobile device")]
        mobile: bool,
        #[arg(long, help = "Viewport width")]
        width: Option<u32>,
        #[arg(long, help = "Viewport height")]
        height: Option<u32>,
        #[arg(long, help = "JPEG quality (1-100)")]
        quality: Option<u8>,
        #[arg(long, help = "Capture the full page beyond the viewport")]
        full_page: bool,
    },

    #[command(about = "Record a page-paced animation into an MP4")]
    Record {
        #[arg(help = "URL to render")]
        url: String,
        #[arg(short, long, help = "Output file path (defaults next to the frames)")]
        output: Option<PathBuf>,
        #[arg(long, help = "Number of frames to capture")]
        frames: Option<u32>,
        #[arg(long, help = "Viewport width")]
        width: Option<u32>,
        #[arg(long, help = "Viewport height")]
        height: Option<u32>,
        #[arg(long, help = "Output frame rate")]
        fps: Option<u32>,
        #[arg(long, help = "In-page readiness variable name")]
        ready_var: Option<String>,
        #[arg(long, help = "In-page frame-advance function name")]
        next_func: Option<String>,
    },
}
