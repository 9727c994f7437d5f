pub mod cli;
pub mod config;
pub mod devices;
pub mod encoder;
pub mod error;
pub mod js_templates;
pub mod output;
pub mod renderer;
pub mod session;
pub mod timeouts;
pub mod utils;

pub use config::Config;
pub use encoder::{FfmpegEncoder, FrameEncoder};
pub use error::RenderError;
pub use renderer::{AnimationOptions, RenderRequest, RenderedPage, Renderer, ScreenshotOptions};
pub use session::{
    BrowserSession, CaptureOptions, CdpSessionFactory, MainResponse, NavigationOutcome,
    SessionFactory, WaitUntil,
};

pub type Result<T> = std::result::Result<T, RenderError>;
