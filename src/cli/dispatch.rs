use super::{Cli, commands::Command};
use crate::{
    AnimationOptions, Config, Renderer, Result, ScreenshotOptions,
    config::ConfigOverrides,
    output::{self, OutputFormatter},
    session::CdpSessionFactory,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load()?.load_with_overrides(ConfigOverrides {
        chrome_path: cli.chrome_path.clone(),
        port: cli.port,
        timeout: cli.timeout,
    });
    config.validate()?;

    let factory = if cli.connect {
        CdpSessionFactory::connect(config.browser.port, &config).await?
    } else {
        CdpSessionFactory::launch(&config).await?
    };

    let renderer = Renderer::new(Arc::new(config), factory);

    match cli.command {
        Command::Serialize {
            url,
            mobile,
            output: output_path,
        } => handle_serialize(&renderer, &url, mobile, output_path, cli.json).await,
        Command::Screenshot {
            url,
            output: output_path,
            mobile,
            width,
            height,
            quality,
            full_page,
        } => {
            handle_screenshot(
                &renderer,
                &url,
                output_path,
                mobile,
                width,
                height,
                quality,
                full_page,
                cli.json,
            )
            .await
        }
        Command::Record {
            url,
            output: output_path,
            frames,
            width,
            height,
            fps,
            ready_var,
            next_func,
        } => {
            handle_record(
                &renderer,
                &url,
                output_path,
                frames,
                width,
                height,
                fps,
                ready_var,
                next_func,
                cli.json,
            )
            .await
        }
    }
}

#[derive(Debug, Serialize)]
struct SerializeSummary {
    status: u16,
    file_path: PathBuf,
    content_bytes: u64,
    ms: u64,
}

impl OutputFormatter for SerializeSummary {
    fn format_text(&self) -> String {
        use crate::output::text;
        format!(
            "{}\n{}\n{}\n{}",
            text::success(&format!("Markup saved: {}", self.file_path.display())),
            text::key_value("Status", &self.status.to_string()),
            text::key_value("Size", &text::format_bytes(self.content_bytes)),
            text::key_value("Render Time", &text::format_duration_ms(self.ms))
        )
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

async fn handle_serialize<F: crate::SessionFactory>(
    renderer: &Renderer<F>,
    url: &str,
    mobile: bool,
    output_path: Option<PathBuf>,
    as_json: bool,
) -> Result<()> {
    let start = std::time::Instant::now();
    let page = renderer.serialize(url, mobile).await?;

    match output_path {
        Some(path) => {
            std::fs::write(&path, &page.content)?;
            let summary = SerializeSummary {
                status: page.status,
                file_path: path,
                content_bytes: page.content.len() as u64,
                ms: start.elapsed().as_millis() as u64,
            };
            output::print_output(&summary, as_json, true)
        }
        None if as_json => {
            println!("{}", output::to_json(&page, true)?);
            Ok(())
        }
        None => {
            println!("{}", page.content);
            Ok(())
        }
    }
}

#[derive(Debug, Serialize)]
struct ScreenshotSummary {
    file_path: PathBuf,
    url: String,
    width: u32,
    height: u32,
    file_size_bytes: u64,
    captured_at: DateTime<Utc>,
    ms: u64,
}

impl OutputFormatter for ScreenshotSummary {
    fn format_text(&self) -> String {
        use crate::output::text;
        format!(
            "{}\n{}\n{}\n{}\n{}",
            text::success(&format!("Screenshot saved: {}", self.file_path.display())),
            text::key_value("URL", &self.url),
            text::key_value("Size", &format!("{}x{}", self.width, self.height)),
            text::key_value("File Size", &text::format_bytes(self.file_size_bytes)),
            text::key_value("Render Time", &text::format_duration_ms(self.ms))
        )
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_screenshot<F: crate::SessionFactory>(
    renderer: &Renderer<F>,
    url: &str,
    output_path: PathBuf,
    mobile: bool,
    width: Option<u32>,
    height: Option<u32>,
    quality: Option<u8>,
    full_page: bool,
    as_json: bool,
) -> Result<()> {
    let start = std::time::Instant::now();

    let width = width.unwrap_or(renderer.config().render.viewport_width);
    let height = height.unwrap_or(renderer.config().render.viewport_height);
    let options = ScreenshotOptions {
        quality,
        full_page,
        clip: None,
    };

    let bytes = renderer
        .screenshot(url, mobile, width, height, &options)
        .await?;

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output_path, &bytes)?;

    let image_data = image::load_from_memory(&bytes)
        .map_err(|e| crate::RenderError::CaptureFailed(format!("Failed to load image: {}", e)))?;

    let summary = ScreenshotSummary {
        file_size_bytes: std::fs::metadata(&output_path)?.len(),
        file_path: output_path,
        url: url.to_string(),
        width: image_data.width(),
        height: image_data.height(),
        captured_at: Utc::now(),
        ms: start.elapsed().as_millis() as u64,
    };

    output::print_output(&summary, as_json, true)
}

#[derive(Debug, Serialize)]
struct RecordSummary {
    file_path: PathBuf,
    frames: u32,
    fps: u32,
    file_size_bytes: u64,
    recorded_at: DateTime<Utc>,
    ms: u64,
}

impl OutputFormatter for RecordSummary {
    fn format_text(&self) -> String {
        use crate::output::text;
        format!(
            "{}\n{}\n{}\n{}\n{}",
            text::success(&format!("Recording saved: {}", self.file_path.display())),
            text::key_value("Frames", &self.frames.to_string()),
            text::key_value("FPS", &self.fps.to_string()),
            text::key_value("File Size", &text::format_bytes(self.file_size_bytes)),
            text::key_value("Render Time", &text::format_duration_ms(self.ms))
        )
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_record<F: crate::SessionFactory>(
    renderer: &Renderer<F>,
    url: &str,
    output_path: Option<PathBuf>,
    frames: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
    ready_var: Option<String>,
    next_func: Option<String>,
    as_json: bool,
) -> Result<()> {
    let start = std::time::Instant::now();

    let animation = &renderer.config().animation;
    let mut options = AnimationOptions {
        frames: frames.unwrap_or(animation.frames),
        width: width.unwrap_or(animation.width),
        height: height.unwrap_or(animation.height),
        fps: fps.unwrap_or(animation.fps),
        ..Default::default()
    };
    if let Some(ready_var) = ready_var {
        options.ready_var_name = ready_var;
    }
    if let Some(next_func) = next_func {
        options.next_func_name = next_func;
    }

    let video_path = renderer.render_animation(url, &options).await?;

    let final_path = match output_path {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::rename(&video_path, &path)?;
            path
        }
        None => video_path,
    };

    let summary = RecordSummary {
        file_size_bytes: std::fs::metadata(&final_path)?.len(),
        file_path: final_path,
        frames: options.frames,
        fps: options.fps,
        recorded_at: Utc::now(),
        ms: start.elapsed().as_millis() as u64,
    };

    output::print_output(&summary, as_json, true)
}
