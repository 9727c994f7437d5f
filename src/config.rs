use crate::{RenderError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub screenshot: ScreenshotConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    pub chrome_path: Option<PathBuf>,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderConfig {
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_network_idle_ms")]
    pub network_idle_ms: u64,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScreenshotConfig {
    #[serde(default = "default_screenshot_quality")]
    pub default_quality: u8,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnimationConfig {
    #[serde(default = "default_frames")]
    pub frames: u32,
    #[serde(default = "default_animation_dimension")]
    pub width: u32,
    #[serde(default = "default_animation_dimension")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    pub frames_dir: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
}

fn default_headless() -> bool {
    true
}
fn default_port() -> u16 {
    9222
}
fn default_navigation_timeout() -> u64 {
    crate::timeouts::secs::NAVIGATION
}
fn default_network_idle_ms() -> u64 {
    crate::timeouts::ms::NETWORK_IDLE
}
fn default_viewport_width() -> u32 {
    1000
}
fn default_viewport_height() -> u32 {
    1000
}
fn default_screenshot_quality() -> u8 {
    80
}
fn default_frames() -> u32 {
    10
}
fn default_animation_dimension() -> u32 {
    512
}
fn default_fps() -> u32 {
    10
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: default_headless(),
            port: default_port(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_secs: default_navigation_timeout(),
            network_idle_ms: default_network_idle_ms(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
        }
    }
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            default_quality: default_screenshot_quality(),
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            frames: default_frames(),
            width: default_animation_dimension(),
            height: default_animation_dimension(),
            fps: default_fps(),
            frames_dir: None,
            ffmpeg_path: None,
        }
    }
}

impl AnimationConfig {
    /// Directory frame files are written to before assembly.
    pub fn frames_dir(&self) -> PathBuf {
        self.frames_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("prerender")
                .join("frames")
        })
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    default_config_dir().map(|p| p.join("config.toml"))
}

pub fn default_config_dir() -> Result<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".config"))
        })
        .map(|p| p.join("prerender"))
        .ok_or_else(|| RenderError::ConfigError("Could not determine config directory".into()))
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let global_path = default_config_path()?;
        if global_path.exists() {
            let content = std::fs::read_to_string(&global_path)?;
            config = toml::from_str(&content)?;
        }

        let project_path = PathBuf::from(".prerender.toml");
        if project_path.exists() {
            let content = std::fs::read_to_string(&project_path)?;
            let project_config: Config = toml::from_str(&content)?;
            config = config.merge(project_config);
        }

        config.load_from_env();

        Ok(config)
    }

    pub fn load_with_overrides(&self, cli_overrides: ConfigOverrides) -> Self {
        let mut config = self.clone();

        if let Some(chrome_path) = cli_overrides.chrome_path {
            config.browser.chrome_path = Some(chrome_path);
        }
        if let Some(port) = cli_overrides.port {
            config.browser.port = port;
        }
        if let Some(timeout) = cli_overrides.timeout {
            config.render.navigation_timeout_secs = timeout;
        }

        config
    }

    fn merge(mut self, other: Config) -> Self {
        if other.browser.chrome_path.is_some() {
            self.browser.chrome_path = other.browser.chrome_path;
        }
        if other.animation.frames_dir.is_some() {
            self.animation.frames_dir = other.animation.frames_dir;
        }
        if other.animation.ffmpeg_path.is_some() {
            self.animation.ffmpeg_path = other.animation.ffmpeg_path;
        }
        self
    }

    fn load_from_env(&mut self) {
        if let Ok(path) = std::env::var("PRERENDER_CHROME_PATH") {
            self.browser.chrome_path = Some(PathBuf::from(path));
        }
        if let Ok(port) = std::env::var("PRERENDER_PORT")
            && let Ok(port) = port.parse()
        {
            self.browser.port = port;
        }
        if let Ok(timeout) = std::env::var("PRERENDER_TIMEOUT")
            && let Ok(timeout) = timeout.parse()
        {
            self.render.navigation_timeout_secs = timeout;
        }
        if let Ok(path) = std::env::var("PRERENDER_FFMPEG_PATH") {
            self.animation.ffmpeg_path = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.browser.port < 1024 {
            return Err(RenderError::ConfigError(format!(
                "Port {} is out of valid range (1024-65535)",
                self.browser.port
            )));
        }

        if self.render.navigation_timeout_secs == 0 {
            return Err(RenderError::ConfigError(
                "navigation_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.render.viewport_width == 0 || self.render.viewport_height == 0 {
            return Err(RenderError::ConfigError(
                "viewport dimensions must be positive".into(),
            ));
        }

        if self.screenshot.default_quality < 1 || self.screenshot.default_quality > 100 {
            return Err(RenderError::ConfigError(
                "default_quality must be between 1 and 100".into(),
            ));
        }

        if self.animation.frames == 0 || self.animation.fps == 0 {
            return Err(RenderError::ConfigError(
                "animation frames and fps must be greater than 0".into(),
            ));
        }

        if let Some(ref path) = self.browser.chrome_path
            && !path.exists()
        {
            return Err(RenderError::ConfigError(format!(
                "Chrome path does not exist: {}",
                path.display()
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub chrome_path: Option<PathBuf>,
    pub port: Option<u16>,
    pub timeout: Option<u64>,
}
