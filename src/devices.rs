use crate::{RenderError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
    pub user_agent: String,
    pub touch: bool,
    pub mobile: bool,
}

impl DeviceProfile {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::ConfigError(
                "Device dimensions must be positive".into(),
            ));
        }

        if self.pixel_ratio < 0.5 || self.pixel_ratio > 5.0 {
            return Err(RenderError::ConfigError(
                "Pixel ratio must be between 0.5 and 5.0".into(),
            ));
        }

        if self.user_agent.is_empty() {
            return Err(RenderError::ConfigError(
                "User agent cannot be empty".into(),
            ));
        }

        Ok(())
    }
}

pub static DEVICE_PRESETS: Lazy<Vec<DeviceProfile>> = Lazy::new(|| {
    vec![
        DeviceProfile {
            name: String::from("Desktop"),
            width: 1920,
            height: 1080,
            pixel_ratio: 1.0,
            user_agent: String::from(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
            ),
            touch: false,
            mobile: false,
        },
        DeviceProfile {
            name: String::from("Mobile"),
            width: 412,
            height: 915,
            pixel_ratio: 2.625,
            user_agent: String::from(
                "Mozilla/5.0 (Linux; Android 14; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Mobile Safari/537.36",
            ),
            touch: true,
            mobile: true,
        },
    ]
});

pub fn get_device_by_name(name: &str) -> Result<DeviceProfile> {
    DEVICE_PRESETS
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(name))
        .cloned()
        .ok_or_else(|| RenderError::ConfigError(format!("Device profile not found: {}", name)))
}

/// The fixed profile substituted when a request asks for mobile emulation.
pub fn mobile_profile() -> &'static DeviceProfile {
    DEVICE_PRESETS
        .iter()
        .find(|d| d.mobile)
        .expect("mobile preset is always defined")
}
