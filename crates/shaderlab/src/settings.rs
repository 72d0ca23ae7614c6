use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use coreshader::render_loop::MAX_PIXEL_RATIO;
use coreshader::{templates, DEFAULT_TEMPLATE};
use renderer::{ColorSpaceMode, GpuPowerPreference, PreviewConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::PreviewArgs;

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("window size must be positive, got {0}x{1}")]
    WindowSize(u32, u32),
    #[error("max_pixel_ratio must be within 1.0..={max}, got {0}", max = MAX_PIXEL_RATIO)]
    PixelRatio(f64),
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),
    #[error("invalid {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
    #[error("clear_color components must be within 0.0..=1.0")]
    ClearColor,
}

/// Contents of `settings.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub width: u32,
    pub height: u32,
    pub max_pixel_ratio: f64,
    pub template: String,
    pub color_space: String,
    pub gpu_power: String,
    pub clear_color: [f64; 4],
}

impl Default for Settings {
    fn default() -> Self {
        let preview = PreviewConfig::default();
        Self {
            width: preview.window_size.0,
            height: preview.window_size.1,
            max_pixel_ratio: preview.max_pixel_ratio,
            template: DEFAULT_TEMPLATE.to_string(),
            color_space: preview.color_space.to_string(),
            gpu_power: preview.gpu_power.to_string(),
            clear_color: preview.clear_color,
        }
    }
}

impl Settings {
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file; using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file at {}", path.display()))?;
        let settings: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse settings file at {}", path.display()))?;
        settings
            .validate()
            .with_context(|| format!("invalid settings in {}", path.display()))?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.width == 0 || self.height == 0 {
            return Err(SettingsError::WindowSize(self.width, self.height));
        }
        if !(1.0..=MAX_PIXEL_RATIO).contains(&self.max_pixel_ratio) {
            return Err(SettingsError::PixelRatio(self.max_pixel_ratio));
        }
        if templates::find(&self.template).is_none() {
            return Err(SettingsError::UnknownTemplate(self.template.clone()));
        }
        if !self
            .clear_color
            .iter()
            .all(|component| (0.0..=1.0).contains(component))
        {
            return Err(SettingsError::ClearColor);
        }
        self.color_space()?;
        self.gpu_power()?;
        Ok(())
    }

    pub fn color_space(&self) -> Result<ColorSpaceMode, SettingsError> {
        self.color_space
            .parse()
            .map_err(|err: anyhow::Error| SettingsError::InvalidValue {
                key: "color_space",
                message: err.to_string(),
            })
    }

    pub fn gpu_power(&self) -> Result<GpuPowerPreference, SettingsError> {
        self.gpu_power
            .parse()
            .map_err(|err: anyhow::Error| SettingsError::InvalidValue {
                key: "gpu_power",
                message: err.to_string(),
            })
    }

    /// Builds the preview configuration, letting command-line flags win.
    pub fn preview_config(&self, args: &PreviewArgs) -> Result<PreviewConfig, SettingsError> {
        let max_pixel_ratio = args.max_pixel_ratio.unwrap_or(self.max_pixel_ratio);
        if !(1.0..=MAX_PIXEL_RATIO).contains(&max_pixel_ratio) {
            return Err(SettingsError::PixelRatio(max_pixel_ratio));
        }
        let color_space = match args.color_space {
            Some(mode) => mode,
            None => self.color_space()?,
        };
        let gpu_power = match args.gpu_power {
            Some(preference) => preference,
            None => self.gpu_power()?,
        };

        Ok(PreviewConfig {
            window_size: args.size.unwrap_or((self.width, self.height)),
            max_pixel_ratio,
            color_space,
            gpu_power,
            clear_color: self.clear_color,
            template: args
                .template
                .clone()
                .unwrap_or_else(|| self.template.clone()),
            files: args.files.clone(),
            image: args.image.clone(),
            ..PreviewConfig::default()
        })
    }
}
