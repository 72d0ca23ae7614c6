use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use coreshader::render_loop::MAX_PIXEL_RATIO;
use coreshader::DEFAULT_TEMPLATE;

/// How texture and surface formats treat sRGB.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorSpaceMode {
    /// Pick gamma (non-sRGB) output, which matches how browsers present
    /// canvas pixels.
    #[default]
    Auto,
    Gamma,
    Linear,
}

impl FromStr for ColorSpaceMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "gamma" => Ok(Self::Gamma),
            "linear" => Ok(Self::Linear),
            other => Err(anyhow!(
                "unknown color space '{other}' (expected auto, gamma or linear)"
            )),
        }
    }
}

impl fmt::Display for ColorSpaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Gamma => "gamma",
            Self::Linear => "linear",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GpuPowerPreference {
    #[default]
    Low,
    High,
}

impl FromStr for GpuPowerPreference {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" | "low-power" => Ok(Self::Low),
            "high" | "high-performance" => Ok(Self::High),
            other => Err(anyhow!(
                "unknown GPU power preference '{other}' (expected low or high)"
            )),
        }
    }
}

impl fmt::Display for GpuPowerPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::High => "high",
        })
    }
}

/// Summary of the adapter wgpu picked, kept for diagnostics.
#[derive(Clone, Debug)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub max_texture_dimension: u32,
}

impl AdapterProfile {
    pub(crate) fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            max_texture_dimension: limits.max_texture_dimension_2d,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

/// Everything the preview window needs to start.
#[derive(Clone, Debug)]
pub struct PreviewConfig {
    pub title: String,
    /// Initial window size in logical pixels.
    pub window_size: (u32, u32),
    pub max_pixel_ratio: f64,
    pub color_space: ColorSpaceMode,
    pub gpu_power: GpuPowerPreference,
    /// RGBA clear color drawn behind the quad.
    pub clear_color: [f64; 4],
    /// Template loaded into the buffers before any file is imported.
    pub template: String,
    /// Shader and descriptor files, re-read on every reload.
    pub files: Vec<PathBuf>,
    pub image: Option<PathBuf>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            title: "Shader Lab".to_string(),
            window_size: (960, 540),
            max_pixel_ratio: MAX_PIXEL_RATIO,
            color_space: ColorSpaceMode::Auto,
            gpu_power: GpuPowerPreference::Low,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            template: DEFAULT_TEMPLATE.to_string(),
            files: Vec::new(),
            image: None,
        }
    }
}
