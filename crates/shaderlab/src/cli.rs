use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use renderer::{ColorSpaceMode, GpuPowerPreference};

#[derive(Parser, Debug)]
#[command(
    name = "shaderlab",
    author,
    version,
    about = "Preview lab for Minecraft core shaders"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a window rendering the shader triple on a fullscreen quad.
    Preview(PreviewArgs),
    /// Compile and link without a GPU; exits non-zero on failure.
    Check(CheckArgs),
    /// List or export the bundled templates.
    Template(TemplateCommand),
    /// Print the configuration directory and settings file.
    Where,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// `.vsh`, `.fsh` and `.json` files; they replace the template's buffers.
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Template the buffers start from.
    #[arg(long, value_name = "ID")]
    pub template: Option<String>,

    /// Image bound to `Sampler0`.
    #[arg(long, value_name = "PATH")]
    pub image: Option<PathBuf>,

    /// Window size in logical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Upper bound for the display scale factor used to size the surface.
    #[arg(long, value_name = "RATIO")]
    pub max_pixel_ratio: Option<f64>,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(long, value_name = "MODE", value_parser = parse_color_space)]
    pub color_space: Option<ColorSpaceMode>,

    /// GPU power preference: `low` or `high`.
    #[arg(long, value_name = "PREF", value_parser = parse_gpu_power)]
    pub gpu_power: Option<GpuPowerPreference>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// `.vsh`, `.fsh` and `.json` files; they replace the template's buffers.
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Template the buffers start from.
    #[arg(long, value_name = "ID")]
    pub template: Option<String>,

    /// Also print the bridged GLSL handed to the GPU.
    #[arg(long)]
    pub emit: bool,
}

#[derive(Args, Debug)]
pub struct TemplateCommand {
    #[command(subcommand)]
    pub action: TemplateAction,
}

#[derive(Subcommand, Debug)]
pub enum TemplateAction {
    /// List bundled templates.
    List,
    /// Write a template's `.vsh`, `.fsh` and `.json` files into a directory.
    Write {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(long, value_name = "DIR", default_value = ".")]
        out: PathBuf,
        /// Overwrite existing files.
        #[arg(long)]
        force: bool,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid width".to_string())?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid height".to_string())?;
    if width == 0 || height == 0 {
        return Err("window size must be greater than zero".into());
    }
    Ok((width, height))
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceMode, String> {
    value.parse().map_err(|err: anyhow::Error| err.to_string())
}

pub fn parse_gpu_power(value: &str) -> Result<GpuPowerPreference, String> {
    value.parse().map_err(|err: anyhow::Error| err.to_string())
}
