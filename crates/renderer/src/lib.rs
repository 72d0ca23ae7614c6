//! Renderer crate for the shader lab.
//!
//! Implements the lab's `GraphicsBackend` on `wgpu` and hosts it in a `winit`
//! preview window. The overall flow is:
//!
//! ```text
//!   shaderlab preview
//!          │ PreviewConfig
//!          ▼
//!   run_preview ──▶ PreviewState ──▶ winit event loop ──▶ RedrawRequested
//!                        │                                   │
//!                        └─ ShaderLab::recompute             └─▶ ShaderLab::frame ─▶ WgpuBackend::draw
//! ```
//!
//! Frame pacing comes from redraw requests: the lab's render loop asks the
//! `WinitScheduler` for a frame and the next `RedrawRequested` delivers it.

mod files;
mod gpu;
mod types;
mod window;

use anyhow::Result;

pub use files::{read_imported_file, read_imported_files};
pub use gpu::{GpuProgram, WgpuBackend};
pub use types::{AdapterProfile, ColorSpaceMode, GpuPowerPreference, PreviewConfig};

/// Opens the preview window and blocks until it closes.
pub fn run_preview(config: PreviewConfig) -> Result<()> {
    tracing::info!(
        template = %config.template,
        files = config.files.len(),
        image = ?config.image,
        "starting preview"
    );
    window::run(config)
}
