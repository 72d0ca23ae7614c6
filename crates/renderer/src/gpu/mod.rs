//! wgpu backend for the lab.
//!
//! - `context` owns instance, device and surface wiring.
//! - `pipeline` turns a linked program into a render pipeline over two shared
//!   bind group layouts (uniform block, texture slot).
//! - `texture` keeps the texture slot on the GPU.
//! - `uniforms` holds each program's uniform buffer.
//! - `state` implements `GraphicsBackend` on top of the above.

mod context;
mod pipeline;
mod state;
mod texture;
mod uniforms;

pub use state::{GpuProgram, WgpuBackend};
