//! GPU-free core of the shader lab.
//!
//! A recompute runs the user's three buffers through:
//!
//! 1. [`descriptor::parse_descriptor`] for blend state and initial uniforms.
//! 2. [`normalize::normalize`] to retarget the GLSL version.
//! 3. [`program::bridge`] to give loose uniforms, samplers and varyings the
//!    explicit bindings a modern API needs.
//! 4. [`compile::compile`] and [`link::link`] through the naga GLSL frontend.
//! 5. A [`session::GraphicsBackend`] that turns the linked program into a
//!    pipeline, plus the [`uniforms::UniformBinder`] feeding it.
//!
//! [`session::ShaderLab`] ties the steps together with the buffers, the
//! texture slot and the [`render_loop::RenderLoop`].
pub mod compile;
pub mod descriptor;
pub mod interface;
pub mod link;
pub mod normalize;
pub mod program;
pub mod render_loop;
pub mod session;
pub mod source;
pub mod templates;
pub mod texture;
pub mod uniforms;

pub use compile::{compile, CompiledStage, StageFailure};
pub use descriptor::{
    parse_descriptor, BlendConfig, BlendEquation, BlendFactor, DefaultReason, DescriptorOutcome,
    PipelineDescriptor, UniformDecl, UniformKind,
};
pub use link::{link, LinkFailure, LinkedProgram};
pub use normalize::{normalize, ShaderStage, TARGET_VERSION};
pub use program::{bridge, BridgedSources, ProgramInterface, QuadAttribute};
pub use render_loop::{surface_size, FrameRequest, FrameScheduler, FrameTick, RenderLoop};
pub use session::{
    prepare, GraphicsBackend, PrepareError, Prepared, RecomputeOutcome, RecomputeReport, ShaderLab,
};
pub use source::{ImportReport, ImportedFile, SourceBuffers, SourceKind, SourceSet};
pub use templates::{Template, DEFAULT_TEMPLATE};
pub use texture::{load_from_file, DecodeFuture, TextureError, TextureImage, TextureSlot};
pub use uniforms::{UniformBinder, UniformBlock, WellKnownUniform};
