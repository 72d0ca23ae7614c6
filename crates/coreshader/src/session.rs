//! One lab instance: buffers, the running program, the texture slot and the
//! frame loop, driven through a [`GraphicsBackend`] and a [`FrameScheduler`].
//!
//! `recompute` is the only way a new program reaches the screen. It either
//! replaces the running program and restarts the loop, or leaves both alone
//! and reports why.
use std::fmt;
use std::time::Instant;

use crate::compile::{compile, format_stage_failures, StageFailure};
use crate::descriptor::{parse_descriptor, BlendConfig, DefaultReason, DescriptorOutcome};
use crate::link::{link, LinkFailure, LinkedProgram};
use crate::normalize::{normalize, ShaderStage};
use crate::program::bridge;
use crate::render_loop::{surface_size, FrameScheduler, FrameTick, RenderLoop, MAX_PIXEL_RATIO};
use crate::source::{ImportReport, ImportedFile, SourceBuffers, SourceSet};
use crate::templates::{self, Template};
use crate::texture::{load_from_file, DecodeFuture, TextureError, TextureImage, TextureSlot};
use crate::uniforms::{UniformBinder, UniformBlock};

/// GPU side of a lab instance.
///
/// Programs are owned values: dropping one releases its GPU resources.
pub trait GraphicsBackend {
    type Program;
    type Error: fmt::Display;

    /// Builds a pipeline for a linked program. Errors are link failures.
    fn create_program(
        &mut self,
        program: &LinkedProgram,
        blend: Option<BlendConfig>,
    ) -> Result<Self::Program, Self::Error>;

    /// Replaces the texture slot contents.
    fn upload_texture(&mut self, image: &TextureImage) -> Result<(), Self::Error>;

    /// Sizes the drawing surface in physical pixels.
    fn resize(&mut self, size: (u32, u32));

    /// Clears the surface and draws the quad with `program`.
    fn draw(&mut self, program: &Self::Program, uniforms: &UniformBlock)
        -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeOutcome {
    /// A new program is running.
    Running,
    CompileFailed,
    LinkFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecomputeReport {
    pub outcome: RecomputeOutcome,
    pub descriptor: DescriptorOutcome,
    /// One-line status for the user.
    pub status: String,
    /// Compiler or linker diagnostics; empty on success.
    pub log: String,
}

impl RecomputeReport {
    pub fn is_running(&self) -> bool {
        self.outcome == RecomputeOutcome::Running
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareError {
    /// One or both stages failed; the log has a section per stage.
    Compile(String),
    Link(String),
}

impl PrepareError {
    pub fn outcome(&self) -> RecomputeOutcome {
        match self {
            PrepareError::Compile(_) => RecomputeOutcome::CompileFailed,
            PrepareError::Link(_) => RecomputeOutcome::LinkFailed,
        }
    }

    pub fn log(&self) -> &str {
        match self {
            PrepareError::Compile(log) | PrepareError::Link(log) => log,
        }
    }

    fn into_log(self) -> String {
        match self {
            PrepareError::Compile(log) | PrepareError::Link(log) => log,
        }
    }
}

/// The GPU-free half of a recompute.
#[derive(Debug)]
pub struct Prepared {
    pub descriptor: DescriptorOutcome,
    pub program: Result<LinkedProgram, PrepareError>,
}

/// Parses, normalizes, bridges, compiles and links a source triple.
pub fn prepare(sources: &SourceSet) -> Prepared {
    let descriptor = parse_descriptor(&sources.descriptor);
    let vertex = normalize(&sources.vertex, ShaderStage::Vertex);
    let fragment = normalize(&sources.fragment, ShaderStage::Fragment);
    let bridged = bridge(&vertex, &fragment);

    let program = match (
        compile(ShaderStage::Vertex, &bridged.vertex),
        compile(ShaderStage::Fragment, &bridged.fragment),
    ) {
        (Ok(vertex), Ok(fragment)) => link(vertex, fragment, bridged.interface)
            .map_err(|failure| PrepareError::Link(failure.section())),
        (vertex, fragment) => {
            let failures: Vec<StageFailure> =
                [vertex.err(), fragment.err()].into_iter().flatten().collect();
            Err(PrepareError::Compile(format_stage_failures(&failures)))
        }
    };

    Prepared {
        descriptor,
        program,
    }
}

struct ActiveProgram<P> {
    handle: P,
    binder: UniformBinder,
    block: UniformBlock,
}

pub struct ShaderLab<B: GraphicsBackend, S: FrameScheduler> {
    backend: B,
    scheduler: S,
    buffers: SourceBuffers,
    render_loop: RenderLoop,
    program: Option<ActiveProgram<B::Program>>,
    texture: TextureSlot,
    pending_decode: Option<DecodeFuture>,
    pending_upload: Option<(TextureImage, String)>,
    max_pixel_ratio: f64,
    status: String,
    log: String,
}

impl<B: GraphicsBackend, S: FrameScheduler> ShaderLab<B, S> {
    /// Creates an instance and uploads the white placeholder texture.
    pub fn new(mut backend: B, scheduler: S, sources: SourceSet) -> Result<Self, B::Error> {
        let texture = TextureSlot::default();
        backend.upload_texture(texture.image())?;
        Ok(Self {
            backend,
            scheduler,
            buffers: SourceBuffers::new(sources),
            render_loop: RenderLoop::new(),
            program: None,
            texture,
            pending_decode: None,
            pending_upload: None,
            max_pixel_ratio: MAX_PIXEL_RATIO,
            status: String::new(),
            log: String::new(),
        })
    }

    pub fn with_max_pixel_ratio(mut self, ratio: f64) -> Self {
        self.max_pixel_ratio = ratio;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn buffers(&self) -> &SourceBuffers {
        &self.buffers
    }

    pub fn buffers_mut(&mut self) -> &mut SourceBuffers {
        &mut self.buffers
    }

    pub fn texture(&self) -> &TextureSlot {
        &self.texture
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn log(&self) -> &str {
        &self.log
    }

    pub fn is_running(&self) -> bool {
        self.render_loop.is_running()
    }

    pub fn has_program(&self) -> bool {
        self.program.is_some()
    }

    /// Resets all three buffers to a bundled template.
    pub fn apply_template(&mut self, id: &str) -> &'static Template {
        let template = templates::resolve(id);
        if template.id != id {
            tracing::warn!(requested = id, fallback = template.id, "unknown template");
        }
        self.buffers.replace_all(template.sources());
        template
    }

    /// Routes shader files to the buffers and images to the texture loader.
    pub fn import_files(&mut self, files: Vec<ImportedFile>) -> ImportReport {
        let (images, sources): (Vec<_>, Vec<_>) = files.into_iter().partition(|file| {
            file.media_type
                .as_deref()
                .is_some_and(|media| media.starts_with("image/"))
        });
        let mut report = self.buffers.import_files(sources);
        for image in images {
            let name = image.name.clone();
            if self.load_image(image).is_err() {
                report.ignored.push(name);
            }
        }
        report
    }

    /// Starts decoding an image for the texture slot; it is applied by the
    /// next successful recompute.
    pub fn load_image(&mut self, file: ImportedFile) -> Result<(), TextureError> {
        match load_from_file(file) {
            Ok(future) => {
                self.status = format!("Loading texture {}", future.name());
                self.pending_decode = Some(future);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "rejected texture file");
                self.status = err.to_string();
                Err(err)
            }
        }
    }

    /// Reads the buffers, rebuilds the program and restarts the loop.
    ///
    /// On a compile or link failure the running program and loop are left
    /// untouched and the diagnostics are returned in the report.
    pub fn recompute(&mut self, now: Instant) -> RecomputeReport {
        let sources = self.buffers.snapshot();
        let mut notes = Vec::new();

        if let Some(decode) = self.pending_decode.take() {
            let name = decode.name().to_string();
            match decode.wait() {
                Ok(image) => self.pending_upload = Some((image, name)),
                Err(err) => {
                    tracing::warn!(error = %err, "texture decode failed; keeping previous texture");
                    notes.push(err.to_string());
                }
            }
        }

        let Prepared {
            descriptor,
            program,
        } = prepare(&sources);
        if let DescriptorOutcome::Defaulted(DefaultReason::Malformed(message)) = &descriptor {
            tracing::warn!(error = %message, "pipeline descriptor is malformed; using defaults");
            notes.push(format!("Pipeline JSON is malformed ({message}); using defaults."));
        }
        let linked = match program {
            Ok(linked) => linked,
            Err(err) => return self.fail(err.outcome(), descriptor, err.into_log(), notes),
        };

        let handle = match self.backend.create_program(&linked, descriptor.blend()) {
            Ok(handle) => handle,
            Err(err) => {
                let failure = LinkFailure::new(err.to_string());
                return self.fail(
                    RecomputeOutcome::LinkFailed,
                    descriptor,
                    failure.section(),
                    notes,
                );
            }
        };

        let binder = UniformBinder::new(&linked.interface);
        let mut block = UniformBlock::new(&linked.interface.uniforms);
        binder.apply_defaults(&mut block);
        binder.apply_descriptor(descriptor.uniforms(), &mut block);
        // The previous program is dropped here.
        self.program = Some(ActiveProgram {
            handle,
            binder,
            block,
        });

        if let Some((image, name)) = self.pending_upload.take() {
            match self.backend.upload_texture(&image) {
                Ok(()) => {
                    tracing::info!(texture = %name, width = image.width, height = image.height, "texture updated");
                    self.texture.replace(image, name);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "texture upload failed; keeping previous texture");
                    notes.push(format!("Texture upload failed: {err}"));
                }
            }
        }

        self.render_loop.start(now, &mut self.scheduler);

        let mut status = String::from("Compiled and running.");
        for note in &notes {
            status.push(' ');
            status.push_str(note);
        }
        tracing::info!(defaulted = descriptor.is_defaulted(), "program replaced");
        self.status = status.clone();
        self.log.clear();
        RecomputeReport {
            outcome: RecomputeOutcome::Running,
            descriptor,
            status,
            log: String::new(),
        }
    }

    fn fail(
        &mut self,
        outcome: RecomputeOutcome,
        descriptor: DescriptorOutcome,
        log: String,
        notes: Vec<String>,
    ) -> RecomputeReport {
        let mut status = match outcome {
            RecomputeOutcome::LinkFailed => String::from("Link failed; see log."),
            _ => String::from("Compile failed; see log."),
        };
        for note in &notes {
            status.push(' ');
            status.push_str(note);
        }
        tracing::warn!(?outcome, "recompute aborted; previous program kept");
        self.status = status.clone();
        self.log = log.clone();
        RecomputeReport {
            outcome,
            descriptor,
            status,
            log,
        }
    }

    /// Handles a delivered frame callback.
    ///
    /// `logical` is the displayed size and `pixel_ratio` the device scale
    /// factor. Returns the tick that was drawn, or `None` when nothing runs.
    pub fn frame(
        &mut self,
        now: Instant,
        logical: (f64, f64),
        pixel_ratio: f64,
    ) -> Result<Option<FrameTick>, B::Error> {
        let Some(tick) = self.render_loop.on_frame(now, &mut self.scheduler) else {
            return Ok(None);
        };
        let Some(program) = self.program.as_mut() else {
            return Ok(None);
        };
        let size = surface_size(logical, pixel_ratio, self.max_pixel_ratio);
        self.backend.resize(size);
        program
            .binder
            .update_frame(tick.seconds, size, &mut program.block);
        self.backend.draw(&program.handle, &program.block)?;
        program.block.mark_clean();
        Ok(Some(tick))
    }

    /// Stops the frame loop; the program stays loaded.
    pub fn stop(&mut self) {
        self.render_loop.stop(&mut self.scheduler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_loop::tests::RecordingScheduler;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Debug)]
    struct FakeProgram {
        id: u32,
        released: Rc<RefCell<Vec<u32>>>,
    }

    impl Drop for FakeProgram {
        fn drop(&mut self) {
            self.released.borrow_mut().push(self.id);
        }
    }

    #[derive(Debug, Default)]
    struct FakeBackend {
        next_id: u32,
        released: Rc<RefCell<Vec<u32>>>,
        blends: Vec<Option<BlendConfig>>,
        uploads: Vec<(u32, u32)>,
        sizes: Vec<(u32, u32)>,
        draws: Vec<(u32, Vec<u8>)>,
        fail_create: Option<String>,
    }

    impl GraphicsBackend for FakeBackend {
        type Program = FakeProgram;
        type Error = String;

        fn create_program(
            &mut self,
            _program: &LinkedProgram,
            blend: Option<BlendConfig>,
        ) -> Result<FakeProgram, String> {
            if let Some(message) = &self.fail_create {
                return Err(message.clone());
            }
            self.next_id += 1;
            self.blends.push(blend);
            Ok(FakeProgram {
                id: self.next_id,
                released: Rc::clone(&self.released),
            })
        }

        fn upload_texture(&mut self, image: &TextureImage) -> Result<(), String> {
            self.uploads.push((image.width, image.height));
            Ok(())
        }

        fn resize(&mut self, size: (u32, u32)) {
            self.sizes.push(size);
        }

        fn draw(&mut self, program: &FakeProgram, uniforms: &UniformBlock) -> Result<(), String> {
            self.draws.push((program.id, uniforms.as_bytes().to_vec()));
            Ok(())
        }
    }

    const DESCRIPTOR: &str = r#"{"blend":{"func":"add","srcfactor":"src_alpha","dstfactor":"one_minus_src_alpha"},"uniforms":[{"name":"GameTime","type":"float","count":1,"values":[0.0]}]}"#;

    const FRAGMENT: &str = "#version 150
uniform float GameTime;
in vec2 texCoord0;
in vec4 vertexColor;
out vec4 fragColor;
void main() {
    fragColor = vec4(fract(GameTime), texCoord0, 1.0) * vertexColor;
}";

    fn lab(descriptor: &str) -> ShaderLab<FakeBackend, RecordingScheduler> {
        let vertex = templates::resolve("black_hole").vertex();
        ShaderLab::new(
            FakeBackend::default(),
            RecordingScheduler::default(),
            SourceSet::new(vertex, FRAGMENT, descriptor),
        )
        .expect("lab")
    }

    #[test]
    fn game_time_example_runs_without_diagnostics() {
        let mut lab = lab(DESCRIPTOR);
        let report = lab.recompute(Instant::now());
        assert_eq!(report.outcome, RecomputeOutcome::Running, "{}", report.log);
        assert!(report.log.is_empty());
        assert!(!report.descriptor.is_defaulted());
        assert!(lab.is_running());
        assert_eq!(lab.scheduler().live.len(), 1);
        assert_eq!(lab.backend().blends, vec![Some(BlendConfig::default())]);
    }

    #[test]
    fn broken_fragment_keeps_the_previous_loop() {
        let mut lab = lab(DESCRIPTOR);
        assert!(lab.recompute(Instant::now()).is_running());
        let live_before = lab.scheduler().live.clone();

        lab.buffers_mut()
            .set_active_buffer(crate::source::SourceKind::Fragment, "void main() { oops }");
        let report = lab.recompute(Instant::now());

        assert_eq!(report.outcome, RecomputeOutcome::CompileFailed);
        assert!(report.log.contains("[Fragment Shader]"));
        assert!(!report.log.contains("[Vertex Shader]"));
        assert_eq!(lab.log(), report.log);
        assert_eq!(lab.scheduler().live, live_before);
        assert!(lab.scheduler().cancelled.is_empty());
        assert!(lab.backend().released.borrow().is_empty());
        assert!(lab.has_program());
    }

    #[test]
    fn missing_semicolon_fails_the_fragment_stage() {
        let mut lab = lab(DESCRIPTOR);
        assert!(lab.recompute(Instant::now()).is_running());

        let broken = FRAGMENT.replace("* vertexColor;", "* vertexColor");
        lab.buffers_mut()
            .set_active_buffer(crate::source::SourceKind::Fragment, broken);
        let report = lab.recompute(Instant::now());

        assert_eq!(report.outcome, RecomputeOutcome::CompileFailed);
        assert!(report.log.starts_with("[Fragment Shader]\nERROR: "), "{}", report.log);
        assert!(lab.is_running());
    }

    #[test]
    fn compile_errors_report_buffer_line_numbers() {
        let fragment = FRAGMENT.replace("fract(GameTime)", "fract(Missing)");
        let prepared = prepare(&SourceSet::new(
            templates::resolve("black_hole").vertex(),
            fragment,
            DESCRIPTOR,
        ));
        let Err(error) = &prepared.program else {
            panic!("unknown identifiers must not compile");
        };
        assert!(error.log().contains("ERROR: 0:7:"), "{}", error.log());
        assert!(error.log().contains("fract(Missing)"));
    }

    fn prepare_fragment(fragment: &str) -> Prepared {
        prepare(&SourceSet::new(
            templates::resolve("black_hole").vertex(),
            fragment,
            DESCRIPTOR,
        ))
    }

    #[test]
    fn uniform_names_can_be_shadowed() {
        let prepared = prepare_fragment(
            "#version 150
uniform float GameTime;
in vec2 texCoord0;
in vec4 vertexColor;
out vec4 fragColor;
float wave(float GameTime) {
    return sin(GameTime);
}
void main() {
    fragColor = vec4(wave(GameTime), texCoord0, 1.0) * vertexColor;
}",
        );
        if let Err(error) = &prepared.program {
            panic!("{}", error.log());
        }
    }

    #[test]
    fn uniforms_sharing_a_line_or_split_across_lines_compile() {
        for declarations in [
            "uniform float GameTime; uniform vec4 ColorModulator;",
            "uniform float GameTime;\nuniform vec4\n    ColorModulator;",
        ] {
            let fragment = format!(
                "#version 150
{declarations}
in vec2 texCoord0;
in vec4 vertexColor;
out vec4 fragColor;
void main() {{
    fragColor = vec4(fract(GameTime), texCoord0, 1.0) * vertexColor * ColorModulator;
}}"
            );
            let prepared = prepare_fragment(&fragment);
            match &prepared.program {
                Ok(linked) => {
                    assert!(linked.interface.uniforms.member("ColorModulator").is_some());
                    assert!(linked.interface.uniforms.member("GameTime").is_some());
                }
                Err(error) => panic!("{declarations}: {}", error.log()),
            }
        }
    }

    #[test]
    fn position_declared_as_vec4_still_reads_the_quad() {
        let vertex = "#version 150
in vec4 Position;
in vec2 UV0;
in vec4 Color;
uniform mat4 ModelViewMat;
uniform mat4 ProjMat;
out vec2 texCoord0;
out vec4 vertexColor;
void main() {
    gl_Position = ProjMat * ModelViewMat * Position;
    texCoord0 = UV0;
    vertexColor = Color;
}";
        let prepared = prepare(&SourceSet::new(vertex, FRAGMENT, DESCRIPTOR));
        let linked = match &prepared.program {
            Ok(linked) => linked,
            Err(error) => panic!("{}", error.log()),
        };
        let position = linked
            .interface
            .attributes
            .iter()
            .find(|binding| binding.attribute == crate::program::QuadAttribute::Position)
            .expect("position is fetched from the quad");
        assert_eq!(position.components, 3);
    }

    #[test]
    fn repeated_recompute_leaves_one_loop_and_releases_old_programs() {
        let mut lab = lab(DESCRIPTOR);
        for _ in 0..3 {
            assert!(lab.recompute(Instant::now()).is_running());
        }
        assert_eq!(lab.scheduler().live.len(), 1);
        assert_eq!(lab.scheduler().cancelled.len(), 2);
        assert_eq!(*lab.backend().released.borrow(), vec![1, 2]);
    }

    #[test]
    fn malformed_descriptor_renders_with_defaults() {
        let mut lab = lab("{ not json");
        let report = lab.recompute(Instant::now());
        assert!(report.is_running());
        assert!(matches!(
            report.descriptor,
            DescriptorOutcome::Defaulted(DefaultReason::Malformed(_))
        ));
        assert!(report.status.contains("malformed"));
        assert_eq!(lab.backend().blends, vec![Some(BlendConfig::default())]);
    }

    #[test]
    fn descriptor_without_blend_disables_blending() {
        let mut lab = lab(r#"{"uniforms":[]}"#);
        assert!(lab.recompute(Instant::now()).is_running());
        assert_eq!(lab.backend().blends, vec![None]);
    }

    #[test]
    fn backend_pipeline_errors_are_link_failures() {
        let mut lab = lab(DESCRIPTOR);
        lab.backend_mut().fail_create = Some("pipeline rejected".to_string());
        let report = lab.recompute(Instant::now());
        assert_eq!(report.outcome, RecomputeOutcome::LinkFailed);
        assert_eq!(report.log, "[Link]\npipeline rejected");
        assert!(!lab.is_running());
    }

    #[test]
    fn unmatched_varying_is_a_link_failure() {
        let mut lab = lab(DESCRIPTOR);
        lab.buffers_mut().set_active_buffer(
            crate::source::SourceKind::Fragment,
            FRAGMENT.replace("texCoord0", "texCoord9"),
        );
        let report = lab.recompute(Instant::now());
        assert_eq!(report.outcome, RecomputeOutcome::LinkFailed);
        assert!(report.log.starts_with("[Link]\n"));
        assert!(report.log.contains("texCoord9"));
    }

    #[test]
    fn frames_refresh_game_time_and_surface_size() {
        let mut lab = lab(DESCRIPTOR);
        let start = Instant::now();
        assert!(lab.recompute(start).is_running());
        lab.scheduler_mut().fire();

        let tick = lab
            .frame(start + Duration::from_secs(2), (320.0, 200.0), 2.0)
            .expect("draw")
            .expect("running");
        assert_eq!(tick.frame, 0);
        assert_eq!(lab.backend().sizes, vec![(640, 400)]);
        assert_eq!(lab.scheduler().live.len(), 1);

        let (program, bytes) = &lab.backend().draws[0];
        assert_eq!(*program, 1);
        // GameTime follows the two mat4s of the shared vertex shader.
        let words: &[f32] = bytemuck::cast_slice(bytes);
        assert!((words[32] - 2.0).abs() < 1e-3);
    }

    #[test]
    fn frames_after_stop_draw_nothing() {
        let mut lab = lab(DESCRIPTOR);
        lab.recompute(Instant::now());
        lab.stop();
        assert!(lab
            .frame(Instant::now(), (10.0, 10.0), 1.0)
            .expect("no error")
            .is_none());
        assert!(lab.backend().draws.is_empty());
    }

    fn png() -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("png");
        bytes
    }

    #[test]
    fn imported_image_is_uploaded_by_the_next_recompute() {
        let mut lab = lab(DESCRIPTOR);
        let report = lab.import_files(vec![
            ImportedFile::new("tex.png", png()),
            ImportedFile::new("new.fsh", FRAGMENT.as_bytes().to_vec()),
        ]);
        assert_eq!(report.applied.len(), 1);
        assert!(lab.recompute(Instant::now()).is_running());
        assert_eq!(lab.backend().uploads, vec![(1, 1), (3, 2)]);
        assert_eq!(lab.texture().source(), Some("tex.png"));
    }

    #[test]
    fn broken_image_keeps_the_previous_texture() {
        let mut lab = lab(DESCRIPTOR);
        lab.load_image(ImportedFile::new("bad.png", vec![0, 1, 2]))
            .expect("accepted for decoding");
        let report = lab.recompute(Instant::now());
        assert!(report.is_running());
        assert!(report.status.contains("bad.png"));
        assert_eq!(lab.backend().uploads, vec![(1, 1)]);
        assert_eq!(lab.texture().image(), &TextureImage::white());
    }

    #[test]
    fn non_image_files_are_rejected_by_the_loader() {
        let mut lab = lab(DESCRIPTOR);
        let file = ImportedFile::new("tex.bin", vec![1]).with_media_type("application/octet-stream");
        assert!(lab.load_image(file).is_err());
        assert!(!lab.status().is_empty());
    }

    #[test]
    fn template_reset_shows_the_fragment_buffer() {
        let mut lab = lab(DESCRIPTOR);
        lab.buffers_mut().switch_to(crate::source::SourceKind::Pipeline);
        let template = lab.apply_template("missing");
        assert_eq!(template.id, "black_hole");
        assert_eq!(lab.buffers().active_kind(), crate::source::SourceKind::Fragment);
        assert_eq!(lab.buffers().active_buffer(), template.fragment());
        assert!(lab.recompute(Instant::now()).is_running());
    }
}
