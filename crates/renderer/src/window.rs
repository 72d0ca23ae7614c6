use std::mem;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use coreshader::{templates, FrameRequest, FrameScheduler, RecomputeReport, ShaderLab};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::keyboard::{Key, ModifiersState, NamedKey};
use winit::window::{Window, WindowBuilder};

use tracing::{error, info, warn};

use crate::files::{read_imported_file, read_imported_files};
use crate::gpu::WgpuBackend;
use crate::types::PreviewConfig;

/// Bookkeeping for redraw-driven frame requests.
///
/// winit cannot take back a redraw it already queued, so a cancelled request
/// is forgotten here and the redraw that still arrives is ignored.
#[derive(Debug, Default)]
pub(crate) struct RedrawLedger {
    next: u64,
    live: Option<FrameRequest>,
}

impl RedrawLedger {
    fn issue(&mut self) -> FrameRequest {
        self.next += 1;
        let request = FrameRequest(self.next);
        self.live = Some(request);
        request
    }

    fn cancel(&mut self, request: FrameRequest) {
        if self.live == Some(request) {
            self.live = None;
        }
    }

    /// Consumes the outstanding request, if any.
    fn take(&mut self) -> Option<FrameRequest> {
        self.live.take()
    }
}

/// [`FrameScheduler`] that turns frame requests into window redraws.
pub(crate) struct WinitScheduler {
    window: Arc<Window>,
    ledger: RedrawLedger,
}

impl WinitScheduler {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            ledger: RedrawLedger::default(),
        }
    }
}

impl FrameScheduler for WinitScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        let request = self.ledger.issue();
        self.window.request_redraw();
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        self.ledger.cancel(request);
    }
}

type PreviewLab = ShaderLab<WgpuBackend, WinitScheduler>;

/// Lab instance plus the window-side input state.
///
/// `lab` owns the surface and is declared first so it drops before the
/// window it draws into.
struct PreviewState {
    lab: PreviewLab,
    window: Arc<Window>,
    config: PreviewConfig,
    template_index: usize,
    modifiers: ModifiersState,
    dropped: Vec<PathBuf>,
}

impl PreviewState {
    fn new(window: Arc<Window>, config: PreviewConfig) -> Result<Self> {
        let size = window.inner_size();
        let backend = WgpuBackend::new(window.as_ref(), (size.width, size.height), &config)?;
        let template = templates::resolve(&config.template);
        let template_index = templates::all()
            .iter()
            .position(|candidate| candidate.id == template.id)
            .unwrap_or(0);
        let lab = ShaderLab::new(
            backend,
            WinitScheduler::new(window.clone()),
            template.sources(),
        )?
        .with_max_pixel_ratio(config.max_pixel_ratio);

        Ok(Self {
            lab,
            window,
            config,
            template_index,
            modifiers: ModifiersState::empty(),
            dropped: Vec::new(),
        })
    }

    /// Re-reads the configured files and image, then recomputes.
    fn reload(&mut self) {
        let files = read_imported_files(self.config.files.iter().map(PathBuf::as_path));
        if !files.is_empty() {
            let report = self.lab.import_files(files);
            for name in &report.ignored {
                warn!(file = %name, "ignored file with unknown extension");
            }
        }
        if let Some(path) = self.config.image.clone() {
            match read_imported_file(&path) {
                Ok(file) => {
                    // The rejection is already logged and shown as status.
                    let _ = self.lab.load_image(file);
                }
                Err(err) => warn!(error = %err, "failed to read texture image"),
            }
        }
        self.recompute();
    }

    /// Resets every buffer to the current template.
    fn reset_template(&mut self) {
        let template = templates::all()[self.template_index];
        self.lab.apply_template(template.id);
        info!(template = template.id, "template applied");
        self.recompute();
    }

    fn next_template(&mut self) {
        self.template_index = (self.template_index + 1) % templates::all().len();
        self.reset_template();
    }

    fn import_dropped(&mut self) {
        if self.dropped.is_empty() {
            return;
        }
        let paths = mem::take(&mut self.dropped);
        let files = read_imported_files(paths.iter().map(PathBuf::as_path));
        let report = self.lab.import_files(files);
        for (kind, name) in &report.applied {
            info!(file = %name, ?kind, "imported dropped file");
        }
        for name in &report.ignored {
            warn!(file = %name, "ignored dropped file");
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        let report = self.lab.recompute(Instant::now());
        log_report(&report);
        self.window
            .set_title(&format!("{} - {}", self.config.title, report.status));
    }

    fn redraw(&mut self) -> Result<()> {
        if self.lab.scheduler_mut().ledger.take().is_none() {
            return Ok(());
        }
        let scale = self.window.scale_factor();
        let logical: LogicalSize<f64> = self.window.inner_size().to_logical(scale);
        self.lab
            .frame(Instant::now(), (logical.width, logical.height), scale)?;
        Ok(())
    }

    fn handle_key(&mut self, event: &KeyEvent) -> bool {
        if event.state != ElementState::Pressed || event.repeat {
            return false;
        }
        let control = self.modifiers.control_key() || self.modifiers.super_key();
        match &event.logical_key {
            Key::Named(NamedKey::Escape) => return true,
            Key::Named(NamedKey::F5) => self.reload(),
            Key::Named(NamedKey::Enter) if control => self.reload(),
            Key::Character(value) if control && value.eq_ignore_ascii_case("r") => {
                self.reset_template()
            }
            Key::Character(value) if control && value.eq_ignore_ascii_case("t") => {
                self.next_template()
            }
            _ => {}
        }
        false
    }
}

fn log_report(report: &RecomputeReport) {
    if report.is_running() {
        info!(status = %report.status, "recompute finished");
    } else {
        error!(outcome = ?report.outcome, "{}\n{}", report.status, report.log);
    }
}

/// Opens the preview window and runs until it is closed.
pub(crate) fn run(config: PreviewConfig) -> Result<()> {
    let event_loop = EventLoopBuilder::new()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let (width, height) = config.window_size;
    let window = WindowBuilder::new()
        .with_title(&config.title)
        .with_inner_size(LogicalSize::new(width, height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let mut state = PreviewState::new(window, config)?;
    info!(
        adapter = %state.lab.backend().adapter_profile().name,
        "preview window ready (Ctrl+Enter/F5 reload, Ctrl+R reset, Ctrl+T next template)"
    );
    state.reload();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == state.window.id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        elwt.exit();
                    }
                    WindowEvent::ModifiersChanged(modifiers) => {
                        state.modifiers = modifiers.state();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if state.handle_key(&event) {
                            elwt.exit();
                        }
                    }
                    WindowEvent::DroppedFile(path) => {
                        state.dropped.push(path);
                    }
                    WindowEvent::RedrawRequested => {
                        if let Err(err) = state.redraw() {
                            error!("frame failed: {err:?}");
                            elwt.exit();
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                state.import_dropped();
                elwt.set_control_flow(ControlFlow::Wait);
            }
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_requests_are_not_delivered() {
        let mut ledger = RedrawLedger::default();
        let first = ledger.issue();
        ledger.cancel(first);
        assert_eq!(ledger.take(), None);
    }

    #[test]
    fn stale_cancels_leave_the_newer_request() {
        let mut ledger = RedrawLedger::default();
        let first = ledger.issue();
        let second = ledger.issue();
        ledger.cancel(first);
        assert_eq!(ledger.take(), Some(second));
        assert_eq!(ledger.take(), None);
    }
}
