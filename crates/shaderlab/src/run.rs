use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::check::check_sources;
use crate::cli::{CheckArgs, PreviewArgs};
use crate::paths::AppPaths;
use crate::settings::Settings;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_settings(paths: &AppPaths) -> Result<Settings> {
    let settings = Settings::load_or_default(&paths.settings_file())?;
    tracing::debug!(?settings, "settings loaded");
    Ok(settings)
}

pub fn preview(args: PreviewArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let settings = load_settings(&paths)?;
    let config = settings
        .preview_config(&args)
        .context("invalid preview options")?;
    renderer::run_preview(config)
}

/// Runs the GPU-free pipeline; `Ok(false)` means compile or link failed.
pub fn check(args: CheckArgs) -> Result<bool> {
    let template = match args.template {
        Some(template) => template,
        None => {
            let paths = AppPaths::discover()?;
            load_settings(&paths)?.template
        }
    };
    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        files.push(renderer::read_imported_file(path)?);
    }

    let report = check_sources(&template, files, args.emit);
    print!("{}", report.text);
    Ok(report.ok)
}

pub fn describe_paths() -> Result<()> {
    let paths = AppPaths::discover()?;
    let settings_file = paths.settings_file();
    println!("Configuration directories:");
    println!("  config:     {}", paths.config_dir().display());
    println!(
        "  settings:   {}{}",
        settings_file.display(),
        if settings_file.exists() { "" } else { " (not created)" }
    );
    Ok(())
}
