use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use coreshader::templates;

pub fn list() {
    println!("Bundled templates:");
    for template in templates::all() {
        let marker = if template.id == templates::DEFAULT_TEMPLATE {
            " (default)"
        } else {
            ""
        };
        println!("  {:<12} {}{marker}", template.id, template.label);
    }
}

/// Writes the template's three files into `dir` and returns their paths.
pub fn write(id: &str, dir: &Path, force: bool) -> Result<Vec<PathBuf>> {
    let Some(template) = templates::find(id) else {
        bail!("unknown template '{id}' (see `shaderlab template list`)");
    };
    let sources = template.sources();

    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let targets: Vec<(PathBuf, &str)> = template
        .file_names()
        .iter()
        .map(|(kind, name)| (dir.join(name), sources.get(*kind)))
        .collect();
    if !force {
        if let Some((existing, _)) = targets.iter().find(|(path, _)| path.exists()) {
            bail!(
                "{} already exists; pass --force to overwrite",
                existing.display()
            );
        }
    }

    let mut written = Vec::with_capacity(targets.len());
    for (path, contents) in targets {
        fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), "wrote template file");
        written.push(path);
    }
    Ok(written)
}
