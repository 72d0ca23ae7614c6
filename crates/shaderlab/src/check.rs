use std::fmt::Write as _;

use coreshader::templates;
use coreshader::{
    bridge, normalize, prepare, DefaultReason, DescriptorOutcome, ImportedFile, ShaderStage,
    SourceBuffers,
};

/// Result of a GPU-free compile and link.
#[derive(Debug)]
pub struct CheckReport {
    pub ok: bool,
    pub text: String,
}

/// Loads `template_id`, applies the imported files and runs everything a
/// recompute does short of creating the GPU pipeline.
pub fn check_sources(template_id: &str, files: Vec<ImportedFile>, emit: bool) -> CheckReport {
    let template = templates::resolve(template_id);
    let mut buffers = SourceBuffers::new(template.sources());
    let imported = buffers.import_files(files);
    let sources = buffers.snapshot();

    let mut text = String::new();
    let _ = writeln!(text, "template: {}", template.id);
    for (kind, name) in &imported.applied {
        let _ = writeln!(text, "imported: {name} -> {kind:?}");
    }
    for name in &imported.ignored {
        let _ = writeln!(text, "ignored:  {name}");
    }

    let prepared = prepare(&sources);
    match &prepared.descriptor {
        DescriptorOutcome::Parsed(_) => {
            let _ = writeln!(
                text,
                "pipeline: parsed ({} uniforms, blend {})",
                prepared.descriptor.uniforms().len(),
                if prepared.descriptor.blend().is_some() {
                    "on"
                } else {
                    "off"
                }
            );
        }
        DescriptorOutcome::Defaulted(DefaultReason::Missing) => {
            let _ = writeln!(text, "pipeline: empty, using defaults");
        }
        DescriptorOutcome::Defaulted(DefaultReason::Malformed(message)) => {
            let _ = writeln!(text, "pipeline: malformed ({message}), using defaults");
        }
    }

    let ok = match &prepared.program {
        Ok(linked) => {
            let interface = &linked.interface;
            let _ = writeln!(
                text,
                "OK: linked ({} uniform bytes, {} attributes, {} varyings, texture {})",
                interface.uniforms.size(),
                interface.attributes.len(),
                interface.varyings.len(),
                if interface.uses_texture() { "used" } else { "unused" }
            );
            for member in interface.uniforms.members() {
                let _ = writeln!(
                    text,
                    "  uniform {:<16} {:<6} offset {}",
                    member.name, member.ty, member.offset
                );
            }
            true
        }
        Err(err) => {
            let _ = writeln!(text, "FAILED: {:?}", err.outcome());
            let _ = writeln!(text, "{}", err.log());
            false
        }
    };

    if emit {
        let bridged = bridge(
            &normalize(&sources.vertex, ShaderStage::Vertex),
            &normalize(&sources.fragment, ShaderStage::Fragment),
        );
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            let _ = writeln!(text, "--- {} ---", stage.label());
            let _ = writeln!(text, "{}", bridged.source(stage));
        }
    }

    CheckReport { ok, text }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_templates_pass() {
        for template in templates::all() {
            let report = check_sources(template.id, Vec::new(), false);
            assert!(report.ok, "{}: {}", template.id, report.text);
            assert!(report.text.contains("pipeline: parsed"));
        }
    }

    #[test]
    fn broken_fragment_fails_with_a_stage_log() {
        let files = vec![ImportedFile::new(
            "broken.fsh",
            b"#version 150\nout vec4 fragColor;\nvoid main() { fragColor = nope; }\n".to_vec(),
        )];
        let report = check_sources("plasma", files, false);
        assert!(!report.ok);
        assert!(report.text.contains("imported: broken.fsh"));
        assert!(report.text.contains("[Fragment Shader]"));
    }

    #[test]
    fn malformed_descriptor_is_reported_but_not_fatal() {
        let files = vec![ImportedFile::new("pass.json", b"{ not json".to_vec())];
        let report = check_sources("black_hole", files, true);
        assert!(report.ok, "{}", report.text);
        assert!(report.text.contains("pipeline: malformed"));
        assert!(report.text.contains("--- Vertex Shader ---"));
    }
}
