use std::error::Error;
use std::fmt;

use naga::front::glsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::normalize::ShaderStage;

/// A stage that parsed and validated.
#[derive(Debug, Clone)]
pub struct CompiledStage {
    pub stage: ShaderStage,
    /// The bridged GLSL handed to the GPU backend.
    pub source: String,
    pub module: naga::Module,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: ShaderStage,
    pub log: String,
}

impl StageFailure {
    /// `[Vertex Shader]` / `[Fragment Shader]` section for the diagnostic log.
    pub fn section(&self) -> String {
        format!("[{}]\n{}", self.stage.label(), self.log.trim_end())
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.section())
    }
}

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

/// Parses and validates one bridged stage with the naga GLSL frontend.
///
/// Diagnostics use the GL info-log shape (`ERROR: 0:<line>:<column>: ...`)
/// with line numbers taken through the source's `#line` directives.
pub fn compile(stage: ShaderStage, source: &str) -> Result<CompiledStage, StageFailure> {
    let lines = LineMap::new(source);
    let mut frontend = glsl::Frontend::default();
    let options = glsl::Options::from(naga_stage(stage));
    let module = frontend.parse(&options, source).map_err(|errors| StageFailure {
        stage,
        log: errors
            .errors
            .iter()
            .map(|error| render(&error.kind.to_string(), error.meta, source, &lines))
            .collect(),
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|error| {
            let mut message = error.to_string();
            let mut cause = Error::source(&error);
            while let Some(inner) = cause {
                message.push_str(": ");
                message.push_str(&inner.to_string());
                cause = inner.source();
            }
            let span = error
                .spans()
                .map(|(span, _)| *span)
                .next()
                .unwrap_or_default();
            StageFailure {
                stage,
                log: render(&message, span, source, &lines),
            }
        })?;

    tracing::debug!(%stage, "stage compiled");
    Ok(CompiledStage {
        stage,
        source: source.to_string(),
        module,
    })
}

/// Line numbering as declared by `#line` directives.
struct LineMap {
    /// (1-based line of the directive, number it gives the next line)
    resets: Vec<(u32, u32)>,
}

impl LineMap {
    fn new(source: &str) -> Self {
        let resets = source
            .split('\n')
            .enumerate()
            .filter_map(|(index, line)| {
                let rest = line.trim_start().strip_prefix('#')?.trim_start();
                let number = rest.strip_prefix("line")?;
                if !number.starts_with(char::is_whitespace) {
                    return None;
                }
                let number = number.split_whitespace().next()?.parse::<u32>().ok()?;
                Some((index as u32 + 1, number))
            })
            .collect();
        Self { resets }
    }

    fn number(&self, line: u32) -> u32 {
        match self.resets.iter().rev().find(|(at, _)| *at < line) {
            Some((at, first)) => first + (line - at - 1),
            None => line,
        }
    }
}

fn render(message: &str, span: naga::Span, source: &str, lines: &LineMap) -> String {
    if !span.is_defined() || span.to_range().is_some_and(|range| range.end > source.len()) {
        return format!("ERROR: {message}\n");
    }
    let location = span.location(source);
    let text = source
        .split('\n')
        .nth(location.line_number as usize - 1)
        .unwrap_or_default();
    format!(
        "ERROR: 0:{}:{}: {message}\n    {}\n",
        lines.number(location.line_number),
        location.line_position,
        text.trim()
    )
}

/// Joins stage failures into the text shown in the log pane.
pub fn format_stage_failures(failures: &[StageFailure]) -> String {
    failures
        .iter()
        .map(StageFailure::section)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_minimal_fragment() {
        let source = "#version 450\nlayout(location = 0) out vec4 color;\nvoid main() { color = vec4(1.0); }";
        let compiled = compile(ShaderStage::Fragment, source).expect("compiles");
        assert_eq!(compiled.module.entry_points.len(), 1);
    }

    #[test]
    fn syntax_errors_produce_a_log() {
        let source = "#version 450\nvoid main() { this is not glsl }";
        let failure = compile(ShaderStage::Vertex, source).expect_err("fails");
        assert_eq!(failure.stage, ShaderStage::Vertex);
        assert!(!failure.log.trim().is_empty());
        assert!(failure.section().starts_with("[Vertex Shader]\n"));
    }

    #[test]
    fn diagnostics_follow_line_directives() {
        let source = "#version 450\nprecision highp float;\n#line 1\nlayout(location = 0) out vec4 color;\n\nvoid main() {\n    color = vec4(missing);\n}";
        let failure = compile(ShaderStage::Fragment, source).expect_err("fails");
        assert!(failure.log.starts_with("ERROR: 0:4:"), "{}", failure.log);
        assert!(failure.log.contains("color = vec4(missing);"));
    }

    #[test]
    fn line_map_without_directives_is_identity() {
        let lines = LineMap::new("#version 450\nvoid main() {}");
        assert_eq!(lines.number(2), 2);
        let lines = LineMap::new("#version 450\n#line 10\na\nb\n#line 1\nc");
        assert_eq!(lines.number(3), 10);
        assert_eq!(lines.number(4), 11);
        assert_eq!(lines.number(6), 1);
        assert_eq!(LineMap::new("#lineup 3").resets, Vec::new());
    }

    #[test]
    fn failures_are_separated_by_blank_lines() {
        let failures = [
            StageFailure {
                stage: ShaderStage::Vertex,
                log: "bad vertex\n".to_string(),
            },
            StageFailure {
                stage: ShaderStage::Fragment,
                log: "bad fragment".to_string(),
            },
        ];
        assert_eq!(
            format_stage_failures(&failures),
            "[Vertex Shader]\nbad vertex\n\n[Fragment Shader]\nbad fragment"
        );
    }
}
