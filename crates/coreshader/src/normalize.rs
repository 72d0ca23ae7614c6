use std::fmt;

/// Version directive every stage is rewritten to before compilation.
pub const TARGET_VERSION: &str = "#version 450";

/// Renumbers the following line as line 1 of the user's buffer.
pub const LINE_RESET: &str = "#line 1";

const DEFAULT_PRECISION: [&str; 2] = ["precision highp float;", "precision highp int;"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn label(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "Vertex Shader",
            ShaderStage::Fragment => "Fragment Shader",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Rewrites user GLSL so it targets [`TARGET_VERSION`].
///
/// The output opens with the target directive (plus default precision
/// declarations for fragment sources without a float precision statement),
/// then [`LINE_RESET`] and the user's lines. Version directives inside the
/// user's lines are blanked in place, so line `n` after the reset is line `n`
/// of the buffer.
pub fn normalize(source: &str, stage: ShaderStage) -> String {
    let unified = source.replace("\r\n", "\n");
    let mut body: Vec<&str> = Vec::new();
    let mut has_precision = false;

    for line in unified.split('\n') {
        if is_version_directive(line) {
            body.push("");
            continue;
        }
        has_precision |= is_float_precision(line);
        body.push(line);
    }

    let mut lines = vec![TARGET_VERSION];
    if stage == ShaderStage::Fragment && !has_precision {
        lines.extend(DEFAULT_PRECISION);
    }
    lines.push(LINE_RESET);
    lines.extend(body);
    lines.join("\n")
}

pub(crate) fn is_version_directive(line: &str) -> bool {
    line.trim_start()
        .strip_prefix('#')
        .map(|rest| rest.trim_start().starts_with("version"))
        .unwrap_or(false)
}

fn is_float_precision(line: &str) -> bool {
    let statement = line.trim().trim_end_matches(';');
    let mut tokens = statement.split_whitespace();
    matches!(
        (tokens.next(), tokens.next(), tokens.next(), tokens.next()),
        (Some("precision"), Some("lowp" | "mediump" | "highp"), Some("float"), None)
    ) && line.trim_end().ends_with(';')
}
