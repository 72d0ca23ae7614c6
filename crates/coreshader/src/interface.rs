//! Top-level declaration scanning for normalized GLSL.
//!
//! User shaders are written against the legacy GL interface: loose uniforms,
//! combined samplers, and varyings matched by name. The scanner records those
//! declarations (with their byte spans) so `bridge` can rewrite them into
//! explicit locations and bindings.
use std::fmt;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlslType {
    Float,
    Int,
    Uint,
    Vec2,
    Vec3,
    Vec4,
    IVec2,
    IVec3,
    IVec4,
    UVec2,
    UVec3,
    UVec4,
    Mat2,
    Mat3,
    Mat4,
}

impl GlslType {
    pub fn from_name(name: &str) -> Option<Self> {
        let ty = match name {
            "float" => Self::Float,
            "int" => Self::Int,
            "uint" => Self::Uint,
            "vec2" => Self::Vec2,
            "vec3" => Self::Vec3,
            "vec4" => Self::Vec4,
            "ivec2" => Self::IVec2,
            "ivec3" => Self::IVec3,
            "ivec4" => Self::IVec4,
            "uvec2" => Self::UVec2,
            "uvec3" => Self::UVec3,
            "uvec4" => Self::UVec4,
            "mat2" | "mat2x2" => Self::Mat2,
            "mat3" | "mat3x3" => Self::Mat3,
            "mat4" | "mat4x4" => Self::Mat4,
            _ => return None,
        };
        Some(ty)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::IVec2 => "ivec2",
            Self::IVec3 => "ivec3",
            Self::IVec4 => "ivec4",
            Self::UVec2 => "uvec2",
            Self::UVec3 => "uvec3",
            Self::UVec4 => "uvec4",
            Self::Mat2 => "mat2",
            Self::Mat3 => "mat3",
            Self::Mat4 => "mat4",
        }
    }

    /// Number of scalar components when the type is float based.
    pub fn float_components(self) -> Option<usize> {
        match self {
            Self::Float => Some(1),
            Self::Vec2 => Some(2),
            Self::Vec3 => Some(3),
            Self::Vec4 => Some(4),
            _ => None,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int
                | Self::Uint
                | Self::IVec2
                | Self::IVec3
                | Self::IVec4
                | Self::UVec2
                | Self::UVec3
                | Self::UVec4
        )
    }

    /// std140 (alignment, size) in bytes.
    pub fn std140(self) -> (u32, u32) {
        match self {
            Self::Float | Self::Int | Self::Uint => (4, 4),
            Self::Vec2 | Self::IVec2 | Self::UVec2 => (8, 8),
            Self::Vec3 | Self::IVec3 | Self::UVec3 => (16, 12),
            Self::Vec4 | Self::IVec4 | Self::UVec4 => (16, 16),
            Self::Mat2 => (16, 32),
            Self::Mat3 => (16, 48),
            Self::Mat4 => (16, 64),
        }
    }

    /// `float`, `vec2`, `vec3` or `vec4` for 1 to 4 components.
    pub fn float_vector(components: usize) -> Option<Self> {
        match components {
            1 => Some(Self::Float),
            2 => Some(Self::Vec2),
            3 => Some(Self::Vec3),
            4 => Some(Self::Vec4),
            _ => None,
        }
    }

    /// Zero value expression used when a vertex input has no attribute.
    pub fn zero_literal(self) -> String {
        match self {
            Self::Float => "0.0".to_string(),
            Self::Int => "0".to_string(),
            Self::Uint => "0u".to_string(),
            other => format!("{}(0)", other.name()),
        }
    }
}

impl fmt::Display for GlslType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Uniform,
    In,
    Out,
}

/// One scanned top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Zero-based line index of the first token.
    pub line: usize,
    /// Bytes of the statement in the scanned source, `;` included.
    pub span: Range<usize>,
    pub storage: StorageKind,
    /// Interpolation qualifiers (`flat`, `smooth`, ...) to carry over.
    pub qualifiers: Vec<String>,
    pub type_name: String,
    pub names: Vec<DeclaredName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredName {
    pub name: String,
    pub array_len: Option<u32>,
}

impl Declaration {
    pub fn glsl_type(&self) -> Option<GlslType> {
        GlslType::from_name(&self.type_name)
    }

    pub fn is_sampler(&self) -> bool {
        self.storage == StorageKind::Uniform && self.type_name == "sampler2D"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageInterface {
    pub declarations: Vec<Declaration>,
}

impl StageInterface {
    pub fn uniforms(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations
            .iter()
            .filter(|decl| decl.storage == StorageKind::Uniform && !decl.is_sampler())
    }

    pub fn samplers(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter().filter(|decl| decl.is_sampler())
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations
            .iter()
            .filter(|decl| decl.storage == StorageKind::In)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations
            .iter()
            .filter(|decl| decl.storage == StorageKind::Out)
    }
}

const INTERPOLATION: [&str; 7] = [
    "flat",
    "smooth",
    "noperspective",
    "centroid",
    "lowp",
    "mediump",
    "highp",
];

/// Records top-level `uniform` / `in` / `out` declarations.
///
/// Statements are split on `;` outside of any brace scope, so several
/// declarations may share a line and one may span lines. Comments and
/// preprocessor lines are ignored; declarations that already carry a
/// `layout(...)` qualifier are left alone.
pub fn scan(source: &str) -> StageInterface {
    let masked = mask(source);
    let mut declarations = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;

    for (index, &byte) in masked.iter().enumerate() {
        if depth == 0 && start.is_none() && !byte.is_ascii_whitespace() && byte != b';' {
            start = Some(index);
        }
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                // Function bodies and blocks end the statement.
                if depth == 0 {
                    start = None;
                }
            }
            b';' if depth == 0 => {
                let Some(begin) = start.take() else {
                    continue;
                };
                let Ok(body) = std::str::from_utf8(&masked[begin..index]) else {
                    continue;
                };
                let line = masked[..begin].iter().filter(|byte| **byte == b'\n').count();
                if let Some(decl) = parse_declaration(line, begin..index + 1, body) {
                    declarations.push(decl);
                }
            }
            _ => {}
        }
    }

    StageInterface { declarations }
}

/// Copy of `source` with comments and preprocessor lines blanked to spaces.
/// Newlines and byte offsets are unchanged.
fn mask(source: &str) -> Vec<u8> {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mut index = 0;
    let mut line_start = true;

    while index < bytes.len() {
        let byte = bytes[index];
        let next = bytes.get(index + 1).copied();
        if byte == b'/' && next == Some(b'/') {
            while index < bytes.len() && bytes[index] != b'\n' {
                out[index] = b' ';
                index += 1;
            }
            continue;
        }
        if byte == b'/' && next == Some(b'*') {
            let end = source[index + 2..]
                .find("*/")
                .map_or(bytes.len(), |offset| index + 2 + offset + 2);
            for slot in &mut out[index..end] {
                if *slot != b'\n' {
                    *slot = b' ';
                }
            }
            index = end;
            continue;
        }
        if line_start && byte == b'#' {
            while index < bytes.len() {
                if bytes[index] == b'\n' {
                    if index > 0 && bytes[index - 1] == b'\\' {
                        index += 1;
                        continue;
                    }
                    break;
                }
                out[index] = b' ';
                index += 1;
            }
            continue;
        }
        if byte == b'\n' {
            line_start = true;
        } else if !byte.is_ascii_whitespace() {
            line_start = false;
        }
        index += 1;
    }
    out
}

fn parse_declaration(line: usize, span: Range<usize>, body: &str) -> Option<Declaration> {
    let body = body.trim();
    if body.contains(['(', '{', '}', '=']) {
        return None;
    }

    let mut tokens: Vec<&str> = body.split_whitespace().collect();
    let mut qualifiers = Vec::new();
    while let Some(first) = tokens.first() {
        if INTERPOLATION.contains(first) {
            qualifiers.push(first.to_string());
            tokens.remove(0);
        } else {
            break;
        }
    }

    let storage = match tokens.first().copied()? {
        "uniform" => StorageKind::Uniform,
        "in" | "attribute" => StorageKind::In,
        "out" => StorageKind::Out,
        "varying" => {
            // The stage decides whether a varying is an input or an output;
            // it is recorded as an output and flipped by `resolve_varyings`.
            qualifiers.push("varying".to_string());
            StorageKind::Out
        }
        _ => return None,
    };
    tokens.remove(0);
    // Precision qualifiers may also follow the storage qualifier.
    while let Some(first) = tokens.first() {
        if INTERPOLATION.contains(first) {
            qualifiers.push(first.to_string());
            tokens.remove(0);
        } else {
            break;
        }
    }

    let (type_name, names) = parse_type_and_names(&tokens)?;
    Some(Declaration {
        line,
        span,
        storage,
        qualifiers,
        type_name,
        names,
    })
}

fn parse_type_and_names(tokens: &[&str]) -> Option<(String, Vec<DeclaredName>)> {
    let (type_name, rest) = tokens.split_first()?;
    let joined = rest.join(" ");
    if joined.is_empty() {
        return None;
    }
    let mut names = Vec::new();
    for part in joined.split(',') {
        let part = part.trim();
        let (name, array_len) = match part.split_once('[') {
            Some((name, len)) => {
                let len = len.trim().strip_suffix(']')?.trim().parse::<u32>().ok()?;
                (name.trim(), Some(len))
            }
            None => (part, None),
        };
        if !is_identifier(name) {
            return None;
        }
        names.push(DeclaredName {
            name: name.to_string(),
            array_len,
        });
    }
    Some((type_name.to_string(), names))
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Applies stage semantics to legacy `varying` declarations.
pub(crate) fn resolve_varyings(interface: &mut StageInterface, fragment: bool) {
    for decl in &mut interface.declarations {
        if let Some(pos) = decl.qualifiers.iter().position(|q| q == "varying") {
            decl.qualifiers.remove(pos);
            if fragment {
                decl.storage = StorageKind::In;
            }
        }
    }
}
