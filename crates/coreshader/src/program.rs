//! Cross-stage interface: merges what the scanner found in both stages into
//! one explicit layout and rewrites each stage against it.
//!
//! The rewritten stages declare:
//!
//! - `layout(std140, set = 0, binding = 0) uniform LabUniforms { ... };`
//!   holding every loose uniform of both stages. The block has no instance
//!   name, so members keep the user's names; members only the other stage
//!   declares are given a private `lab_` name.
//! - `layout(set = 1, binding = 0/1)` texture and sampler objects standing in
//!   for every `sampler2D`.
//! - explicit locations for vertex attributes and varyings.
//!
//! Rewrites never add or remove lines below the prelude, so the `#line`
//! reset emitted by `normalize` keeps diagnostics on the user's numbering.
use std::collections::{HashMap, HashSet};
use std::ops::Range;

use crate::interface::{self, Declaration, GlslType, StageInterface, StorageKind};
use crate::normalize::ShaderStage;

pub const UNIFORM_BLOCK_NAME: &str = "LabUniforms";
pub const TEXTURE_NAME: &str = "lab_texture0";
pub const SAMPLER_NAME: &str = "lab_sampler0";
pub const UNIFORM_GROUP: u32 = 0;
pub const TEXTURE_GROUP: u32 = 1;

/// Interleaved quad vertex: position (3), color (4), uv (2).
pub const QUAD_VERTEX_FLOATS: usize = 9;

pub const QUAD_VERTICES: [[f32; QUAD_VERTEX_FLOATS]; 4] = [
    [-1.0, -1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0],
    [1.0, -1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0],
    [1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
];

/// Vertex attributes the quad buffer provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuadAttribute {
    Position,
    Color,
    Uv0,
}

impl QuadAttribute {
    pub const ALL: [QuadAttribute; 3] = [Self::Position, Self::Color, Self::Uv0];

    pub fn name(self) -> &'static str {
        match self {
            Self::Position => "Position",
            Self::Color => "Color",
            Self::Uv0 => "UV0",
        }
    }

    pub fn location(self) -> u32 {
        match self {
            Self::Position => 0,
            Self::Color => 1,
            Self::Uv0 => 2,
        }
    }

    /// Components stored per vertex.
    pub fn components(self) -> usize {
        match self {
            Self::Position => 3,
            Self::Color => 4,
            Self::Uv0 => 2,
        }
    }

    /// Byte offset inside one interleaved vertex.
    pub fn offset(self) -> u64 {
        match self {
            Self::Position => 0,
            Self::Color => 3 * 4,
            Self::Uv0 => 7 * 4,
        }
    }

    /// Name the buffer input is bound under when the shader declares it
    /// wider than the buffer provides.
    pub fn private_name(self) -> String {
        format!("lab_{}", self.name())
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attribute| attribute.name() == name)
    }
}

/// Components GL supplies for attributes the buffer does not fill.
const GL_ATTRIBUTE_DEFAULT: [&str; 4] = ["0.0", "0.0", "0.0", "1.0"];

/// A vertex input the shader actually reads from the quad buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeBinding {
    pub attribute: QuadAttribute,
    /// Components fetched per vertex; never more than the buffer provides.
    pub components: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformMember {
    pub name: String,
    pub ty: GlslType,
    pub array_len: Option<u32>,
    pub offset: u32,
}

impl UniformMember {
    /// Byte distance between array elements (std140).
    pub fn stride(&self) -> u32 {
        let (_, size) = self.ty.std140();
        align_up(size, 16)
    }
}

/// std140 layout of the merged uniform block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformLayout {
    members: Vec<UniformMember>,
    size: u32,
}

impl UniformLayout {
    pub fn members(&self) -> &[UniformMember] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&UniformMember> {
        self.members.iter().find(|member| member.name == name)
    }

    /// Block size in bytes, rounded to 16.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn push(&mut self, name: &str, ty: GlslType, array_len: Option<u32>) {
        let (align, size) = ty.std140();
        let (align, span) = match array_len {
            Some(len) => {
                let stride = align_up(size, 16);
                (align.max(16), stride * len)
            }
            None => (align, size),
        };
        let offset = align_up(self.size, align);
        self.members.push(UniformMember {
            name: name.to_string(),
            ty,
            array_len,
            offset,
        });
        self.size = offset + span;
    }

    fn finish(&mut self) {
        self.size = align_up(self.size, 16);
    }

    /// Block declaration for one stage. Members the stage does not declare
    /// itself are renamed so they cannot collide with the stage's own names.
    fn declaration(&self, declared: &HashSet<&str>) -> Option<String> {
        if self.members.is_empty() {
            return None;
        }
        let mut body = String::new();
        for member in &self.members {
            body.push(' ');
            body.push_str(member.ty.name());
            body.push(' ');
            if !declared.contains(member.name.as_str()) {
                body.push_str("lab_");
            }
            body.push_str(&member.name);
            if let Some(len) = member.array_len {
                body.push_str(&format!("[{len}]"));
            }
            body.push(';');
        }
        Some(format!(
            "layout(std140, set = {UNIFORM_GROUP}, binding = 0) uniform {UNIFORM_BLOCK_NAME} {{{body} }};"
        ))
    }
}

fn align_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Varying {
    pub name: String,
    pub type_name: String,
    pub location: u32,
}

/// Everything the backend and the uniform binder need to know about a
/// linked program's resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramInterface {
    pub uniforms: UniformLayout,
    pub attributes: Vec<AttributeBinding>,
    pub varyings: Vec<Varying>,
    /// User names aliased to the texture slot.
    pub samplers: Vec<String>,
    /// Interface mismatches reported at link time.
    pub conflicts: Vec<String>,
}

impl ProgramInterface {
    pub fn uses_texture(&self) -> bool {
        !self.samplers.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgedSources {
    pub vertex: String,
    pub fragment: String,
    pub interface: ProgramInterface,
}

impl BridgedSources {
    pub fn source(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }
}

/// Rewrites two normalized stages against a shared explicit interface.
///
/// Mismatches never stop the rewrite; they are collected in
/// [`ProgramInterface::conflicts`] so each stage still compiles on its own and
/// the link step reports them.
pub fn bridge(vertex: &str, fragment: &str) -> BridgedSources {
    let mut vertex_iface = interface::scan(vertex);
    interface::resolve_varyings(&mut vertex_iface, false);
    let mut fragment_iface = interface::scan(fragment);
    interface::resolve_varyings(&mut fragment_iface, true);

    let mut program = ProgramInterface::default();
    let mut uniform_types: HashMap<String, (GlslType, Option<u32>)> = HashMap::new();
    for (stage, iface) in [
        (ShaderStage::Vertex, &vertex_iface),
        (ShaderStage::Fragment, &fragment_iface),
    ] {
        for decl in iface.uniforms() {
            let Some(ty) = decl.glsl_type() else {
                continue;
            };
            for declared in &decl.names {
                let shape = (ty, declared.array_len);
                match uniform_types.get(&declared.name) {
                    Some(existing) if *existing != shape => {
                        program.conflicts.push(format!(
                            "uniform `{}` is declared as {} but as {} in the {} stage",
                            declared.name,
                            describe(existing.0, existing.1),
                            describe(ty, declared.array_len),
                            stage
                        ));
                    }
                    Some(_) => {}
                    None => {
                        uniform_types.insert(declared.name.clone(), shape);
                        program.uniforms.push(&declared.name, ty, declared.array_len);
                    }
                }
            }
        }
        for decl in iface.samplers() {
            for declared in &decl.names {
                if !program.samplers.contains(&declared.name) {
                    program.samplers.push(declared.name.clone());
                }
            }
        }
    }
    program.uniforms.finish();

    let mut vertex_edits = Edits::default();
    let mut fragment_edits = Edits::default();
    bridge_common(&vertex_iface, &program, &mut vertex_edits);
    bridge_common(&fragment_iface, &program, &mut fragment_edits);

    let mut attribute_defines = Vec::new();
    for decl in vertex_iface.inputs() {
        let statement = bridge_vertex_input(decl, &mut program.attributes, &mut attribute_defines);
        vertex_edits.replace(decl.span.clone(), statement);
    }

    let mut next_location = 0;
    for decl in vertex_iface.outputs() {
        let mut statements = Vec::new();
        for declared in &decl.names {
            program.varyings.push(Varying {
                name: declared.name.clone(),
                type_name: decl.type_name.clone(),
                location: next_location,
            });
            statements.push(located(decl, next_location, &declared.name, declared.array_len));
            next_location += 1;
        }
        vertex_edits.replace(decl.span.clone(), statements.join(" "));
    }

    let mut spare_location = next_location;
    for decl in fragment_iface.inputs() {
        let mut statements = Vec::new();
        for declared in &decl.names {
            let location = match program
                .varyings
                .iter()
                .find(|varying| varying.name == declared.name)
            {
                Some(varying) => {
                    if varying.type_name != decl.type_name {
                        program.conflicts.push(format!(
                            "varying `{}` is written as {} but read as {}",
                            declared.name, varying.type_name, decl.type_name
                        ));
                    }
                    varying.location
                }
                None => {
                    program.conflicts.push(format!(
                        "fragment input `{}` is not written by the vertex stage",
                        declared.name
                    ));
                    let location = spare_location;
                    spare_location += 1;
                    location
                }
            };
            statements.push(located(decl, location, &declared.name, declared.array_len));
        }
        fragment_edits.replace(decl.span.clone(), statements.join(" "));
    }

    let mut target = 0;
    for decl in fragment_iface.outputs() {
        let mut statements = Vec::new();
        for declared in &decl.names {
            statements.push(located(decl, target, &declared.name, declared.array_len));
            target += 1;
        }
        fragment_edits.replace(decl.span.clone(), statements.join(" "));
    }

    let prelude_vertex = prelude(&program, &vertex_iface, &attribute_defines);
    let prelude_fragment = prelude(&program, &fragment_iface, &[]);

    BridgedSources {
        vertex: vertex_edits.apply(vertex, &prelude_vertex),
        fragment: fragment_edits.apply(fragment, &prelude_fragment),
        interface: program,
    }
}

fn describe(ty: GlslType, array_len: Option<u32>) -> String {
    match array_len {
        Some(len) => format!("{ty}[{len}]"),
        None => ty.to_string(),
    }
}

/// Removes loose uniform and sampler declarations; the prelude declares
/// their replacements.
fn bridge_common(iface: &StageInterface, program: &ProgramInterface, edits: &mut Edits) {
    for decl in iface.uniforms() {
        let merged = decl
            .names
            .iter()
            .all(|declared| program.uniforms.member(&declared.name).is_some());
        if decl.glsl_type().is_some() && merged {
            edits.replace(decl.span.clone(), String::new());
        }
    }
    for decl in iface.samplers() {
        edits.replace(decl.span.clone(), String::new());
    }
}

fn bridge_vertex_input(
    decl: &Declaration,
    attributes: &mut Vec<AttributeBinding>,
    defines: &mut Vec<String>,
) -> String {
    let ty = decl.glsl_type();
    let mut statements = Vec::new();
    for declared in &decl.names {
        let attribute = QuadAttribute::from_name(&declared.name);
        let components = ty.and_then(GlslType::float_components);
        match (attribute, components, declared.array_len) {
            (Some(attribute), Some(components), None) if components <= attribute.components() => {
                attributes.push(AttributeBinding {
                    attribute,
                    components,
                });
                statements.push(located(
                    decl,
                    attribute.location(),
                    &declared.name,
                    None,
                ));
            }
            (Some(attribute), Some(components), None) => {
                // Wider than the buffer: fetch what exists and fill the rest
                // the way GL does.
                let provided = attribute.components();
                attributes.push(AttributeBinding {
                    attribute,
                    components: provided,
                });
                let fetched = GlslType::float_vector(provided).unwrap_or(GlslType::Vec4);
                let declared_ty = GlslType::float_vector(components).unwrap_or(GlslType::Vec4);
                statements.push(format!(
                    "layout(location = {}) in {} {};",
                    attribute.location(),
                    fetched.name(),
                    attribute.private_name()
                ));
                defines.push(format!(
                    "#define {} {}({}, {})",
                    declared.name,
                    declared_ty.name(),
                    attribute.private_name(),
                    GL_ATTRIBUTE_DEFAULT[provided..components].join(", ")
                ));
            }
            (_, _, None) => {
                let Some(ty) = ty else {
                    // Unknown types are left for the compiler to report.
                    return format!(
                        "in {} {};",
                        decl.type_name,
                        decl.names
                            .iter()
                            .map(|name| name.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                };
                tracing::debug!(input = %declared.name, "vertex input has no attribute; using zero");
                statements.push(format!(
                    "const {} {} = {};",
                    ty.name(),
                    declared.name,
                    ty.zero_literal()
                ));
            }
            (_, _, Some(len)) => {
                statements.push(format!(
                    "{} {}[{len}];",
                    decl.type_name, declared.name
                ));
            }
        }
    }
    statements.join(" ")
}

const PRECISION: [&str; 3] = ["lowp", "mediump", "highp"];

fn located(decl: &Declaration, location: u32, name: &str, array_len: Option<u32>) -> String {
    let storage = match decl.storage {
        StorageKind::In => "in",
        StorageKind::Out => "out",
        StorageKind::Uniform => "uniform",
    };
    let (precision, interpolation): (Vec<&String>, Vec<&String>) = decl
        .qualifiers
        .iter()
        .partition(|qualifier| PRECISION.contains(&qualifier.as_str()));
    let mut statement = format!("layout(location = {location}) ");
    for qualifier in interpolation {
        statement.push_str(qualifier);
        statement.push(' ');
    }
    statement.push_str(storage);
    statement.push(' ');
    for qualifier in precision {
        statement.push_str(qualifier);
        statement.push(' ');
    }
    statement.push_str(&decl.type_name);
    statement.push(' ');
    statement.push_str(name);
    if let Some(len) = array_len {
        statement.push_str(&format!("[{len}]"));
    }
    statement.push(';');
    statement
}

/// Declarations inserted after the version directive of one stage.
fn prelude(program: &ProgramInterface, iface: &StageInterface, defines: &[String]) -> String {
    let mut lines = Vec::new();
    let declared: HashSet<&str> = iface
        .uniforms()
        .flat_map(|decl| decl.names.iter().map(|declared| declared.name.as_str()))
        .collect();
    if let Some(block) = program.uniforms.declaration(&declared) {
        lines.push(block);
    }
    let samplers: Vec<&str> = iface
        .samplers()
        .flat_map(|decl| decl.names.iter().map(|declared| declared.name.as_str()))
        .collect();
    if !samplers.is_empty() {
        lines.push(format!(
            "layout(set = {TEXTURE_GROUP}, binding = 0) uniform texture2D {TEXTURE_NAME}; layout(set = {TEXTURE_GROUP}, binding = 1) uniform sampler {SAMPLER_NAME};"
        ));
        for name in samplers {
            lines.push(format!(
                "#define {name} sampler2D({TEXTURE_NAME}, {SAMPLER_NAME})"
            ));
        }
    }
    lines.extend(defines.iter().cloned());
    lines.join("\n")
}

/// Statement replacements keyed by byte span.
#[derive(Default)]
struct Edits {
    spans: Vec<(Range<usize>, String)>,
}

impl Edits {
    fn replace(&mut self, span: Range<usize>, text: String) {
        self.spans.push((span, text));
    }

    /// Applies the replacements and inserts `prelude` after the version line.
    /// Each replacement keeps the newlines of the text it replaces.
    fn apply(mut self, source: &str, prelude: &str) -> String {
        self.spans.sort_by_key(|(span, _)| span.start);
        let mut out = String::with_capacity(source.len() + prelude.len() + 1);
        let mut cursor = 0;
        for (span, text) in &self.spans {
            out.push_str(&source[cursor..span.start]);
            out.push_str(text);
            for _ in source[span.clone()].matches('\n') {
                out.push('\n');
            }
            cursor = span.end;
        }
        out.push_str(&source[cursor..]);

        if prelude.is_empty() {
            return out;
        }
        match out.find('\n') {
            Some(end) => {
                out.insert_str(end + 1, &format!("{prelude}\n"));
                out
            }
            None => format!("{out}\n{prelude}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize, ShaderStage};

    const VSH: &str = "#version 150
in vec3 Position;
in vec4 Color;
in vec2 UV0;
in ivec2 UV2;
uniform mat4 ModelViewMat;
uniform mat4 ProjMat;
out vec2 texCoord0;
out vec4 vertexColor;
void main() {
    gl_Position = ProjMat * ModelViewMat * vec4(Position, 1.0);
    texCoord0 = UV0;
    vertexColor = Color;
}";

    const FSH: &str = "#version 150
uniform sampler2D Sampler0;
uniform float GameTime;
uniform vec4 ColorModulator;
in vec4 vertexColor;
in vec2 texCoord0;
out vec4 fragColor;
void main() {
    fragColor = texture(Sampler0, texCoord0) * vertexColor * ColorModulator * GameTime;
}";

    fn bridged(vsh: &str, fsh: &str) -> BridgedSources {
        bridge(
            &normalize(vsh, ShaderStage::Vertex),
            &normalize(fsh, ShaderStage::Fragment),
        )
    }

    #[test]
    fn merges_uniforms_in_first_seen_order() {
        let out = bridged(VSH, FSH);
        let names: Vec<&str> = out
            .interface
            .uniforms
            .members()
            .iter()
            .map(|member| member.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["ModelViewMat", "ProjMat", "GameTime", "ColorModulator"]
        );
        let offsets: Vec<u32> = out
            .interface
            .uniforms
            .members()
            .iter()
            .map(|member| member.offset)
            .collect();
        assert_eq!(offsets, vec![0, 64, 128, 144]);
        assert_eq!(out.interface.uniforms.size(), 160);
        assert!(out.interface.conflicts.is_empty());
    }

    #[test]
    fn both_stages_share_the_block_layout() {
        let out = bridged(VSH, FSH);
        let block_line = |text: &str| {
            text.lines()
                .find(|line| line.contains(UNIFORM_BLOCK_NAME))
                .map(|line| line.replace("lab_", ""))
        };
        assert!(block_line(&out.vertex).is_some());
        assert_eq!(block_line(&out.vertex), block_line(&out.fragment));
        // Each stage sees its own uniforms under their own names.
        assert!(out.fragment.contains(" float GameTime;"));
        assert!(out.fragment.contains(" mat4 lab_ProjMat;"));
        assert!(out.vertex.contains(" float lab_GameTime;"));
        assert!(!out.fragment.contains("uniform float GameTime;"));
        assert!(!out.fragment.contains("#define GameTime"));
    }

    #[test]
    fn rewrites_keep_the_user_line_count() {
        let fsh = "#version 150\nuniform float GameTime; uniform vec4\n    ColorModulator;\nuniform sampler2D Sampler0;\nin vec2 texCoord0;\nout vec4 fragColor;\nvoid main() {\n    fragColor = texture(Sampler0, texCoord0) * ColorModulator * GameTime;\n}";
        let out = bridged(VSH, fsh);
        let user_lines: Vec<&str> = out
            .fragment
            .lines()
            .skip_while(|line| *line != crate::normalize::LINE_RESET)
            .skip(1)
            .collect();
        assert_eq!(user_lines.len(), fsh.lines().count());
        assert_eq!(
            user_lines[7],
            "    fragColor = texture(Sampler0, texCoord0) * ColorModulator * GameTime;"
        );
        assert_eq!(user_lines[1].trim(), "");
        assert_eq!(out.interface.uniforms.members().len(), 4);
    }

    #[test]
    fn wide_attributes_are_padded_like_gl() {
        let vsh = VSH
            .replace("in vec3 Position;", "in vec4 Position;")
            .replace("in vec2 UV0;", "in vec4 UV0;")
            .replace("vec4(Position, 1.0)", "Position");
        let out = bridged(&vsh, FSH);
        assert!(out.vertex.contains("layout(location = 0) in vec3 lab_Position;"));
        assert!(out.vertex.contains("#define Position vec4(lab_Position, 1.0)"));
        assert!(out.vertex.contains("#define UV0 vec4(lab_UV0, 0.0, 1.0)"));
        assert!(!out.vertex.contains("const vec4 Position"));
        let position = out
            .interface
            .attributes
            .iter()
            .find(|binding| binding.attribute == QuadAttribute::Position)
            .expect("position is bound");
        assert_eq!(position.components, 3);
    }

    #[test]
    fn assigns_attribute_and_varying_locations() {
        let out = bridged(VSH, FSH);
        assert!(out.vertex.contains("layout(location = 0) in vec3 Position;"));
        assert!(out.vertex.contains("layout(location = 2) in vec2 UV0;"));
        assert!(out.vertex.contains("const ivec2 UV2 = ivec2(0);"));
        assert!(out.vertex.contains("layout(location = 1) out vec4 vertexColor;"));
        // Declared in a different order on the fragment side.
        assert!(out.fragment.contains("layout(location = 1) in vec4 vertexColor;"));
        assert!(out.fragment.contains("layout(location = 0) in vec2 texCoord0;"));
        assert!(out.fragment.contains("layout(location = 0) out vec4 fragColor;"));
        assert_eq!(out.interface.attributes.len(), 3);
    }

    #[test]
    fn samplers_alias_the_texture_slot() {
        let out = bridged(VSH, FSH);
        assert!(out
            .fragment
            .contains("#define Sampler0 sampler2D(lab_texture0, lab_sampler0)"));
        assert!(out.fragment.contains("uniform texture2D lab_texture0;"));
        assert!(!out.vertex.contains("lab_texture0"));
        assert_eq!(out.interface.samplers, vec!["Sampler0".to_string()]);
    }

    #[test]
    fn unmatched_fragment_input_is_a_conflict() {
        let fsh = FSH.replace("in vec2 texCoord0;", "in vec2 texCoord1;");
        let out = bridged(VSH, &fsh);
        assert_eq!(out.interface.conflicts.len(), 1);
        assert!(out.interface.conflicts[0].contains("texCoord1"));
    }

    #[test]
    fn uniform_type_mismatch_is_a_conflict() {
        let fsh = FSH.replace("uniform float GameTime;", "uniform mat4 ProjMat;\nuniform float GameTime;");
        let fsh = fsh.replace("uniform mat4 ProjMat;", "uniform vec4 ProjMat;");
        let out = bridged(VSH, &fsh);
        assert!(out
            .interface
            .conflicts
            .iter()
            .any(|conflict| conflict.contains("ProjMat")));
    }

    #[test]
    fn std140_arrays_use_sixteen_byte_stride() {
        let mut layout = UniformLayout::default();
        layout.push("A", GlslType::Float, None);
        layout.push("B", GlslType::Float, Some(3));
        layout.push("C", GlslType::Vec3, None);
        layout.finish();
        assert_eq!(layout.member("B").map(|member| member.offset), Some(16));
        assert_eq!(layout.member("C").map(|member| member.offset), Some(64));
        assert_eq!(layout.size(), 80);
    }
}
