//! Pipeline descriptor JSON: blend state and initial uniform values.
//!
//! Parsing never fails. A blank document or a broken one yields
//! [`DescriptorOutcome::Defaulted`] with the reason attached, so callers can
//! tell "no pipeline" apart from "broken pipeline" while still rendering.
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendEquation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

impl BlendEquation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "add" => Some(Self::Add),
            "subtract" => Some(Self::Subtract),
            "reverse_subtract" => Some(Self::ReverseSubtract),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

impl BlendFactor {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "zero" => Some(Self::Zero),
            "one" => Some(Self::One),
            "src_color" => Some(Self::SrcColor),
            "one_minus_src_color" => Some(Self::OneMinusSrcColor),
            "dst_color" => Some(Self::DstColor),
            "one_minus_dst_color" => Some(Self::OneMinusDstColor),
            "src_alpha" => Some(Self::SrcAlpha),
            "one_minus_src_alpha" => Some(Self::OneMinusSrcAlpha),
            "dst_alpha" => Some(Self::DstAlpha),
            "one_minus_dst_alpha" => Some(Self::OneMinusDstAlpha),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendConfig {
    pub func: BlendEquation,
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
}

impl Default for BlendConfig {
    /// Straight alpha blending.
    fn default() -> Self {
        Self {
            func: BlendEquation::Add,
            src_factor: BlendFactor::SrcAlpha,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Matrix4x4,
}

impl UniformKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "float" => Some(Self::Float),
            "matrix4x4" => Some(Self::Matrix4x4),
            _ => None,
        }
    }

    fn accepts_count(self, count: usize) -> bool {
        match self {
            UniformKind::Float => (1..=4).contains(&count),
            UniformKind::Matrix4x4 => count == 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformDecl {
    pub name: String,
    pub kind: UniformKind,
    pub count: usize,
    pub values: Vec<f32>,
}

impl UniformDecl {
    pub fn float(name: impl Into<String>, values: &[f32]) -> Self {
        Self {
            name: name.into(),
            kind: UniformKind::Float,
            count: values.len(),
            values: values.to_vec(),
        }
    }

    pub fn matrix(name: impl Into<String>, values: [f32; 16]) -> Self {
        Self {
            name: name.into(),
            kind: UniformKind::Matrix4x4,
            count: 16,
            values: values.to_vec(),
        }
    }

    /// The first `count` values; construction guarantees there are enough.
    pub fn active_values(&self) -> &[f32] {
        &self.values[..self.count]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineDescriptor {
    pub blend: Option<BlendConfig>,
    pub uniforms: Vec<UniformDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultReason {
    /// The descriptor buffer was empty.
    Missing,
    /// The descriptor text was not a JSON object.
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorOutcome {
    Parsed(PipelineDescriptor),
    Defaulted(DefaultReason),
}

impl DescriptorOutcome {
    pub fn descriptor(&self) -> Option<&PipelineDescriptor> {
        match self {
            DescriptorOutcome::Parsed(descriptor) => Some(descriptor),
            DescriptorOutcome::Defaulted(_) => None,
        }
    }

    /// Blend state to configure: defaulted pipelines blend, parsed ones only
    /// when they declare a `blend` object.
    pub fn blend(&self) -> Option<BlendConfig> {
        match self {
            DescriptorOutcome::Parsed(descriptor) => descriptor.blend,
            DescriptorOutcome::Defaulted(_) => Some(BlendConfig::default()),
        }
    }

    /// Uniform values declared by the descriptor, if any was parsed.
    pub fn uniforms(&self) -> &[UniformDecl] {
        self.descriptor()
            .map(|descriptor| descriptor.uniforms.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, DescriptorOutcome::Defaulted(_))
    }
}

pub const IDENTITY_MATRIX: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Uniform values applied to every program before descriptor values.
pub fn default_uniforms() -> Vec<UniformDecl> {
    vec![
        UniformDecl::matrix("ModelViewMat", IDENTITY_MATRIX),
        UniformDecl::matrix("ProjMat", IDENTITY_MATRIX),
        UniformDecl::float("ColorModulator", &[1.0, 1.0, 1.0, 1.0]),
    ]
}

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    blend: Option<RawBlend>,
    #[serde(default)]
    uniforms: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RawBlend {
    #[serde(default)]
    func: Option<String>,
    #[serde(default, alias = "srcFactor", alias = "src_factor")]
    srcfactor: Option<String>,
    #[serde(default, alias = "dstFactor", alias = "dst_factor")]
    dstfactor: Option<String>,
}

pub fn parse_descriptor(text: &str) -> DescriptorOutcome {
    if text.trim().is_empty() {
        return DescriptorOutcome::Defaulted(DefaultReason::Missing);
    }

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(error = %err, "pipeline descriptor is not valid JSON");
            return DescriptorOutcome::Defaulted(DefaultReason::Malformed(err.to_string()));
        }
    };
    if !value.is_object() {
        return DescriptorOutcome::Defaulted(DefaultReason::Malformed(
            "pipeline descriptor must be a JSON object".to_string(),
        ));
    }
    let raw: RawDescriptor = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(err) => {
            return DescriptorOutcome::Defaulted(DefaultReason::Malformed(err.to_string()));
        }
    };

    let blend = raw.blend.map(|blend| BlendConfig {
        func: blend
            .func
            .as_deref()
            .and_then(BlendEquation::from_name)
            .unwrap_or(BlendEquation::Add),
        src_factor: blend
            .srcfactor
            .as_deref()
            .and_then(BlendFactor::from_name)
            .unwrap_or(BlendFactor::SrcAlpha),
        dst_factor: blend
            .dstfactor
            .as_deref()
            .and_then(BlendFactor::from_name)
            .unwrap_or(BlendFactor::OneMinusSrcAlpha),
    });

    let uniforms = raw
        .uniforms
        .unwrap_or_default()
        .iter()
        .filter_map(parse_uniform)
        .collect();

    DescriptorOutcome::Parsed(PipelineDescriptor { blend, uniforms })
}

fn parse_uniform(entry: &Value) -> Option<UniformDecl> {
    let object = entry.as_object()?;
    let name = object.get("name").and_then(Value::as_str).unwrap_or("");
    if name.is_empty() {
        tracing::debug!("skipping descriptor uniform without a name");
        return None;
    }
    let type_name = object.get("type").and_then(Value::as_str).unwrap_or("");
    let Some(kind) = UniformKind::from_name(type_name) else {
        tracing::debug!(uniform = name, type_name, "skipping uniform with unsupported type");
        return None;
    };

    let values: Vec<f32> = match object.get("values") {
        Some(Value::Array(items)) => {
            let parsed: Option<Vec<f32>> = items
                .iter()
                .map(|item| item.as_f64().map(|value| value as f32))
                .collect();
            parsed?
        }
        _ => Vec::new(),
    };
    // JSON numbers carry no integer type; `1.0` is a count of one.
    let count = object
        .get("count")
        .and_then(Value::as_f64)
        .filter(|count| *count >= 1.0 && count.fract() == 0.0)
        .map(|count| count as usize)
        .unwrap_or(values.len());

    if !kind.accepts_count(count) || values.len() < count {
        tracing::debug!(
            uniform = name,
            count,
            values = values.len(),
            "skipping uniform whose values do not cover its count"
        );
        return None;
    }

    Some(UniformDecl {
        name: name.to_string(),
        kind,
        count,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"{"blend":{"func":"add","srcfactor":"src_alpha","dstfactor":"one_minus_src_alpha"},"uniforms":[{"name":"GameTime","type":"float","count":1,"values":[0.0]}]}"#;

    #[test]
    fn parses_example_descriptor() {
        let outcome = parse_descriptor(EXAMPLE);
        let descriptor = outcome.descriptor().expect("parsed");
        assert_eq!(descriptor.blend, Some(BlendConfig::default()));
        assert_eq!(descriptor.uniforms, vec![UniformDecl::float("GameTime", &[0.0])]);
    }

    #[test]
    fn malformed_json_defaults_with_reason() {
        let outcome = parse_descriptor("{ \"blend\": ");
        assert!(matches!(
            outcome,
            DescriptorOutcome::Defaulted(DefaultReason::Malformed(_))
        ));
        assert_eq!(outcome.blend(), Some(BlendConfig::default()));
        assert!(outcome.uniforms().is_empty());
    }

    #[test]
    fn blank_text_is_missing_not_malformed() {
        assert_eq!(
            parse_descriptor("  \n"),
            DescriptorOutcome::Defaulted(DefaultReason::Missing)
        );
    }

    #[test]
    fn non_object_documents_are_malformed() {
        assert!(matches!(
            parse_descriptor("[1, 2]"),
            DescriptorOutcome::Defaulted(DefaultReason::Malformed(_))
        ));
    }

    #[test]
    fn unknown_blend_names_fall_back() {
        let outcome = parse_descriptor(
            r#"{"blend":{"func":"wobble","srcfactor":"ONE","dstfactor":"nope"}}"#,
        );
        let blend = outcome.blend().expect("blend");
        assert_eq!(blend.func, BlendEquation::Add);
        assert_eq!(blend.src_factor, BlendFactor::One);
        assert_eq!(blend.dst_factor, BlendFactor::OneMinusSrcAlpha);
    }

    #[test]
    fn parsed_descriptor_without_blend_disables_blending() {
        let outcome = parse_descriptor(r#"{"uniforms":[]}"#);
        assert!(!outcome.is_defaulted());
        assert_eq!(outcome.blend(), None);
    }

    #[test]
    fn uniforms_short_of_their_count_are_skipped() {
        let outcome = parse_descriptor(
            r#"{"uniforms":[
                {"name":"ColorModulator","type":"float","count":4,"values":[1.0,1.0]},
                {"name":"ProjMat","type":"matrix4x4","count":16,"values":[1,0,0,0]},
                {"name":"Scale","type":"float","values":[2.0,3.0]},
                {"name":"","type":"float","count":1,"values":[1.0]},
                {"name":"Weird","type":"int","count":1,"values":[1]},
                "not an object"
            ]}"#,
        );
        let uniforms = outcome.uniforms();
        assert_eq!(uniforms.len(), 1);
        assert_eq!(uniforms[0].name, "Scale");
        assert_eq!(uniforms[0].count, 2);
        for uniform in uniforms {
            assert!(uniform.values.len() >= uniform.count);
        }
    }

    #[test]
    fn active_values_trim_extra_entries() {
        let outcome =
            parse_descriptor(r#"{"uniforms":[{"name":"A","type":"float","count":2,"values":[1,2,3]}]}"#);
        assert_eq!(outcome.uniforms()[0].active_values(), &[1.0, 2.0]);
    }

    #[test]
    fn fractionless_float_counts_are_counts() {
        let outcome = parse_descriptor(
            r#"{"uniforms":[
                {"name":"GameTime","type":"float","count":1.0,"values":[0.5,0.0]},
                {"name":"Half","type":"float","count":1.5,"values":[1.0,2.0]}
            ]}"#,
        );
        let uniforms = outcome.uniforms();
        assert_eq!(uniforms[0].name, "GameTime");
        assert_eq!(uniforms[0].count, 1);
        assert_eq!(uniforms[0].active_values(), &[0.5]);
        // A fractional count is ignored in favour of the value list.
        assert_eq!(uniforms[1].count, 2);
    }
}
