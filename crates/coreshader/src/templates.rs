//! Bundled example triples.
use crate::source::{SourceKind, SourceSet};

pub const DEFAULT_TEMPLATE: &str = "black_hole";

const SHARED_VERTEX: &str = include_str!("../templates/shared.vsh");
const PIPELINE: &str = include_str!("../templates/pipeline.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub id: &'static str,
    pub label: &'static str,
    fragment: &'static str,
}

impl Template {
    pub fn vertex(&self) -> &'static str {
        SHARED_VERTEX
    }

    pub fn fragment(&self) -> &'static str {
        self.fragment
    }

    /// Pipeline descriptor naming this template's programs.
    pub fn descriptor(&self) -> String {
        PIPELINE.replace("{id}", self.id)
    }

    pub fn sources(&self) -> SourceSet {
        SourceSet::new(self.vertex(), self.fragment(), self.descriptor())
    }

    /// File names used when writing the triple to disk.
    pub fn file_names(&self) -> [(SourceKind, String); 3] {
        [
            (SourceKind::Vertex, format!("{}.vsh", self.id)),
            (SourceKind::Fragment, format!("{}.fsh", self.id)),
            (SourceKind::Pipeline, format!("{}.json", self.id)),
        ]
    }
}

const TEMPLATES: [Template; 7] = [
    Template {
        id: "black_hole",
        label: "Black hole (polar swirl)",
        fragment: include_str!("../templates/black_hole.fsh"),
    },
    Template {
        id: "ripple",
        label: "Ripple (texture distortion)",
        fragment: include_str!("../templates/ripple.fsh"),
    },
    Template {
        id: "pixelate",
        label: "Pixelate (mosaic)",
        fragment: include_str!("../templates/pixelate.fsh"),
    },
    Template {
        id: "rgb_shift",
        label: "RGB shift (chromatic aberration)",
        fragment: include_str!("../templates/rgb_shift.fsh"),
    },
    Template {
        id: "scanlines",
        label: "Scanlines (CRT texture)",
        fragment: include_str!("../templates/scanlines.fsh"),
    },
    Template {
        id: "dissolve",
        label: "Dissolve (noise cutout)",
        fragment: include_str!("../templates/dissolve.fsh"),
    },
    Template {
        id: "plasma",
        label: "Plasma (procedural)",
        fragment: include_str!("../templates/plasma.fsh"),
    },
];

pub fn all() -> &'static [Template] {
    &TEMPLATES
}

pub fn find(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|template| template.id == id)
}

/// Looks up `id`, falling back to the default template.
pub fn resolve(id: &str) -> &'static Template {
    find(id).unwrap_or(&TEMPLATES[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::descriptor::parse_descriptor;
    use crate::link::link;
    use crate::normalize::{normalize, ShaderStage};
    use crate::program::bridge;

    #[test]
    fn unknown_ids_fall_back_to_black_hole() {
        assert_eq!(resolve("nope").id, DEFAULT_TEMPLATE);
        assert_eq!(resolve("plasma").id, "plasma");
    }

    #[test]
    fn descriptors_parse_and_name_the_template() {
        for template in all() {
            let descriptor = template.descriptor();
            assert!(descriptor.contains(&format!("trimupgrade:{}", template.id)));
            let outcome = parse_descriptor(&descriptor);
            assert!(!outcome.is_defaulted(), "{} descriptor", template.id);
            assert_eq!(outcome.uniforms().len(), 4);
        }
    }

    #[test]
    fn every_template_compiles_and_links() {
        for template in all() {
            let bridged = bridge(
                &normalize(template.vertex(), ShaderStage::Vertex),
                &normalize(template.fragment(), ShaderStage::Fragment),
            );
            let vertex = compile(ShaderStage::Vertex, &bridged.vertex)
                .unwrap_or_else(|failure| panic!("{}: {}", template.id, failure));
            let fragment = compile(ShaderStage::Fragment, &bridged.fragment)
                .unwrap_or_else(|failure| panic!("{}: {}", template.id, failure));
            link(vertex, fragment, bridged.interface)
                .unwrap_or_else(|failure| panic!("{}: {}", template.id, failure));
        }
    }
}
