use std::collections::HashMap;

use crate::descriptor::{default_uniforms, UniformDecl, UniformKind};
use crate::interface::GlslType;
use crate::program::{ProgramInterface, UniformLayout, UniformMember};

/// Names the host writes to on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownUniform {
    ModelViewMat,
    ProjMat,
    GameTime,
    ColorModulator,
    Sampler0,
    ScreenSize,
}

impl WellKnownUniform {
    pub const ALL: [WellKnownUniform; 6] = [
        Self::ModelViewMat,
        Self::ProjMat,
        Self::GameTime,
        Self::ColorModulator,
        Self::Sampler0,
        Self::ScreenSize,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ModelViewMat => "ModelViewMat",
            Self::ProjMat => "ProjMat",
            Self::GameTime => "GameTime",
            Self::ColorModulator => "ColorModulator",
            Self::Sampler0 => "Sampler0",
            Self::ScreenSize => "ScreenSize",
        }
    }
}

/// Where a resolved uniform lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformLocation {
    /// Byte offset into the uniform block.
    Block { offset: u32, ty: GlslType },
    /// Bound to the single texture slot.
    TextureSlot,
}

/// CPU mirror of the uniform block, uploaded whole when dirty.
///
/// Every std140 offset is a multiple of four, so the block is stored as
/// 32-bit words.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    words: Vec<f32>,
    dirty: bool,
}

impl UniformBlock {
    pub fn new(layout: &UniformLayout) -> Self {
        Self {
            words: vec![0.0; layout.size() as usize / 4],
            dirty: true,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn write_floats(&mut self, offset: u32, values: &[f32]) {
        let start = offset as usize / 4;
        if let Some(target) = self.words.get_mut(start..start + values.len()) {
            target.copy_from_slice(values);
            self.dirty = true;
        }
    }

    /// Reads back `count` floats at byte `offset`.
    pub fn floats(&self, offset: u32, count: usize) -> Option<&[f32]> {
        let start = offset as usize / 4;
        self.words.get(start..start + count)
    }
}

/// Locations resolved once per linked program.
#[derive(Debug, Clone, Default)]
pub struct UniformBinder {
    well_known: HashMap<WellKnownUniform, UniformLocation>,
    members: HashMap<String, UniformMember>,
}

impl UniformBinder {
    pub fn new(interface: &ProgramInterface) -> Self {
        let members: HashMap<String, UniformMember> = interface
            .uniforms
            .members()
            .iter()
            .map(|member| (member.name.clone(), member.clone()))
            .collect();

        let mut well_known = HashMap::new();
        for uniform in WellKnownUniform::ALL {
            if interface.samplers.iter().any(|name| name == uniform.name()) {
                well_known.insert(uniform, UniformLocation::TextureSlot);
            } else if let Some(member) = members.get(uniform.name()) {
                well_known.insert(
                    uniform,
                    UniformLocation::Block {
                        offset: member.offset,
                        ty: member.ty,
                    },
                );
            }
        }
        tracing::debug!(resolved = well_known.len(), "resolved well-known uniforms");

        Self {
            well_known,
            members,
        }
    }

    pub fn location(&self, uniform: WellKnownUniform) -> Option<UniformLocation> {
        self.well_known.get(&uniform).copied()
    }

    /// Seeds identity matrices and a white color modulator.
    pub fn apply_defaults(&self, block: &mut UniformBlock) {
        for decl in default_uniforms() {
            self.apply(&decl, block);
        }
    }

    pub fn apply_descriptor(&self, uniforms: &[UniformDecl], block: &mut UniformBlock) {
        for decl in uniforms {
            self.apply(decl, block);
        }
    }

    /// Writes one descriptor value when the shader declares a matching
    /// uniform; anything else is ignored.
    pub fn apply(&self, decl: &UniformDecl, block: &mut UniformBlock) -> bool {
        let Some(member) = self.members.get(&decl.name) else {
            return false;
        };
        if member.array_len.is_some() {
            return false;
        }
        let values = decl.active_values();
        let fits = match decl.kind {
            UniformKind::Float => member.ty.float_components() == Some(decl.count),
            UniformKind::Matrix4x4 => member.ty == GlslType::Mat4,
        };
        if !fits {
            tracing::debug!(
                uniform = %decl.name,
                declared = %member.ty,
                count = decl.count,
                "descriptor value does not match shader uniform"
            );
            return false;
        }
        block.write_floats(member.offset, values);
        true
    }

    /// Per-frame refresh of `GameTime` and `ScreenSize`.
    pub fn update_frame(&self, seconds: f32, screen: (u32, u32), block: &mut UniformBlock) {
        if let Some(UniformLocation::Block {
            offset,
            ty: GlslType::Float,
        }) = self.location(WellKnownUniform::GameTime)
        {
            block.write_floats(offset, &[seconds]);
        }
        if let Some(UniformLocation::Block {
            offset,
            ty: GlslType::Vec2,
        }) = self.location(WellKnownUniform::ScreenSize)
        {
            block.write_floats(offset, &[screen.0 as f32, screen.1 as f32]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::IDENTITY_MATRIX;
    use crate::normalize::{normalize, ShaderStage};
    use crate::program::bridge;

    fn interface(fragment: &str) -> ProgramInterface {
        let vertex = "#version 150\nuniform mat4 ProjMat;\nvoid main() { gl_Position = ProjMat * vec4(0.0); }";
        bridge(
            &normalize(vertex, ShaderStage::Vertex),
            &normalize(fragment, ShaderStage::Fragment),
        )
        .interface
    }

    const FRAGMENT: &str = "#version 150
uniform sampler2D Sampler0;
uniform float GameTime;
uniform vec2 ScreenSize;
uniform vec4 ColorModulator;
uniform vec3 Tint;
out vec4 fragColor;
void main() { fragColor = vec4(GameTime); }";

    #[test]
    fn resolves_well_known_names() {
        let binder = UniformBinder::new(&interface(FRAGMENT));
        assert_eq!(
            binder.location(WellKnownUniform::Sampler0),
            Some(UniformLocation::TextureSlot)
        );
        assert_eq!(
            binder.location(WellKnownUniform::ProjMat),
            Some(UniformLocation::Block {
                offset: 0,
                ty: GlslType::Mat4
            })
        );
        assert_eq!(binder.location(WellKnownUniform::ModelViewMat), None);
    }

    #[test]
    fn defaults_then_descriptor_values() {
        let iface = interface(FRAGMENT);
        let binder = UniformBinder::new(&iface);
        let mut block = UniformBlock::new(&iface.uniforms);
        binder.apply_defaults(&mut block);

        assert_eq!(block.floats(0, 16), Some(&IDENTITY_MATRIX[..]));
        let modulator = iface.uniforms.member("ColorModulator").expect("member");
        assert_eq!(block.floats(modulator.offset, 4), Some(&[1.0; 4][..]));

        binder.apply_descriptor(
            &[
                UniformDecl::float("Tint", &[0.5, 0.25, 1.0]),
                UniformDecl::float("GameTime", &[1.0, 2.0]),
                UniformDecl::float("Missing", &[1.0]),
            ],
            &mut block,
        );
        let tint = iface.uniforms.member("Tint").expect("member");
        assert_eq!(block.floats(tint.offset, 3), Some(&[0.5, 0.25, 1.0][..]));
        let time = iface.uniforms.member("GameTime").expect("member");
        assert_eq!(block.floats(time.offset, 1), Some(&[0.0][..]));
    }

    #[test]
    fn matrices_only_land_in_mat4() {
        let iface = interface(FRAGMENT);
        let binder = UniformBinder::new(&iface);
        let mut block = UniformBlock::new(&iface.uniforms);
        assert!(!binder.apply(&UniformDecl::matrix("ColorModulator", IDENTITY_MATRIX), &mut block));
        assert!(binder.apply(&UniformDecl::matrix("ProjMat", IDENTITY_MATRIX), &mut block));
    }

    #[test]
    fn frame_updates_time_and_screen_size() {
        let iface = interface(FRAGMENT);
        let binder = UniformBinder::new(&iface);
        let mut block = UniformBlock::new(&iface.uniforms);
        block.mark_clean();
        binder.update_frame(2.5, (640, 480), &mut block);
        assert!(block.is_dirty());

        let time = iface.uniforms.member("GameTime").expect("member");
        let screen = iface.uniforms.member("ScreenSize").expect("member");
        assert_eq!(block.floats(time.offset, 1), Some(&[2.5][..]));
        assert_eq!(block.floats(screen.offset, 2), Some(&[640.0, 480.0][..]));
    }
}
