//! Uniform slots, values and the per-pass upload cache.

use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};
use rustc_hash::FxHashMap;

/// Index of a shader uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UniformSlot(pub u16);

impl UniformSlot {
    // Transforms
    pub const MODEL: Self = Self(0);
    pub const VIEW: Self = Self(1);
    pub const PROJECTION: Self = Self(2);
    pub const MVP: Self = Self(3);
    pub const LIGHT_SPACE: Self = Self(4);

    // Lighting
    pub const LIGHT_DIRECTION: Self = Self(5);
    pub const LIGHT_COLOR: Self = Self(6);
    pub const AMBIENT_INTENSITY: Self = Self(7);
    pub const DIFFUSE_INTENSITY: Self = Self(8);
    pub const EYE: Self = Self(9);
    pub const RECEIVE_SHADOWS: Self = Self(10);
    pub const SHADOW_MAP: Self = Self(11);

    // Skinning
    pub const ENABLE_SKINNING: Self = Self(12);
    pub const SKIN_TRANSFORMS: Self = Self(13);

    // Material / surface
    pub const ENABLE_TEXTURE: Self = Self(14);
    pub const TEXTURE_SAMPLER: Self = Self(15);
    pub const COLOR: Self = Self(16);
    pub const OPACITY: Self = Self(17);
    pub const RECEIVE_LIGHT: Self = Self(18);
    pub const SPECULAR_INTENSITY: Self = Self(19);
    pub const SPECULAR_POWER: Self = Self(20);

    // Quads
    pub const SIZE: Self = Self(21);
    pub const BORDER: Self = Self(22);

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::MODEL => "model",
            Self::VIEW => "view",
            Self::PROJECTION => "projection",
            Self::MVP => "mvp",
            Self::LIGHT_SPACE => "light_space",
            Self::LIGHT_DIRECTION => "light_direction",
            Self::LIGHT_COLOR => "light_color",
            Self::AMBIENT_INTENSITY => "ambient_intensity",
            Self::DIFFUSE_INTENSITY => "diffuse_intensity",
            Self::EYE => "eye",
            Self::RECEIVE_SHADOWS => "receive_shadows",
            Self::SHADOW_MAP => "shadow_map",
            Self::ENABLE_SKINNING => "enable_skinning",
            Self::SKIN_TRANSFORMS => "skin_transforms",
            Self::ENABLE_TEXTURE => "enable_texture",
            Self::TEXTURE_SAMPLER => "texture_sampler",
            Self::COLOR => "color",
            Self::OPACITY => "opacity",
            Self::RECEIVE_LIGHT => "receive_light",
            Self::SPECULAR_INTENSITY => "specular_intensity",
            Self::SPECULAR_POWER => "specular_power",
            Self::SIZE => "size",
            Self::BORDER => "border",
            _ => "custom",
        }
    }
}

/// A value bound to a uniform slot.
///
/// Plain values compare by value. [`Mat4Array`](Self::Mat4Array) (skin
/// palettes) compares by pointer identity and length, so two draws sharing
/// the same palette upload it once.
#[derive(Debug, Clone)]
pub enum UniformValue {
    Mat4(Mat4),
    Vec4(Vec4),
    Vec3(Vec3),
    Float(f32),
    Int(i32),
    Bool(bool),
    Mat4Array(Arc<[Mat4]>),
}

impl UniformValue {
    /// Number of elements the value occupies in its slot.
    #[inline]
    #[must_use]
    pub fn count(&self) -> u32 {
        match self {
            Self::Mat4Array(matrices) => matrices.len() as u32,
            _ => 1,
        }
    }

    #[must_use]
    pub fn same_binding(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Mat4(a), Self::Mat4(b)) => a == b,
            (Self::Vec4(a), Self::Vec4(b)) => a == b,
            (Self::Vec3(a), Self::Vec3(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Mat4Array(a), Self::Mat4Array(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// `(slot, value, count)` carried by a draw command.
#[derive(Debug, Clone)]
pub struct UniformBinding {
    pub slot: UniformSlot,
    pub value: UniformValue,
    pub count: u32,
}

impl UniformBinding {
    #[must_use]
    pub fn new(slot: UniformSlot, value: UniformValue) -> Self {
        let count = value.count();
        Self { slot, value, count }
    }
}

/// Last value bound per slot during the current pass activation.
///
/// Owned by the scheduler and emptied on every pass transition.
#[derive(Debug, Default)]
pub struct UniformCache {
    entries: FxHashMap<UniformSlot, (UniformValue, u32)>,
}

impl UniformCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when `binding` differs from the cached entry, recording
    /// it as the new cached value.
    pub fn needs_upload(&mut self, binding: &UniformBinding) -> bool {
        if let Some((value, count)) = self.entries.get(&binding.slot)
            && *count == binding.count
            && value.same_binding(&binding.value)
        {
            return false;
        }
        self.entries
            .insert(binding.slot, (binding.value.clone(), binding.count));
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
