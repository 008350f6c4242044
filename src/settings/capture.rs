use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::num::NonZeroU32;

/// Texel format of the capture buffer and the filtered chain.
///
/// `Rg11b10Float` is accepted for captures but cannot be storage-written,
/// so configuring it for the filtered chain fails setup.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, SmartDefault, Serialize)]
pub enum ColorFormat {
    Rgba8,
    #[default]
    Rgba16Float,
    Rgba32Float,
    Rg11b10Float,
}

impl ColorFormat {
    pub(crate) fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            Self::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
            Self::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            Self::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
            Self::Rg11b10Float => wgpu::TextureFormat::Rg11b10Float,
        }
    }

    /// WGSL storage format token, if the format is storage-writable.
    pub(crate) fn storage_format(self) -> Option<&'static str> {
        match self {
            Self::Rgba8 => Some("rgba8unorm"),
            Self::Rgba16Float => Some("rgba16float"),
            Self::Rgba32Float => Some("rgba32float"),
            Self::Rg11b10Float => None,
        }
    }

    pub(crate) fn bytes_per_texel(self) -> usize {
        match self {
            Self::Rgba8 | Self::Rg11b10Float => 4,
            Self::Rgba16Float => 8,
            Self::Rgba32Float => 16,
        }
    }
}

/// How the sphere of directions is partitioned into captures.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, SmartDefault, Serialize)]
#[serde(tag = "type")]
pub enum CaptureProjection {
    /// Six axis-aligned 90° captures, one per cube face.
    #[default]
    CubeFaces,
    /// Four wide-angle captures resolved through a direction LUT.
    Tetrahedral,
}

impl CaptureProjection {
    pub fn direction_count(self) -> usize {
        match self {
            Self::CubeFaces => 6,
            Self::Tetrahedral => 4,
        }
    }
}

/// When `advance` actually runs a capture pass.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, SmartDefault, Serialize)]
#[serde(tag = "type")]
pub enum UpdatePolicy {
    EveryTick,
    #[default]
    FixedRate {
        #[default(30.0)]
        rate: f32,
    },
    Manual,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, SmartDefault, Serialize)]
pub struct CaptureSettings {
    /// Cube face resolution; must be a power of two.
    #[default(NonZeroU32::new(128).unwrap())]
    pub resolution: NonZeroU32,

    pub format: ColorFormat,

    pub projection: CaptureProjection,

    pub update_policy: UpdatePolicy,

    /// Tetrahedral atlas oversize factor relative to the face resolution.
    #[default(2)]
    pub lut_supersampling: u32,

    /// Color composited where a sky visibility mask marks sky-only texels.
    #[default([0.0, 0.0, 0.0])]
    pub sky_tint: [f32; 3],
}
