use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Probe viewpoint shared by every capture direction of a pass.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, SmartDefault, Serialize)]
pub struct CaptureViewpoint {
    #[default([0.0, 0.0, 0.0])]
    pub position: [f32; 3],

    #[default(0.05)]
    pub near_plane: f32,

    #[default(1000.0)]
    pub far_plane: f32,

    /// Culling mask bits handed through to the scene renderer.
    #[default(u32::MAX)]
    pub visibility_mask: u32,
}
