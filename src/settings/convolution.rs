use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Specular filter applied when building mip k from mip k-1.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, SmartDefault, Serialize)]
#[serde(tag = "type")]
pub enum SpecularFilter {
    /// GGX importance-sampled convolution.
    #[default]
    Ggx {
        #[default(256)]
        samples: u32,
    },

    /// Gaussian tap blur in the face tangent plane.
    Gaussian {
        #[default(8)]
        radius: u32,

        #[default(4.0)]
        offset: f32,
    },
}
