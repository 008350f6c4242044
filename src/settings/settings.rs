use crate::{
    CaptureSettings, CaptureViewpoint, Dirty, DirectionLut, SkyVisibilityMasks, SpecularFilter,
};

use serde::{Deserialize, Serialize};

/// # Dirty Flags
///
/// For pragmatic reasons, the settings structure maintains dirty flags
/// relative to a particular pipeline instance's internal state. As a
/// consequence care must be taken when using the same settings instance on
/// multiple pipelines simultaneously.
#[derive(Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Settings {
    pub viewpoint: Dirty<CaptureViewpoint>,
    pub capture: Dirty<CaptureSettings>,
    pub convolution: Dirty<SpecularFilter>,

    /// Precomputed direction LUT, required by the tetrahedral projection.
    #[serde(skip)]
    pub direction_lut: Dirty<Option<DirectionLut>>,

    /// Optional sky visibility masks for the six-face projection.
    #[serde(skip)]
    pub sky_visibility: Dirty<Option<SkyVisibilityMasks>>,
}

impl Settings {
    /// Marks the entire contents of these settings as dirty.
    ///
    /// This method will force a complete pipeline update the next time the
    /// pipeline is updated using these settings, and should be used sparingly.
    pub fn dirty_all_fields(&mut self) {
        Dirty::dirty(&mut self.viewpoint);
        Dirty::dirty(&mut self.capture);
        Dirty::dirty(&mut self.convolution);
        Dirty::dirty(&mut self.direction_lut);
        Dirty::dirty(&mut self.sky_visibility);
    }

    /// Patches these settings to be equal to other settings.
    ///
    /// Contents which are identical between the two are not modified, so the
    /// method will avoid dirtying as many fields as it can.
    pub fn patch_from_other(&mut self, other: Self) {
        if self.viewpoint != other.viewpoint {
            self.viewpoint = other.viewpoint;
        }

        if self.capture != other.capture {
            self.capture = other.capture;
        }

        if self.convolution != other.convolution {
            self.convolution = other.convolution;
        }

        if self.direction_lut != other.direction_lut {
            self.direction_lut = other.direction_lut;
        }

        if self.sky_visibility != other.sky_visibility {
            self.sky_visibility = other.sky_visibility;
        }
    }
}
