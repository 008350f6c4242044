#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{CaptureProjection, Pipeline, MIN_DISPATCH_GROUPS, WORKGROUP_SIZE};

impl Pipeline {
    /// Encodes the reparameterization of one captured direction: a direct
    /// blit into the cube face under six-face capture, or a quadrant write
    /// into the atlas under tetrahedral capture.
    pub(crate) fn reparameterize_direction(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        index: usize,
    ) {
        match self.projection {
            CaptureProjection::CubeFaces => {
                let kernel = if self.has_masks {
                    &self.face_blit_masked_kernel
                } else {
                    &self.face_blit_kernel
                };

                let cube_out = self.cubemap.mip(0);
                let sky_mask = self.mask_texture.layer(index);

                let mut command = kernel.begin_dispatch();

                command.bind(&self.globals_buffer, "Globals");
                command.bind(&self.direction_buffers[index], "Direction");
                command.bind(&self.capture_color, "capture");
                command.bind(&cube_out, "cube_out");

                if self.has_masks {
                    command.bind(&sky_mask, "sky_mask");
                }

                let groups = self.resolution.div_ceil(WORKGROUP_SIZE);

                command.dispatch(encoder, groups, groups, 1);
            }
            CaptureProjection::Tetrahedral => {
                let atlas_out = self.atlas.mip(0);

                let mut command = self.atlas_combine_kernel.begin_dispatch();

                command.bind(&self.globals_buffer, "Globals");
                command.bind(&self.direction_buffers[index], "Direction");
                command.bind(&self.capture_color, "capture");
                command.bind(&self.linear_sampler, "capture_sampler");
                command.bind(&atlas_out, "atlas_out");

                let quadrant = (self.atlas.cols() as u32) / 2;
                let groups = quadrant.div_ceil(WORKGROUP_SIZE);

                command.dispatch(encoder, groups, groups, 1);
            }
        }
    }

    /// Encodes the atlas-to-cube resolve: every mip 0 texel of the cube is
    /// looked up in the direction LUT and sampled from the atlas.
    pub(crate) fn resolve_atlas(&self, encoder: &mut wgpu::CommandEncoder) {
        let cube_out = self.cubemap.mip(0);

        let mut command = self.atlas_resolve_kernel.begin_dispatch();

        command.bind(&self.globals_buffer, "Globals");
        command.bind(&self.lut_texture, "lut");
        command.bind(&self.atlas, "atlas");
        command.bind(&self.linear_sampler, "atlas_sampler");
        command.bind(&cube_out, "cube_out");

        let groups = self
            .resolution
            .div_ceil(WORKGROUP_SIZE)
            .max(MIN_DISPATCH_GROUPS);

        command.dispatch(encoder, groups, groups, 6);
    }
}
