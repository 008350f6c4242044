#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{Pipeline, SpecularFilter};

impl Pipeline {
    /// Encodes the specular convolution cascade: each mip past the first is
    /// filtered from a cube view of the level above it, at that level's
    /// roughness. Mip 0 is never filtered.
    pub(crate) fn encode_convolution(&self, encoder: &mut wgpu::CommandEncoder) {
        let kernel = match self.filter {
            SpecularFilter::Ggx { .. } => &self.convolve_ggx_kernel,
            SpecularFilter::Gaussian { .. } => &self.convolve_gaussian_kernel,
        };

        for descriptor in self.mip_levels.iter().skip(1) {
            let level = descriptor.level as usize;

            let source = self.cubemap.cube_mip(level - 1);
            let chain_out = self.cubemap.mip(level);

            let mut command = kernel.begin_dispatch();

            command.bind(&self.convolve_buffers[level], "Convolve");
            command.bind(&source, "source");
            command.bind(&self.linear_sampler, "source_sampler");
            command.bind(&chain_out, "chain_out");

            command.dispatch(
                encoder,
                descriptor.dispatch[0],
                descriptor.dispatch[1],
                descriptor.dispatch[2],
            );
        }
    }

    /// Re-runs the convolution cascade on the current mip 0 contents and
    /// republishes, without capturing the scene again. Useful after a filter
    /// settings change when the scene is static.
    pub fn refilter(&mut self) -> bool {
        if !self.ready {
            return false;
        }

        let mut encoder = self
            .context
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("refilter"),
            });

        self.encode_convolution(&mut encoder);

        let target_index = self.publish_index ^ 1;
        self.encode_publish_copy(&mut encoder, target_index);

        self.context.queue().submit(Some(encoder.finish()));
        self.swap_published(target_index);

        true
    }
}
