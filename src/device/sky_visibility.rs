#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{
    cube_face_directions, CaptureTarget, CaptureViewpoint, Context, Error, ReadbackBuffer,
    SceneRenderer, SkyVisibilityMasks, Texture, ViewpointFrame,
};

/// Precomputes per-face sky visibility masks for a static viewpoint.
///
/// The renderer is expected to clear the target to full coverage and draw
/// occluding geometry at zero, so that a mask texel of 255 means the texel
/// only ever sees sky. The masks feed the masked blit, which substitutes a
/// flat tint for fully-sky texels.
#[derive(Debug)]
pub struct SkyVisibilityBuilder {
    context: Context,
    color: Texture,
    depth: Texture,
    readback: ReadbackBuffer<[u8]>,
}

impl SkyVisibilityBuilder {
    pub fn new(context: &Context) -> Self {
        Self {
            context: context.clone(),
            color: Texture::new(
                context.clone(),
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            ),
            depth: Texture::new(context.clone(), wgpu::TextureUsages::RENDER_ATTACHMENT),
            readback: ReadbackBuffer::new(context.clone()),
        }
    }

    /// Renders each cube face and reads the coverage back, blocking.
    pub fn build(
        &mut self,
        renderer: &mut dyn SceneRenderer,
        viewpoint: &CaptureViewpoint,
        resolution: u32,
    ) -> Result<SkyVisibilityMasks, Error> {
        if !resolution.is_power_of_two() || resolution < 4 {
            return Err(Error::config(
                "mask resolution must be a power of two, at least 4",
            ));
        }

        let size = resolution as usize;

        self.color.create(size, size, wgpu::TextureFormat::R8Unorm)?;
        self.depth
            .create(size, size, wgpu::TextureFormat::Depth32Float)?;

        let mut faces = Vec::with_capacity(6);

        for (index, direction) in cube_face_directions().iter().enumerate() {
            let frame = ViewpointFrame::from_direction(viewpoint, direction, index);

            let mut encoder =
                self.context
                    .device()
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some("sky-visibility"),
                    });

            let target = CaptureTarget {
                color: self
                    .color
                    .render_target()
                    .ok_or_else(|| Error::setup("mask target was not created"))?,
                depth: self
                    .depth
                    .render_target()
                    .ok_or_else(|| Error::setup("mask target was not created"))?,
                format: wgpu::TextureFormat::R8Unorm,
                resolution,
            };

            renderer.render(&self.context, &mut encoder, &target, &frame)?;

            self.context.queue().submit(Some(encoder.finish()));

            self.readback.start_readback(&self.color, 0, 0)?;

            let mut mask = vec![0u8; size * size];

            if !self.readback.end_readback(&mut mask) {
                return Err(Error::setup("sky visibility readback failed"));
            }

            faces.push(mask);
        }

        let masks = SkyVisibilityMasks { resolution, faces };

        masks.validate()?;

        Ok(masks)
    }
}
