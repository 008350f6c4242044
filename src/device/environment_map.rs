#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{ColorFormat, Context, Error, MipLevelDescriptor, Pipeline};

use std::sync::Arc;

/// Filtered environment map, as seen by the consumer.
///
/// The pipeline owns two of these and ping-pongs between them: a capture
/// pass copies the finished chain into the inactive one and then swaps it
/// in, so a consumer holding the published `Arc` never observes a map with
/// partially copied contents.
#[derive(Debug)]
pub struct EnvironmentMap {
    pub(crate) texture: wgpu::Texture,
    cube_view: wgpu::TextureView,
    resolution: u32,
    format: ColorFormat,
    mip_levels: Vec<MipLevelDescriptor>,
}

impl EnvironmentMap {
    pub(crate) fn create(
        context: &Context,
        resolution: u32,
        format: ColorFormat,
        mip_levels: &[MipLevelDescriptor],
    ) -> Result<Self, Error> {
        let device = context.device();

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("environment-map"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 6,
            },
            mip_level_count: mip_levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: format.texture_format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            warn!("environment map allocation failed: {}", error);

            return Err(Error::exhausted(format!(
                "out of memory allocating a {0}x{0} environment map",
                resolution
            )));
        }

        let cube_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("environment-map-cube"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        Ok(Self {
            texture,
            cube_view,
            resolution,
            format,
            mip_levels: mip_levels.to_vec(),
        })
    }

    /// Cube view over the full mip chain, for sampling with a mip bias or an
    /// explicit level selected from the target roughness.
    pub fn cube_view(&self) -> &wgpu::TextureView {
        &self.cube_view
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn format(&self) -> ColorFormat {
        self.format
    }

    pub fn mip_levels(&self) -> &[MipLevelDescriptor] {
        &self.mip_levels
    }

    /// Blocking readback of one face of one mip level, tightly packed.
    pub fn read_face(&self, context: &Context, face: u32, mip: u32) -> Result<Vec<u8>, Error> {
        if face >= 6 || mip as usize >= self.mip_levels.len() {
            return Err(Error::setup("face or mip level out of range"));
        }

        let resolution = self.mip_levels[mip as usize].resolution;
        let row_bytes = resolution as usize * self.format.bytes_per_texel();

        let alignment = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
        let padded_row_bytes = row_bytes.div_ceil(alignment) * alignment;

        let device = context.device();

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("face-readback"),
            size: (padded_row_bytes * resolution as usize) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            warn!("face readback allocation failed: {}", error);

            return Err(Error::exhausted("out of memory allocating a face readback"));
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("face-readback"),
        });

        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: mip,
                origin: wgpu::Origin3d { x: 0, y: 0, z: face },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes as u32),
                    rows_per_image: Some(resolution),
                },
            },
            wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 1,
            },
        );

        context.queue().submit(Some(encoder.finish()));

        let (sender, receiver) = std::sync::mpsc::channel();

        buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = sender.send(result);
            });

        let _ = device.poll(wgpu::Maintain::Wait);

        match receiver.recv() {
            Ok(Ok(())) => {}
            _ => return Err(Error::setup("face readback failed to map")),
        }

        let mut data = Vec::with_capacity(row_bytes * resolution as usize);

        {
            let view = buffer.slice(..).get_mapped_range();

            for row in 0..resolution as usize {
                let offset = row * padded_row_bytes;
                data.extend_from_slice(&view[offset..offset + row_bytes]);
            }
        }

        buffer.unmap();

        Ok(data)
    }
}

impl Pipeline {
    /// The most recently published environment map, if any.
    pub fn published_map(&self) -> Option<Arc<EnvironmentMap>> {
        self.published.clone()
    }

    /// Clears the published slot; consumers see no map until the next pass.
    pub fn invalidate_published(&mut self) {
        self.published = None;
    }

    pub(crate) fn encode_publish_copy(&self, encoder: &mut wgpu::CommandEncoder, target: usize) {
        let target = match &self.publish_targets[target] {
            Some(target) => target,
            None => return,
        };

        let source = match self.cubemap.handle() {
            Some(source) => source,
            None => return,
        };

        for descriptor in &self.mip_levels {
            encoder.copy_texture_to_texture(
                wgpu::ImageCopyTexture {
                    texture: source,
                    mip_level: descriptor.level,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::ImageCopyTexture {
                    texture: &target.texture,
                    mip_level: descriptor.level,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::Extent3d {
                    width: descriptor.resolution,
                    height: descriptor.resolution,
                    depth_or_array_layers: 6,
                },
            );
        }
    }

    pub(crate) fn swap_published(&mut self, target: usize) {
        if let Some(map) = &self.publish_targets[target] {
            self.published = Some(map.clone());
            self.publish_index = target;
        }
    }
}
