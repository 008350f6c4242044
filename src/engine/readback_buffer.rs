#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{Context, Error, Texture};
use std::marker::PhantomData;
use std::mem::size_of;
use zerocopy::{AsBytes, FromBytes};

const ROW_ALIGNMENT: usize = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;

#[derive(Clone, Copy, Debug)]
struct PendingCopy {
    row_bytes: usize,
    padded_row_bytes: usize,
    rows: usize,
}

/// Staging buffer for reading one texture subresource back to the CPU.
///
/// `start_readback` encodes and submits the copy; `end_readback` blocks on
/// the map and strips the copy row padding. This is one of the pipeline's
/// two blocking points (the other is `EnvironmentMap::read_face`).
#[derive(Debug)]
pub struct ReadbackBuffer<T: ?Sized> {
    context: Context,
    handle: Option<wgpu::Buffer>,
    capacity: usize,
    pending: Option<PendingCopy>,
    phantom: PhantomData<T>,
}

impl<T: AsBytes + FromBytes> ReadbackBuffer<[T]> {
    pub fn start_readback(
        &mut self,
        texture: &Texture,
        mip: usize,
        layer: usize,
    ) -> Result<(), Error> {
        let (handle, format) = match (texture.handle(), texture.format()) {
            (Some(handle), Some(format)) => (handle, format),
            _ => return Err(Error::setup("readback from an invalid texture")),
        };

        let cols = (texture.cols() >> mip).max(1);
        let rows = (texture.rows() >> mip).max(1);

        let texel_size = format.block_copy_size(None).unwrap_or(4) as usize;
        let row_bytes = cols * texel_size;
        let padded_row_bytes = row_bytes.div_ceil(ROW_ALIGNMENT) * ROW_ALIGNMENT;

        self.create_and_allocate(padded_row_bytes * rows)?;

        let mut encoder = self
            .context
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback"),
            });

        if let Some(buffer) = &self.handle {
            encoder.copy_texture_to_buffer(
                wgpu::ImageCopyTexture {
                    texture: handle,
                    mip_level: mip as u32,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::ImageCopyBuffer {
                    buffer,
                    layout: wgpu::ImageDataLayout {
                        offset: 0,
                        bytes_per_row: Some(padded_row_bytes as u32),
                        rows_per_image: None,
                    },
                },
                wgpu::Extent3d {
                    width: cols as u32,
                    height: rows as u32,
                    depth_or_array_layers: 1,
                },
            );
        }

        self.context.queue().submit(Some(encoder.finish()));

        self.pending = Some(PendingCopy {
            row_bytes,
            padded_row_bytes,
            rows,
        });

        Ok(())
    }

    /// Waits for the pending copy and unpacks it into `data`.
    ///
    /// Returns false if no readback was started or the map failed.
    pub fn end_readback(&mut self, data: &mut [T]) -> bool {
        let (copy, buffer) = match (self.pending.take(), &self.handle) {
            (Some(copy), Some(buffer)) => (copy, buffer),
            _ => return false,
        };

        let bytes = data.as_bytes_mut();

        if bytes.len() < copy.row_bytes * copy.rows {
            warn!("readback target slice is too small");
            return false;
        }

        let slice = buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();

        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        let _ = self.context.device().poll(wgpu::Maintain::Wait);

        match receiver.recv() {
            Ok(Ok(())) => {}
            _ => {
                warn!("readback buffer map failed");
                return false;
            }
        }

        {
            let view = slice.get_mapped_range();

            for row in 0..copy.rows {
                let source = &view[row * copy.padded_row_bytes..][..copy.row_bytes];
                bytes[row * copy.row_bytes..][..copy.row_bytes].copy_from_slice(source);
            }
        }

        buffer.unmap();

        true
    }

    pub fn element_count(&self) -> usize {
        self.capacity / size_of::<T>().max(1)
    }
}

impl<T: ?Sized> ReadbackBuffer<T> {
    pub fn new(context: Context) -> Self {
        Self {
            context,
            handle: None,
            capacity: 0,
            pending: None,
            phantom: PhantomData,
        }
    }

    pub fn invalidate(&mut self) {
        self.handle = None;
        self.capacity = 0;
        self.pending = None;
    }

    fn create_and_allocate(&mut self, size: usize) -> Result<(), Error> {
        if self.capacity >= size && self.handle.is_some() {
            return Ok(());
        }

        let device = self.context.device();

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let handle = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback"),
            size: size as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            warn!("readback allocation failed: {}", error);

            return Err(Error::exhausted("out of memory allocating readback buffer"));
        }

        self.handle = Some(handle);
        self.capacity = size;

        Ok(())
    }
}
