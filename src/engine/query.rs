#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::Context;
use std::sync::mpsc::Receiver;

/// GPU timestamp query measuring one span of encoded work.
///
/// Timing is optional: on devices without timestamp support every method is
/// a no-op and `elapsed_us` always returns `None`. Results are retrieved
/// without blocking, so the reported time is the most recently completed
/// measurement rather than the current frame's.
#[derive(Debug)]
pub struct Query {
    context: Context,
    query_set: Option<wgpu::QuerySet>,
    resolve_buffer: Option<wgpu::Buffer>,
    readback_buffer: Option<wgpu::Buffer>,
    pending: Option<Receiver<Result<(), wgpu::BufferAsyncError>>>,
    last_us: Option<f32>,
    busy: bool,
}

impl Query {
    pub fn new(context: Context) -> Self {
        let mut query = Self {
            context,
            query_set: None,
            resolve_buffer: None,
            readback_buffer: None,
            pending: None,
            last_us: None,
            busy: false,
        };

        query.reset();
        query
    }

    pub fn is_supported(context: &Context) -> bool {
        context.supports_timing()
    }

    pub(crate) fn reset(&mut self) {
        self.pending = None;
        self.last_us = None;
        self.busy = false;

        if !Self::is_supported(&self.context) {
            self.query_set = None;
            self.resolve_buffer = None;
            self.readback_buffer = None;
            return;
        }

        let device = self.context.device();

        self.query_set = Some(device.create_query_set(&wgpu::QuerySetDescriptor {
            label: Some("timing"),
            ty: wgpu::QueryType::Timestamp,
            count: 2,
        }));

        self.resolve_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("timing-resolve"),
            size: 16,
            usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        }));

        self.readback_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("timing-readback"),
            size: 16,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        }));
    }

    /// Writes the opening timestamp into the encoder.
    pub fn begin(&mut self, encoder: &mut wgpu::CommandEncoder) {
        if let Some(query_set) = &self.query_set {
            if !self.busy && self.pending.is_none() {
                encoder.write_timestamp(query_set, 0);
                self.busy = true;
            }
        }
    }

    /// Writes the closing timestamp and resolves the pair.
    pub fn end(&mut self, encoder: &mut wgpu::CommandEncoder) {
        if !self.busy {
            return;
        }

        if let (Some(query_set), Some(resolve), Some(readback)) = (
            &self.query_set,
            &self.resolve_buffer,
            &self.readback_buffer,
        ) {
            encoder.write_timestamp(query_set, 1);
            encoder.resolve_query_set(query_set, 0..2, resolve, 0);
            encoder.copy_buffer_to_buffer(resolve, 0, readback, 0, 16);
        }
    }

    /// Starts mapping the resolved timestamps; call after submission.
    pub fn finish(&mut self) {
        if !self.busy {
            return;
        }

        self.busy = false;

        if let Some(readback) = &self.readback_buffer {
            let (sender, receiver) = std::sync::mpsc::channel();

            readback.slice(..).map_async(wgpu::MapMode::Read, move |result| {
                let _ = sender.send(result);
            });

            self.pending = Some(receiver);
        }
    }

    /// Latest completed measurement in microseconds, if any.
    pub fn elapsed_us(&mut self) -> Option<f32> {
        if let Some(receiver) = &self.pending {
            let _ = self.context.device().poll(wgpu::Maintain::Poll);

            if let Ok(result) = receiver.try_recv() {
                self.pending = None;

                if result.is_ok() {
                    if let Some(readback) = &self.readback_buffer {
                        let slice = readback.slice(..);

                        {
                            let view = slice.get_mapped_range();

                            if let Some(timestamps) =
                                zerocopy::Ref::<_, [u64]>::new_slice(&*view)
                            {
                                let ticks = timestamps[1].saturating_sub(timestamps[0]);
                                let period = self.context.queue().get_timestamp_period();

                                self.last_us = Some(ticks as f32 * period / 1000.0);
                            }
                        }

                        readback.unmap();
                    }
                }
            }
        }

        self.last_us
    }
}
