#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::Error;
use std::sync::Arc;

/// Shared handle to the GPU device and its submission queue.
///
/// Cheap to clone; every engine object holds one. All submissions made
/// through a context happen in order on a single queue.
#[derive(Clone, Debug)]
pub struct Context {
    inner: Arc<ContextData>,
}

#[derive(Debug)]
struct ContextData {
    device: wgpu::Device,
    queue: wgpu::Queue,
    limits: wgpu::Limits,
}

impl Context {
    /// Acquires a GPU device suitable for the pipeline's compute passes.
    ///
    /// Timestamp query support is requested when the adapter has it, so
    /// capture statistics remain optional rather than mandatory.
    pub fn new() -> Result<Self, Error> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            ..Default::default()
        }))
        .ok_or_else(|| Error::setup("no compatible GPU adapter found"))?;

        info!("using adapter: {}", adapter.get_info().name);

        let timing =
            wgpu::Features::TIMESTAMP_QUERY | wgpu::Features::TIMESTAMP_QUERY_INSIDE_ENCODERS;

        let mut features = wgpu::Features::empty();

        if adapter.features().contains(timing) {
            features |= timing;
        }

        // needed to linearly sample an RGBA32F chain; optional otherwise
        if adapter.features().contains(wgpu::Features::FLOAT32_FILTERABLE) {
            features |= wgpu::Features::FLOAT32_FILTERABLE;
        }

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("parhelion-device"),
                required_features: features,
                required_limits: wgpu::Limits::downlevel_defaults(),
                ..Default::default()
            },
            None,
        ))
        .map_err(|err| Error::setup(format!("device request failed: {}", err)))?;

        Ok(Self::from_device(device, queue))
    }

    /// Wraps an existing device, for embedding into a host renderer.
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let limits = device.limits();

        Self {
            inner: Arc::new(ContextData {
                device,
                queue,
                limits,
            }),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.inner.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.inner.queue
    }

    pub(crate) fn limits(&self) -> &wgpu::Limits {
        &self.inner.limits
    }

    pub fn supports_float32_filtering(&self) -> bool {
        self.inner
            .device
            .features()
            .contains(wgpu::Features::FLOAT32_FILTERABLE)
    }

    pub fn supports_timing(&self) -> bool {
        self.inner.device.features().contains(
            wgpu::Features::TIMESTAMP_QUERY | wgpu::Features::TIMESTAMP_QUERY_INSIDE_ENCODERS,
        )
    }
}
