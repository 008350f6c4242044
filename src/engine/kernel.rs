#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::kernels::KernelInfo;
use crate::{Context, Error};
use std::collections::HashMap;

/// Named binding slot inside a kernel's bind group.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BindingPoint {
    UniformBlock(u32),
    Texture(u32),
    StorageTexture(u32),
    Sampler(u32),
}

impl BindingPoint {
    fn slot(self) -> u32 {
        match self {
            Self::UniformBlock(slot)
            | Self::Texture(slot)
            | Self::StorageTexture(slot)
            | Self::Sampler(slot) => slot,
        }
    }
}

/// Compute program with named binding points and runtime defines.
///
/// Defines are `{{NAME}}` tokens substituted into the WGSL source; changing
/// one invalidates the program until the next `rebuild`. Compilation errors
/// are caught through a validation error scope and reported as setup
/// failures, leaving the kernel unusable rather than silently wrong.
#[derive(Debug)]
pub struct Kernel {
    context: Context,
    info: &'static KernelInfo,
    binds: HashMap<&'static str, BindingPoint>,
    defines: HashMap<&'static str, String>,
    pipeline: Option<wgpu::ComputePipeline>,
    invalidated: bool,
}

impl Kernel {
    pub fn new(
        context: Context,
        info: &'static KernelInfo,
        binds: HashMap<&'static str, BindingPoint>,
    ) -> Self {
        Self {
            context,
            info,
            binds,
            defines: HashMap::new(),
            pipeline: None,
            invalidated: true,
        }
    }

    pub fn set_define(&mut self, define: &'static str, value: impl ToString) {
        let token = format!("{{{{{}}}}}", define);

        assert!(
            self.info.code.contains(&token),
            "kernel {} has no define {}",
            self.info.name,
            define
        );

        let value = value.to_string();

        if self.defines.get(define) != Some(&value) {
            self.defines.insert(define, value);
            self.invalidated = true;
        }
    }

    pub fn invalidate(&mut self) {
        self.pipeline = None;
        self.invalidated = true;
    }

    /// Recompiles the program if any of its defines changed.
    ///
    /// On a compile failure the kernel stays invalidated, so every later
    /// `rebuild` keeps failing rather than reporting a stale success.
    pub fn rebuild(&mut self) -> Result<(), Error> {
        if !self.invalidated {
            return Ok(());
        }

        self.pipeline = None;

        let mut source = self.info.code.to_owned();

        for (define, value) in &self.defines {
            source = source.replace(&format!("{{{{{}}}}}", define), value);
        }

        let device = self.context.device();

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(self.info.name),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(self.info.name),
            layout: None,
            module: &module,
            entry_point: self.info.entry,
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            warn!("kernel {} failed to compile: {}", self.info.name, error);

            return Err(Error::setup(format!(
                "failed to build compute kernel '{}'",
                self.info.name
            )));
        }

        self.invalidated = false;
        self.pipeline = Some(pipeline);

        Ok(())
    }

    pub fn begin_dispatch(&self) -> DispatchCommand {
        DispatchCommand {
            kernel: self,
            entries: vec![],
            missing: false,
        }
    }
}

/// Resource reference to attach to a binding point.
pub enum BindTarget<'a> {
    UniformBuffer(Option<&'a wgpu::Buffer>),
    TextureView(Option<&'a wgpu::TextureView>),
    Sampler(&'a wgpu::Sampler),
}

pub trait AsBindTarget {
    fn bind_target(&self) -> BindTarget;
}

impl AsBindTarget for wgpu::Sampler {
    fn bind_target(&self) -> BindTarget {
        BindTarget::Sampler(self)
    }
}

/// In-progress dispatch binding resources by name.
pub struct DispatchCommand<'a> {
    kernel: &'a Kernel,
    entries: Vec<wgpu::BindGroupEntry<'a>>,
    missing: bool,
}

impl<'a> DispatchCommand<'a> {
    pub fn bind(&mut self, target: &'a dyn AsBindTarget, slot: &str) {
        let point = match self.kernel.binds.get(slot) {
            Some(&point) => point,
            None => panic!("slot '{}' does not map to a binding point", slot),
        };

        let resource = match (point, target.bind_target()) {
            (BindingPoint::UniformBlock(_), BindTarget::UniformBuffer(Some(buffer))) => {
                buffer.as_entire_binding()
            }
            (BindingPoint::Texture(_), BindTarget::TextureView(Some(view)))
            | (BindingPoint::StorageTexture(_), BindTarget::TextureView(Some(view))) => {
                wgpu::BindingResource::TextureView(view)
            }
            (BindingPoint::Sampler(_), BindTarget::Sampler(sampler)) => {
                wgpu::BindingResource::Sampler(sampler)
            }
            _ => {
                self.missing = true;
                return;
            }
        };

        self.entries.push(wgpu::BindGroupEntry {
            binding: point.slot(),
            resource,
        });
    }

    /// Encodes the dispatch, or does nothing if the kernel is unusable.
    pub fn dispatch(self, encoder: &mut wgpu::CommandEncoder, x: u32, y: u32, z: u32) {
        let pipeline = match &self.kernel.pipeline {
            Some(pipeline) => pipeline,
            None => return,
        };

        if self.missing {
            warn!(
                "kernel {} dispatched with missing bindings",
                self.kernel.info.name
            );

            return;
        }

        let bind_group = self
            .kernel
            .context
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(self.kernel.info.name),
                layout: &pipeline.get_bind_group_layout(0),
                entries: &self.entries,
            });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(self.kernel.info.name),
            timestamp_writes: None,
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(x, y, z);
    }
}
