#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::kernels::{self, KernelInfo};
use crate::{
    mip_chain, BindingPoint, CaptureProjection, CaptureSettings, CaptureViewpoint, ColorFormat,
    Context, Dirty, DirectionLut, EnvironmentMap, Error, Kernel, LutKey, MipLevelDescriptor, Query,
    Settings, SkyVisibilityMasks, SpecularFilter, Texture, UniformBuffer, UpdateGate, UpdatePolicy,
    CUBE_FACE_COUNT, TETRAHEDRON_FOV_Y, TETRAHEDRON_LUT_FOV_X,
};

use std::collections::HashMap;
use std::sync::Arc;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

/// Kernel sources a pipeline compiles at setup. Tests substitute broken
/// sources here to exercise the not-ready path.
#[derive(Clone, Copy, Debug)]
pub struct KernelSet {
    pub face_blit: &'static KernelInfo,
    pub face_blit_masked: &'static KernelInfo,
    pub atlas_combine: &'static KernelInfo,
    pub atlas_resolve: &'static KernelInfo,
    pub convolve_ggx: &'static KernelInfo,
    pub convolve_gaussian: &'static KernelInfo,
}

impl Default for KernelSet {
    fn default() -> Self {
        Self {
            face_blit: &kernels::FACE_BLIT,
            face_blit_masked: &kernels::FACE_BLIT_MASKED,
            atlas_combine: &kernels::ATLAS_COMBINE,
            atlas_resolve: &kernels::ATLAS_RESOLVE,
            convolve_ggx: &kernels::CONVOLVE_GGX,
            convolve_gaussian: &kernels::CONVOLVE_GAUSSIAN,
        }
    }
}

/// Capture-and-filter pipeline for a single environment probe.
///
/// The pipeline owns every GPU resource involved: the shared capture
/// target, the working cube chain, LUT and mask textures, and the two
/// publish targets. It is driven by `update` (validate + apply settings)
/// and `advance` (run a capture pass when the policy permits).
#[derive(Debug)]
pub struct Pipeline {
    pub(crate) context: Context,

    pub(crate) face_blit_kernel: Kernel,
    pub(crate) face_blit_masked_kernel: Kernel,
    pub(crate) atlas_combine_kernel: Kernel,
    pub(crate) atlas_resolve_kernel: Kernel,
    pub(crate) convolve_ggx_kernel: Kernel,
    pub(crate) convolve_gaussian_kernel: Kernel,

    pub(crate) capture_color: Texture,
    pub(crate) capture_depth: Texture,
    pub(crate) atlas: Texture,
    pub(crate) cubemap: Texture,
    pub(crate) lut_texture: Texture,
    pub(crate) mask_texture: Texture,

    pub(crate) globals_buffer: UniformBuffer<GlobalData>,
    pub(crate) direction_buffers: Vec<UniformBuffer<DirectionData>>,
    pub(crate) convolve_buffers: Vec<UniformBuffer<ConvolveData>>,

    pub(crate) linear_sampler: wgpu::Sampler,

    pub(crate) capture_query: Query,

    // settings snapshot, valid while ready
    pub(crate) viewpoint: CaptureViewpoint,
    pub(crate) projection: CaptureProjection,
    pub(crate) resolution: u32,
    pub(crate) format: ColorFormat,
    pub(crate) supersampling: u32,
    pub(crate) filter: SpecularFilter,
    pub(crate) policy: UpdatePolicy,
    pub(crate) mip_levels: Vec<MipLevelDescriptor>,
    pub(crate) has_masks: bool,

    pub(crate) gate: UpdateGate,

    pub(crate) publish_targets: [Option<Arc<EnvironmentMap>>; 2],
    pub(crate) publish_index: usize,
    pub(crate) published: Option<Arc<EnvironmentMap>>,

    pub(crate) ready: bool,
}

impl Pipeline {
    /// Creates a new pipeline on a GPU context.
    pub fn new(context: &Context) -> Result<Self, Error> {
        Self::with_kernels(context, KernelSet::default())
    }

    pub fn with_kernels(context: &Context, sources: KernelSet) -> Result<Self, Error> {
        let blit_binds = || {
            HashMap::from([
                ("Globals", BindingPoint::UniformBlock(0)),
                ("Direction", BindingPoint::UniformBlock(1)),
                ("capture", BindingPoint::Texture(2)),
                ("cube_out", BindingPoint::StorageTexture(3)),
            ])
        };

        let mut masked_binds = blit_binds();
        masked_binds.insert("sky_mask", BindingPoint::Texture(4));

        let convolve_binds = || {
            HashMap::from([
                ("Convolve", BindingPoint::UniformBlock(0)),
                ("source", BindingPoint::Texture(1)),
                ("source_sampler", BindingPoint::Sampler(2)),
                ("chain_out", BindingPoint::StorageTexture(3)),
            ])
        };

        Ok(Self {
            face_blit_kernel: Kernel::new(context.clone(), sources.face_blit, blit_binds()),
            face_blit_masked_kernel: Kernel::new(
                context.clone(),
                sources.face_blit_masked,
                masked_binds,
            ),
            atlas_combine_kernel: Kernel::new(
                context.clone(),
                sources.atlas_combine,
                HashMap::from([
                    ("Globals", BindingPoint::UniformBlock(0)),
                    ("Direction", BindingPoint::UniformBlock(1)),
                    ("capture", BindingPoint::Texture(2)),
                    ("capture_sampler", BindingPoint::Sampler(3)),
                    ("atlas_out", BindingPoint::StorageTexture(4)),
                ]),
            ),
            atlas_resolve_kernel: Kernel::new(
                context.clone(),
                sources.atlas_resolve,
                HashMap::from([
                    ("Globals", BindingPoint::UniformBlock(0)),
                    ("lut", BindingPoint::Texture(1)),
                    ("atlas", BindingPoint::Texture(2)),
                    ("atlas_sampler", BindingPoint::Sampler(3)),
                    ("cube_out", BindingPoint::StorageTexture(4)),
                ]),
            ),
            convolve_ggx_kernel: Kernel::new(context.clone(), sources.convolve_ggx, convolve_binds()),
            convolve_gaussian_kernel: Kernel::new(
                context.clone(),
                sources.convolve_gaussian,
                convolve_binds(),
            ),
            capture_color: Texture::new(
                context.clone(),
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            ),
            capture_depth: Texture::new(context.clone(), wgpu::TextureUsages::RENDER_ATTACHMENT),
            atlas: Texture::new(
                context.clone(),
                wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            ),
            cubemap: Texture::new(
                context.clone(),
                wgpu::TextureUsages::STORAGE_BINDING
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
            ),
            lut_texture: Texture::new(
                context.clone(),
                wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            ),
            mask_texture: Texture::new(
                context.clone(),
                wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            ),
            globals_buffer: UniformBuffer::new(context.clone()),
            direction_buffers: vec![],
            convolve_buffers: vec![],
            linear_sampler: context.device().create_sampler(&wgpu::SamplerDescriptor {
                label: Some("linear-clamp"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            }),
            capture_query: Query::new(context.clone()),
            viewpoint: CaptureViewpoint::default(),
            projection: CaptureProjection::CubeFaces,
            resolution: 0,
            format: ColorFormat::Rgba16Float,
            supersampling: 0,
            filter: SpecularFilter::default(),
            policy: UpdatePolicy::Manual,
            mip_levels: vec![],
            has_masks: false,
            gate: UpdateGate::default(),
            publish_targets: [None, None],
            publish_index: 0,
            published: None,
            ready: false,
            context: context.clone(),
        })
    }

    /// Updates this pipeline to match the given settings or returns an error.
    ///
    /// On error the pipeline is left not-ready: `advance` and `capture_now`
    /// are guaranteed no-ops until an update succeeds. The failed settings
    /// fields stay dirty and are retried on the next call.
    pub fn update(&mut self, settings: &mut Settings) -> Result<bool, Error> {
        match self.try_update(settings) {
            Ok(invalidated) => {
                self.ready = true;

                if invalidated {
                    self.invalidate_published();
                    self.gate.reset();
                }

                Ok(invalidated)
            }
            Err(error) => {
                self.ready = false;
                Err(error)
            }
        }
    }

    fn try_update(&mut self, settings: &mut Settings) -> Result<bool, Error> {
        let mut invalidated = false;

        invalidated |= Dirty::clean(&mut settings.viewpoint, |viewpoint| {
            self.viewpoint = *viewpoint;

            Ok(())
        })?;

        let capture_changed = Dirty::clean(&mut settings.capture, |capture| {
            self.setup_capture(capture)
        })?;

        if capture_changed {
            // derived state must be rebuilt against the new chain layout
            Dirty::dirty(&mut settings.convolution);
            Dirty::dirty(&mut settings.direction_lut);
            Dirty::dirty(&mut settings.sky_visibility);
        }

        invalidated |= capture_changed;

        invalidated |= Dirty::clean(&mut settings.convolution, |filter| {
            self.setup_convolution(filter)
        })?;

        invalidated |= Dirty::clean(&mut settings.direction_lut, |lut| {
            self.upload_direction_lut(lut.as_ref())
        })?;

        invalidated |= Dirty::clean(&mut settings.sky_visibility, |masks| {
            self.upload_sky_visibility(masks.as_ref())
        })?;

        self.face_blit_kernel.rebuild()?;
        self.face_blit_masked_kernel.rebuild()?;
        self.atlas_combine_kernel.rebuild()?;
        self.atlas_resolve_kernel.rebuild()?;
        self.convolve_ggx_kernel.rebuild()?;
        self.convolve_gaussian_kernel.rebuild()?;

        Ok(invalidated)
    }

    fn setup_capture(&mut self, capture: &CaptureSettings) -> Result<(), Error> {
        let resolution = capture.resolution.get();

        if !resolution.is_power_of_two() || resolution < 4 {
            return Err(Error::config(
                "capture resolution must be a power of two, at least 4",
            ));
        }

        let storage_format = match capture.format.storage_format() {
            Some(format) => format,
            None => {
                return Err(Error::config(
                    "capture format cannot be storage-written by the filtered chain",
                ))
            }
        };

        if capture.format == ColorFormat::Rgba32Float && !self.context.supports_float32_filtering()
        {
            return Err(Error::config("device cannot filter RGBA32F textures"));
        }

        if capture.projection == CaptureProjection::Tetrahedral && capture.lut_supersampling < 2 {
            // the wide capture FOV over-draws each face by more than 1.6x
            return Err(Error::config(
                "tetrahedral atlas supersampling must be at least 2",
            ));
        }

        let format = capture.format.texture_format();
        let mip_levels = mip_chain(resolution);
        let size = resolution as usize;

        self.capture_color.create(size, size, format)?;
        self.capture_depth
            .create(size, size, wgpu::TextureFormat::Depth32Float)?;

        self.cubemap
            .create_array_with_mips(size, size, 6, mip_levels.len(), format)?;

        let atlas_resolution = if capture.projection == CaptureProjection::Tetrahedral {
            let atlas_size = size * capture.lut_supersampling as usize;
            self.atlas.create(atlas_size, atlas_size, format)?;
            atlas_size as u32
        } else {
            self.atlas.invalidate();
            0
        };

        let direction_count = capture.projection.direction_count();

        self.globals_buffer.write(&GlobalData {
            face_resolution: resolution,
            atlas_resolution,
            direction_count: direction_count as u32,
            flags: 0,
            sky_tint: [
                capture.sky_tint[0].max(0.0),
                capture.sky_tint[1].max(0.0),
                capture.sky_tint[2].max(0.0),
                1.0,
            ],
        })?;

        while self.direction_buffers.len() < direction_count {
            self.direction_buffers
                .push(UniformBuffer::new(self.context.clone()));
        }

        self.direction_buffers.truncate(direction_count);

        for (index, buffer) in self.direction_buffers.iter_mut().enumerate() {
            buffer.write(&DirectionData {
                index: index as u32,
                padding: [0; 3],
            })?;
        }

        self.face_blit_kernel.set_define("FORMAT", storage_format);
        self.face_blit_masked_kernel.set_define("FORMAT", storage_format);
        self.atlas_combine_kernel.set_define("FORMAT", storage_format);
        self.atlas_resolve_kernel.set_define("FORMAT", storage_format);
        self.convolve_ggx_kernel.set_define("FORMAT", storage_format);
        self.convolve_gaussian_kernel.set_define("FORMAT", storage_format);

        self.publish_targets = [
            Some(Arc::new(EnvironmentMap::create(
                &self.context,
                resolution,
                capture.format,
                &mip_levels,
            )?)),
            Some(Arc::new(EnvironmentMap::create(
                &self.context,
                resolution,
                capture.format,
                &mip_levels,
            )?)),
        ];
        self.publish_index = 0;

        self.resolution = resolution;
        self.projection = capture.projection;
        self.format = capture.format;
        self.supersampling = capture.lut_supersampling;
        self.policy = capture.update_policy;
        self.mip_levels = mip_levels;

        Ok(())
    }

    fn setup_convolution(&mut self, filter: &SpecularFilter) -> Result<(), Error> {
        if let SpecularFilter::Ggx { samples } = filter {
            if *samples == 0 {
                return Err(Error::config("GGX sample count must be positive"));
            }
        }

        while self.convolve_buffers.len() < self.mip_levels.len() {
            self.convolve_buffers
                .push(UniformBuffer::new(self.context.clone()));
        }

        self.convolve_buffers.truncate(self.mip_levels.len());

        for (descriptor, buffer) in self.mip_levels.iter().zip(&mut self.convolve_buffers) {
            let data = match filter {
                SpecularFilter::Ggx { samples } => ConvolveData {
                    resolution: descriptor.resolution,
                    samples: *samples,
                    radius: 0,
                    padding0: 0,
                    roughness: descriptor.roughness,
                    offset: 0.0,
                    padding1: [0.0; 2],
                },
                SpecularFilter::Gaussian { radius, offset } => ConvolveData {
                    resolution: descriptor.resolution,
                    samples: 0,
                    radius: *radius,
                    padding0: 0,
                    roughness: descriptor.roughness,
                    offset: *offset,
                    padding1: [0.0; 2],
                },
            };

            buffer.write(&data)?;
        }

        self.filter = *filter;

        Ok(())
    }

    fn upload_direction_lut(&mut self, lut: Option<&DirectionLut>) -> Result<(), Error> {
        if self.projection != CaptureProjection::Tetrahedral {
            if lut.is_some() {
                debug!("direction LUT ignored by the six-face projection");
            }

            self.lut_texture.invalidate();

            return Ok(());
        }

        let lut = match lut {
            Some(lut) => lut,
            None => {
                return Err(Error::setup(
                    "tetrahedral projection requires a direction LUT",
                ))
            }
        };

        lut.validate()?;

        let expected = LutKey {
            resolution: self.resolution,
            supersampling: self.supersampling,
            fov_x: TETRAHEDRON_LUT_FOV_X,
            fov_y: TETRAHEDRON_FOV_Y,
        };

        if lut.key != expected {
            return Err(Error::config(format!(
                "direction LUT key {:?} does not match the configuration {:?}",
                lut.key, expected
            )));
        }

        let size = self.resolution as usize;

        self.lut_texture
            .create_array(size, size, 6, wgpu::TextureFormat::Rg16Float)?;

        let texels = size * size;

        for face in 0..CUBE_FACE_COUNT {
            let mut data = Vec::with_capacity(texels * 4);

            for &[u, v] in &lut.entries[face * texels..(face + 1) * texels] {
                data.extend_from_slice(&half::f16::from_f32(u).to_bits().to_le_bytes());
                data.extend_from_slice(&half::f16::from_f32(v).to_bits().to_le_bytes());
            }

            self.lut_texture.upload_layer(face, &data);
        }

        Ok(())
    }

    fn upload_sky_visibility(&mut self, masks: Option<&SkyVisibilityMasks>) -> Result<(), Error> {
        let masks = match masks {
            Some(masks) => masks,
            None => {
                self.mask_texture.invalidate();
                self.has_masks = false;

                return Ok(());
            }
        };

        if self.projection == CaptureProjection::Tetrahedral {
            warn!("sky visibility masks are a six-face feature, ignoring");

            self.mask_texture.invalidate();
            self.has_masks = false;

            return Ok(());
        }

        masks.validate()?;

        if masks.resolution != self.resolution {
            return Err(Error::config(format!(
                "sky visibility masks are {}x, the capture is {}x",
                masks.resolution, self.resolution
            )));
        }

        let size = self.resolution as usize;

        self.mask_texture
            .create_array(size, size, 6, wgpu::TextureFormat::R8Unorm)?;

        for (face, mask) in masks.faces.iter().enumerate() {
            self.mask_texture.upload_layer(face, mask);
        }

        self.has_masks = true;

        Ok(())
    }

    /// Whether the last `update` succeeded.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn mip_levels(&self) -> &[MipLevelDescriptor] {
        &self.mip_levels
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

#[repr(align(16), C)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy, Debug, Default)]
pub(crate) struct GlobalData {
    face_resolution: u32,
    atlas_resolution: u32,
    direction_count: u32,
    flags: u32,
    sky_tint: [f32; 4],
}

#[repr(align(16), C)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy, Debug, Default)]
pub(crate) struct DirectionData {
    index: u32,
    padding: [u32; 3],
}

#[repr(align(16), C)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy, Debug, Default)]
pub(crate) struct ConvolveData {
    resolution: u32,
    samples: u32,
    radius: u32,
    padding0: u32,
    roughness: f32,
    offset: f32,
    padding1: [f32; 2],
}
