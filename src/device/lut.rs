#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::kernels::{self, KernelInfo};
use crate::{
    tetrahedron_directions, BindingPoint, CaptureSettings, Context, DirectionLut, Error, Kernel,
    LutKey, Pipeline, ReadbackBuffer, Texture, UniformBuffer, CUBE_FACE_COUNT, TETRAHEDRON_FOV_Y,
    TETRAHEDRON_LUT_FOV_X, WORKGROUP_SIZE,
};

use std::collections::HashMap;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

/// Builds the tetrahedral direction LUT on the GPU.
///
/// The table maps every cube face texel to the atlas coordinate whose
/// capture direction covers it; it is built once per configuration, read
/// back, and persisted by the host. Building is deterministic, so a stored
/// table and a freshly built one agree for the same key.
#[derive(Debug)]
pub struct LutBuilder {
    context: Context,
    kernel: Kernel,
    params_buffer: UniformBuffer<LutParamsData>,
    basis_buffer: UniformBuffer<TetraBasisData>,
    target: Texture,
    readback: ReadbackBuffer<[[f32; 2]]>,
}

impl LutBuilder {
    pub fn new(context: &Context) -> Self {
        Self::with_kernel(context, &kernels::LUT_BUILD)
    }

    pub fn with_kernel(context: &Context, info: &'static KernelInfo) -> Self {
        Self {
            context: context.clone(),
            kernel: Kernel::new(
                context.clone(),
                info,
                HashMap::from([
                    ("LutParams", BindingPoint::UniformBlock(0)),
                    ("TetraBasis", BindingPoint::UniformBlock(1)),
                    ("lut_out", BindingPoint::StorageTexture(2)),
                ]),
            ),
            params_buffer: UniformBuffer::new(context.clone()),
            basis_buffer: UniformBuffer::new(context.clone()),
            target: Texture::new(
                context.clone(),
                wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
            ),
            readback: ReadbackBuffer::new(context.clone()),
        }
    }

    /// Builds the LUT for one cube resolution and atlas supersampling
    /// factor, blocking on the GPU for each face's readback.
    pub fn build(&mut self, resolution: u32, supersampling: u32) -> Result<DirectionLut, Error> {
        if !resolution.is_power_of_two() || resolution < 4 {
            return Err(Error::config(
                "LUT resolution must be a power of two, at least 4",
            ));
        }

        if supersampling < 2 {
            return Err(Error::config(
                "tetrahedral atlas supersampling must be at least 2",
            ));
        }

        self.kernel.rebuild()?;

        let size = resolution as usize;

        self.target
            .create(size, size, wgpu::TextureFormat::Rg32Float)?;

        let mut frames = [[[0.0f32; 4]; 3]; 4];

        for (frame, direction) in frames.iter_mut().zip(&tetrahedron_directions()) {
            // columns are the frame's right/up/forward axes
            frame[0] = [direction.right.x, direction.right.y, direction.right.z, 0.0];
            frame[1] = [direction.up.x, direction.up.y, direction.up.z, 0.0];
            frame[2] = [
                direction.forward.x,
                direction.forward.y,
                direction.forward.z,
                0.0,
            ];
        }

        self.basis_buffer.write(&TetraBasisData { frames })?;

        let tan_half_fov = [
            (TETRAHEDRON_LUT_FOV_X.to_radians() * 0.5).tan(),
            (TETRAHEDRON_FOV_Y.to_radians() * 0.5).tan(),
        ];

        let texels = size * size;
        let groups = resolution.div_ceil(WORKGROUP_SIZE);

        let mut entries = Vec::with_capacity(CUBE_FACE_COUNT * texels);
        let mut face_entries = vec![[0.0f32; 2]; texels];

        for face in 0..CUBE_FACE_COUNT {
            self.params_buffer.write(&LutParamsData {
                resolution,
                face: face as u32,
                atlas_resolution: resolution * supersampling,
                padding0: 0,
                tan_half_fov,
                padding1: [0.0; 2],
            })?;

            let mut encoder =
                self.context
                    .device()
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some("lut-build"),
                    });

            let lut_out = self.target.mip(0);

            let mut command = self.kernel.begin_dispatch();

            command.bind(&self.params_buffer, "LutParams");
            command.bind(&self.basis_buffer, "TetraBasis");
            command.bind(&lut_out, "lut_out");
            command.dispatch(&mut encoder, groups, groups, 1);

            self.context.queue().submit(Some(encoder.finish()));

            self.readback.start_readback(&self.target, 0, 0)?;

            if !self.readback.end_readback(&mut face_entries) {
                return Err(Error::setup("direction LUT readback failed"));
            }

            entries.extend_from_slice(&face_entries);
        }

        let lut = DirectionLut {
            key: LutKey {
                resolution,
                supersampling,
                fov_x: TETRAHEDRON_LUT_FOV_X,
                fov_y: TETRAHEDRON_FOV_Y,
            },
            entries,
        };

        lut.validate()?;

        Ok(lut)
    }
}

impl Pipeline {
    /// Builds the direction LUT matching the given capture settings, ready
    /// to hand back through `Settings::direction_lut`.
    pub fn build_direction_lut(&self, capture: &CaptureSettings) -> Result<DirectionLut, Error> {
        let mut builder = LutBuilder::new(self.context());

        builder.build(capture.resolution.get(), capture.lut_supersampling)
    }
}

#[repr(align(16), C)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy, Debug, Default)]
struct LutParamsData {
    resolution: u32,
    face: u32,
    atlas_resolution: u32,
    padding0: u32,
    tan_half_fov: [f32; 2],
    padding1: [f32; 2],
}

#[repr(align(16), C)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy, Debug, Default)]
struct TetraBasisData {
    frames: [[[f32; 4]; 3]; 4],
}
