#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{
    cube_face_directions, tetrahedron_directions, CaptureDirection, CaptureProjection,
    CaptureViewpoint, Context, Error, Pipeline, Query, UpdatePolicy,
};

use cgmath::prelude::*;
use cgmath::{Deg, Matrix4, Point3, Vector3};

/// Renders the scene into one capture direction's target.
///
/// The pipeline drives this once per direction each pass; implementations
/// encode their render passes into the provided encoder. Returning an error
/// aborts the pass without publishing.
pub trait SceneRenderer {
    fn render(
        &mut self,
        context: &Context,
        encoder: &mut wgpu::CommandEncoder,
        target: &CaptureTarget,
        frame: &ViewpointFrame,
    ) -> Result<(), Error>;
}

/// Render target for one capture direction.
pub struct CaptureTarget<'a> {
    pub color: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub resolution: u32,
}

/// Camera parameters for one capture direction.
#[derive(Clone, Copy, Debug)]
pub struct ViewpointFrame {
    pub position: [f32; 3],
    pub right: [f32; 3],
    pub up: [f32; 3],
    pub forward: [f32; 3],
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub aspect: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub visibility_mask: u32,
    pub direction_index: usize,
}

impl ViewpointFrame {
    pub(crate) fn from_direction(
        viewpoint: &CaptureViewpoint,
        direction: &CaptureDirection,
        index: usize,
    ) -> Self {
        Self {
            position: viewpoint.position,
            right: direction.right.into(),
            up: direction.up.into(),
            forward: direction.forward.into(),
            fov_y: direction.fov_y,
            aspect: direction.aspect,
            near_plane: viewpoint.near_plane,
            far_plane: viewpoint.far_plane,
            visibility_mask: viewpoint.visibility_mask,
            direction_index: index,
        }
    }

    /// World-to-camera matrix; camera depth increases along `forward`.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        let right = Vector3::from(self.right);
        let up = Vector3::from(self.up);
        let forward = Vector3::from(self.forward);
        let position = Point3::from(self.position).to_vec();

        Matrix4::new(
            right.x,
            up.x,
            forward.x,
            0.0,
            right.y,
            up.y,
            forward.y,
            0.0,
            right.z,
            up.z,
            forward.z,
            0.0,
            -position.dot(right),
            -position.dot(up),
            -position.dot(forward),
            1.0,
        )
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        cgmath::perspective(Deg(self.fov_y), self.aspect, self.near_plane, self.far_plane)
    }
}

/// Timing for the most recently measured capture pass.
#[derive(Clone, Copy, Debug)]
pub struct CaptureStatistics {
    pub frame_time_us: f32,
}

/// Pure scheduler deciding when a capture pass may run.
///
/// Time is caller-provided, in seconds on any monotonic base. Under a fixed
/// rate, missed windows are skipped rather than queued up.
#[derive(Clone, Copy, Debug, Default)]
pub struct UpdateGate {
    next_allowed: f64,
}

impl UpdateGate {
    pub fn reset(&mut self) {
        self.next_allowed = 0.0;
    }

    /// Whether a pass may run at `now`; a permitted fixed-rate pass advances
    /// the window to `now + 1 / rate`.
    pub fn permits(&mut self, policy: UpdatePolicy, now: f64) -> bool {
        match policy {
            UpdatePolicy::EveryTick => true,
            UpdatePolicy::Manual => false,
            UpdatePolicy::FixedRate { rate } => {
                if !(rate > 0.0) {
                    return false;
                }

                if now < self.next_allowed {
                    return false;
                }

                self.next_allowed = now + 1.0 / f64::from(rate);
                true
            }
        }
    }
}

impl Pipeline {
    /// Runs a capture pass if the update policy permits one at `now`.
    ///
    /// Does nothing when the pipeline is not ready. Statistics lag by at
    /// least a pass and are `None` until a measurement completes, or always
    /// on devices without timestamp support.
    pub fn advance(
        &mut self,
        renderer: &mut dyn SceneRenderer,
        now: f64,
    ) -> Option<CaptureStatistics> {
        if !self.ready {
            return None;
        }

        if !self.gate.permits(self.policy, now) {
            return None;
        }

        self.capture_pass(renderer)
    }

    /// Runs a capture pass immediately, regardless of the update policy.
    pub fn capture_now(&mut self, renderer: &mut dyn SceneRenderer) -> Option<CaptureStatistics> {
        if !self.ready {
            return None;
        }

        self.capture_pass(renderer)
    }

    fn capture_pass(&mut self, renderer: &mut dyn SceneRenderer) -> Option<CaptureStatistics> {
        let directions: Vec<CaptureDirection> = match self.projection {
            CaptureProjection::CubeFaces => cube_face_directions().to_vec(),
            CaptureProjection::Tetrahedral => tetrahedron_directions().to_vec(),
        };

        for (index, direction) in directions.iter().enumerate() {
            let frame = ViewpointFrame::from_direction(&self.viewpoint, direction, index);

            let mut encoder = self
                .context
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("capture-direction"),
                });

            if index == 0 {
                self.capture_query.begin(&mut encoder);
            }

            let target = CaptureTarget {
                color: self.capture_color.render_target()?,
                depth: self.capture_depth.render_target()?,
                format: self.capture_color.format()?,
                resolution: self.resolution,
            };

            if let Err(error) = renderer.render(&self.context, &mut encoder, &target, &frame) {
                warn!("scene renderer failed, capture pass aborted: {}", error);

                return None;
            }

            self.reparameterize_direction(&mut encoder, index);
            self.context.queue().submit(Some(encoder.finish()));
        }

        let mut encoder = self
            .context
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("filter-and-publish"),
            });

        if self.projection == CaptureProjection::Tetrahedral {
            self.resolve_atlas(&mut encoder);
        }

        self.encode_convolution(&mut encoder);

        let target_index = self.publish_index ^ 1;
        self.encode_publish_copy(&mut encoder, target_index);

        self.capture_query.end(&mut encoder);
        self.context.queue().submit(Some(encoder.finish()));
        self.capture_query.finish();

        self.swap_published(target_index);

        if !Query::is_supported(&self.context) {
            return None;
        }

        let frame_time_us = self.capture_query.elapsed_us()?;

        Some(CaptureStatistics { frame_time_us })
    }
}
