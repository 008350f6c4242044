use cgmath::{vec3, InnerSpace, Rad, Vector3};

/// Tetrahedral capture field of view, degrees. These and the tilt below are
/// the hand-derived constants of the tetrahedral mapping and are kept to
/// their full published precision.
pub const TETRAHEDRON_FOV_X: f32 = 143.98570868;
pub const TETRAHEDRON_FOV_Y: f32 = 125.27438968;

/// Horizontal field of view used for LUT generation only; tuned separately
/// from the capture FOV.
pub const TETRAHEDRON_LUT_FOV_X: f32 = 131.55;

/// Tilt of the tetrahedral capture directions out of the horizon, degrees.
pub const TETRAHEDRON_TILT: f32 = 27.36780516;

pub const TETRAHEDRON_FACE_COUNT: usize = 4;

/// Orientation and projection of one capture direction.
///
/// `right`/`up`/`forward` are the render-space camera axes. Cube face
/// captures store rows bottom-up relative to the face layout (the blit
/// kernel reverses them), which is why the cube frames carry inverted up
/// vectors relative to `cube::face_direction`.
#[derive(Clone, Copy, Debug)]
pub struct CaptureDirection {
    pub right: Vector3<f32>,
    pub up: Vector3<f32>,
    pub forward: Vector3<f32>,
    /// Vertical field of view, degrees.
    pub fov_y: f32,
    pub aspect: f32,
}

/// The six axis-aligned cube face captures, in face order.
pub fn cube_face_directions() -> [CaptureDirection; 6] {
    let frame = |right, up, forward| CaptureDirection {
        right,
        up,
        forward,
        fov_y: 90.0,
        aspect: 1.0,
    };

    [
        frame(vec3(0.0, 0.0, -1.0), vec3(0.0, -1.0, 0.0), vec3(1.0, 0.0, 0.0)),
        frame(vec3(0.0, 0.0, 1.0), vec3(0.0, -1.0, 0.0), vec3(-1.0, 0.0, 0.0)),
        frame(vec3(1.0, 0.0, 0.0), vec3(0.0, 0.0, 1.0), vec3(0.0, 1.0, 0.0)),
        frame(vec3(1.0, 0.0, 0.0), vec3(0.0, 0.0, -1.0), vec3(0.0, -1.0, 0.0)),
        frame(vec3(1.0, 0.0, 0.0), vec3(0.0, -1.0, 0.0), vec3(0.0, 0.0, 1.0)),
        frame(vec3(-1.0, 0.0, 0.0), vec3(0.0, -1.0, 0.0), vec3(0.0, 0.0, -1.0)),
    ]
}

/// The four tetrahedral captures: two tilted below the horizon at yaw
/// 0°/180°, two tilted above at yaw ∓90°.
pub fn tetrahedron_directions() -> [CaptureDirection; 4] {
    let (s, c) = Rad::from(cgmath::Deg(TETRAHEDRON_TILT)).0.sin_cos();

    let aspect = TETRAHEDRON_FOV_X / TETRAHEDRON_FOV_Y;

    let frame = |right, up, forward| CaptureDirection {
        right,
        up,
        forward,
        fov_y: TETRAHEDRON_FOV_Y,
        aspect,
    };

    [
        frame(vec3(1.0, 0.0, 0.0), vec3(0.0, c, s), vec3(0.0, -s, c)),
        frame(vec3(-1.0, 0.0, 0.0), vec3(0.0, c, -s), vec3(0.0, -s, -c)),
        frame(vec3(0.0, 0.0, 1.0), vec3(s, c, 0.0), vec3(-c, s, 0.0)),
        frame(vec3(0.0, 0.0, -1.0), vec3(-s, c, 0.0), vec3(c, s, 0.0)),
    ]
}

impl CaptureDirection {
    /// Camera-space coordinates of a world direction.
    pub fn to_camera(&self, direction: Vector3<f32>) -> Vector3<f32> {
        vec3(
            direction.dot(self.right),
            direction.dot(self.up),
            direction.dot(self.forward),
        )
    }
}
