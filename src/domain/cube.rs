use cgmath::{vec3, Vector3};
use itertools::iproduct;

/// Cube face order: +X, -X, +Y, -Y, +Z, -Z.
pub const CUBE_FACE_COUNT: usize = 6;

/// Direction through a face texel, `u`/`v` in [-1, 1] with `v` increasing
/// toward the bottom texel row. This is the standard WebGPU cube layout;
/// the capture frames, the kernels and the LUT builder all derive from this
/// one table.
pub fn face_direction(face: usize, u: f32, v: f32) -> Vector3<f32> {
    match face {
        0 => vec3(1.0, -v, -u),
        1 => vec3(-1.0, -v, u),
        2 => vec3(u, 1.0, v),
        3 => vec3(u, -1.0, -v),
        4 => vec3(u, -v, 1.0),
        5 => vec3(-u, -v, -1.0),
        _ => panic!("no such cube face: {}", face),
    }
}

/// Unnormalized direction through the center of a face texel.
pub fn texel_direction(face: usize, x: u32, y: u32, resolution: u32) -> Vector3<f32> {
    let u = 2.0 * (x as f32 + 0.5) / resolution as f32 - 1.0;
    let v = 2.0 * (y as f32 + 0.5) / resolution as f32 - 1.0;

    face_direction(face, u, v)
}

/// Inverse of `face_direction`: the face a direction falls on, with its
/// in-face coordinates in [-1, 1].
pub fn direction_to_face_uv(direction: Vector3<f32>) -> (usize, f32, f32) {
    let Vector3 { x, y, z } = direction;
    let (ax, ay, az) = (x.abs(), y.abs(), z.abs());

    if ax >= ay && ax >= az {
        if x > 0.0 {
            (0, -z / ax, -y / ax)
        } else {
            (1, z / ax, -y / ax)
        }
    } else if ay >= az {
        if y > 0.0 {
            (2, x / ay, z / ay)
        } else {
            (3, x / ay, -z / ay)
        }
    } else if z > 0.0 {
        (4, x / az, -y / az)
    } else {
        (5, -x / az, -y / az)
    }
}

/// Maps a possibly out-of-range texel coordinate onto the neighboring face.
///
/// Stepping one texel past a face edge lands on the texel sharing that edge
/// on the adjacent face; this is what the seam continuity test walks.
pub fn wrap_texel(face: usize, x: i64, y: i64, resolution: u32) -> (usize, u32, u32) {
    let size = i64::from(resolution);

    if x >= 0 && x < size && y >= 0 && y < size {
        return (face, x as u32, y as u32);
    }

    let u = 2.0 * (x as f32 + 0.5) / resolution as f32 - 1.0;
    let v = 2.0 * (y as f32 + 0.5) / resolution as f32 - 1.0;

    let (face, u, v) = direction_to_face_uv(face_direction(face, u, v));

    let limit = resolution - 1;
    let x = (((u * 0.5 + 0.5) * resolution as f32) as u32).min(limit);
    let y = (((v * 0.5 + 0.5) * resolution as f32) as u32).min(limit);

    (face, x, y)
}

/// All `(face, x, y)` texel coordinates of a cube at some resolution.
pub fn face_texels(resolution: u32) -> impl Iterator<Item = (usize, u32, u32)> {
    iproduct!(0..CUBE_FACE_COUNT, 0..resolution, 0..resolution).map(|(face, y, x)| (face, x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    #[test]
    fn face_uv_round_trips() {
        for (face, x, y) in face_texels(16) {
            let direction = texel_direction(face, x, y, 16);
            let (rt_face, u, v) = direction_to_face_uv(direction);

            assert_eq!(face, rt_face);

            let expected = texel_direction(face, x, y, 16).normalize();
            let actual = face_direction(rt_face, u, v).normalize();

            assert!((expected - actual).magnitude() < 1e-5);
        }
    }

    #[test]
    fn wrapping_crosses_onto_an_adjacent_face() {
        let resolution = 8;

        for face in 0..CUBE_FACE_COUNT {
            for t in 0..resolution {
                let (neighbor, _, _) = wrap_texel(face, -1, i64::from(t), resolution);
                assert_ne!(neighbor, face);

                let (neighbor, _, _) = wrap_texel(face, i64::from(resolution), i64::from(t), resolution);
                assert_ne!(neighbor, face);
            }
        }
    }

    #[test]
    fn wrapped_texels_are_edge_adjacent() {
        let resolution = 8;

        for face in 0..CUBE_FACE_COUNT {
            for t in 0..resolution {
                let inside = texel_direction(face, 0, t, resolution).normalize();
                let (nf, nx, ny) = wrap_texel(face, -1, i64::from(t), resolution);
                let outside = texel_direction(nf, nx, ny, resolution).normalize();

                // one texel apart on the unit sphere, give or take projection
                assert!(inside.dot(outside) > 0.9);
            }
        }
    }
}
