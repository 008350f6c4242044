use parhelion::kernels::KernelInfo;
use parhelion::*;

use std::num::NonZeroU32;

fn context() -> Option<Context> {
    let _ = env_logger::builder().is_test(true).try_init();

    match Context::new() {
        Ok(context) => Some(context),
        Err(error) => {
            eprintln!("no GPU available, skipping: {}", error);
            None
        }
    }
}

/// Clears every capture to a per-direction color; no geometry.
struct ClearRenderer {
    colors: Vec<wgpu::Color>,
    calls: usize,
}

impl ClearRenderer {
    fn uniform(color: wgpu::Color) -> Self {
        Self {
            colors: vec![color],
            calls: 0,
        }
    }

    fn per_direction(colors: Vec<wgpu::Color>) -> Self {
        Self { colors, calls: 0 }
    }
}

impl SceneRenderer for ClearRenderer {
    fn render(
        &mut self,
        _context: &Context,
        encoder: &mut wgpu::CommandEncoder,
        target: &CaptureTarget,
        frame: &ViewpointFrame,
    ) -> Result<(), Error> {
        self.calls += 1;

        let color = self.colors[frame.direction_index % self.colors.len()];

        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("test-clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        Ok(())
    }
}

fn decode_rgba16f(bytes: &[u8]) -> Vec<[f32; 4]> {
    bytes
        .chunks_exact(8)
        .map(|texel| {
            let mut channels = [0.0; 4];

            for (channel, pair) in channels.iter_mut().zip(texel.chunks_exact(2)) {
                *channel = half::f16::from_le_bytes([pair[0], pair[1]]).to_f32();
            }

            channels
        })
        .collect()
}

#[test]
fn six_face_capture_publishes_a_filtered_chain() {
    let context = match context() {
        Some(context) => context,
        None => return,
    };

    let mut settings = Settings::default();

    Dirty::modify(&mut settings.capture, |capture| {
        capture.update_policy = UpdatePolicy::Manual;
    });

    let mut pipeline = Pipeline::new(&context).unwrap();
    pipeline.update(&mut settings).unwrap();

    assert!(pipeline.is_ready());
    assert!(pipeline.published_map().is_none());

    let color = wgpu::Color {
        r: 0.25,
        g: 0.5,
        b: 0.75,
        a: 1.0,
    };

    let mut renderer = ClearRenderer::uniform(color);
    pipeline.capture_now(&mut renderer);

    assert_eq!(renderer.calls, 6);

    let map = pipeline.published_map().expect("a map was published");

    assert_eq!(map.resolution(), 128);
    assert_eq!(map.mip_levels().len(), 7);

    // a uniform environment must stay uniform through every filtered level
    for mip in 0..map.mip_levels().len() as u32 {
        let texels = decode_rgba16f(&map.read_face(&context, 0, mip).unwrap());

        for texel in texels {
            assert!((texel[0] - 0.25).abs() < 0.02, "mip {}: {:?}", mip, texel);
            assert!((texel[1] - 0.5).abs() < 0.02, "mip {}: {:?}", mip, texel);
            assert!((texel[2] - 0.75).abs() < 0.02, "mip {}: {:?}", mip, texel);
        }
    }

    // walk every edge of a convolved mip and compare each border texel with
    // its across-the-seam neighbor
    let mip = 2u32;
    let resolution = map.mip_levels()[mip as usize].resolution;

    let faces: Vec<_> = (0..6)
        .map(|face| decode_rgba16f(&map.read_face(&context, face, mip).unwrap()))
        .collect();

    let texel = |face: usize, x: u32, y: u32| faces[face][(y * resolution + x) as usize];

    for (face, x, y) in face_texels(resolution) {
        if x != 0 && x != resolution - 1 && y != 0 && y != resolution - 1 {
            continue;
        }

        for (dx, dy) in [(-1i64, 0i64), (1, 0), (0, -1), (0, 1)] {
            let (nf, nx, ny) = wrap_texel(face, i64::from(x) + dx, i64::from(y) + dy, resolution);

            let here = texel(face, x, y);
            let there = texel(nf, nx, ny);

            for channel in 0..3 {
                assert!(
                    (here[channel] - there[channel]).abs() < 0.02,
                    "seam jump at face {} ({}, {})",
                    face,
                    x,
                    y
                );
            }
        }
    }
}

#[test]
fn faces_land_on_their_cube_layers() {
    let context = match context() {
        Some(context) => context,
        None => return,
    };

    let mut settings = Settings::default();

    Dirty::modify(&mut settings.capture, |capture| {
        capture.resolution = NonZeroU32::new(16).unwrap();
        capture.update_policy = UpdatePolicy::Manual;
    });

    let mut pipeline = Pipeline::new(&context).unwrap();
    pipeline.update(&mut settings).unwrap();

    let colors: Vec<_> = (0..6)
        .map(|index| wgpu::Color {
            r: (index + 1) as f64 / 8.0,
            g: 0.0,
            b: 0.0,
            a: 1.0,
        })
        .collect();

    let mut renderer = ClearRenderer::per_direction(colors);
    pipeline.capture_now(&mut renderer);

    let map = pipeline.published_map().unwrap();

    for face in 0..6 {
        let texels = decode_rgba16f(&map.read_face(&context, face, 0).unwrap());
        let expected = (face + 1) as f32 / 8.0;

        assert!(
            (texels[0][0] - expected).abs() < 0.01,
            "face {} holds {:?}",
            face,
            texels[0]
        );
    }
}

#[test]
fn refilter_leaves_mip_zero_untouched() {
    let context = match context() {
        Some(context) => context,
        None => return,
    };

    let mut settings = Settings::default();

    Dirty::modify(&mut settings.capture, |capture| {
        capture.resolution = NonZeroU32::new(32).unwrap();
        capture.update_policy = UpdatePolicy::Manual;
    });

    let mut pipeline = Pipeline::new(&context).unwrap();
    pipeline.update(&mut settings).unwrap();

    let mut renderer = ClearRenderer::uniform(wgpu::Color {
        r: 0.125,
        g: 0.25,
        b: 0.375,
        a: 1.0,
    });

    pipeline.capture_now(&mut renderer);

    let before = pipeline
        .published_map()
        .unwrap()
        .read_face(&context, 2, 0)
        .unwrap();

    assert!(pipeline.refilter());

    let after = pipeline
        .published_map()
        .unwrap()
        .read_face(&context, 2, 0)
        .unwrap();

    assert_eq!(before, after);
}

#[test]
fn manual_policy_ignores_advance() {
    let context = match context() {
        Some(context) => context,
        None => return,
    };

    let mut settings = Settings::default();

    Dirty::modify(&mut settings.capture, |capture| {
        capture.resolution = NonZeroU32::new(16).unwrap();
        capture.update_policy = UpdatePolicy::Manual;
    });

    let mut pipeline = Pipeline::new(&context).unwrap();
    pipeline.update(&mut settings).unwrap();

    let mut renderer = ClearRenderer::uniform(wgpu::Color::BLACK);

    for tick in 0..100 {
        pipeline.advance(&mut renderer, tick as f64 / 60.0);
    }

    assert_eq!(renderer.calls, 0);
    assert!(pipeline.published_map().is_none());

    pipeline.capture_now(&mut renderer);

    assert_eq!(renderer.calls, 6);
    assert!(pipeline.published_map().is_some());
}

static BROKEN: KernelInfo = KernelInfo {
    name: "broken",
    entry: "blit",
    code: "this {{FORMAT}} is not a shader",
};

#[test]
fn broken_kernel_latches_the_pipeline_not_ready() {
    let context = match context() {
        Some(context) => context,
        None => return,
    };

    let mut settings = Settings::default();

    Dirty::modify(&mut settings.capture, |capture| {
        capture.update_policy = UpdatePolicy::EveryTick;
    });

    let sources = KernelSet {
        face_blit: &BROKEN,
        ..Default::default()
    };

    let mut pipeline = Pipeline::with_kernels(&context, sources).unwrap();

    let error = pipeline.update(&mut settings).unwrap_err();
    assert!(matches!(error, Error::Setup(_)));
    assert!(!pipeline.is_ready());

    let mut renderer = ClearRenderer::uniform(wgpu::Color::BLACK);

    for tick in 0..100 {
        pipeline.advance(&mut renderer, tick as f64 / 60.0);
    }

    assert_eq!(renderer.calls, 0);
    assert!(pipeline.published_map().is_none());
}

#[test]
fn a_broken_kernel_still_fails_the_next_update() {
    let context = match context() {
        Some(context) => context,
        None => return,
    };

    let mut settings = Settings::default();

    Dirty::modify(&mut settings.capture, |capture| {
        capture.update_policy = UpdatePolicy::EveryTick;
    });

    let sources = KernelSet {
        face_blit: &BROKEN,
        ..Default::default()
    };

    let mut pipeline = Pipeline::with_kernels(&context, sources).unwrap();

    assert!(pipeline.update(&mut settings).is_err());

    // the settings are clean now, but the failed compile must not be
    // forgotten: retrying may not restore readiness or publish anything
    let error = pipeline.update(&mut settings).unwrap_err();
    assert!(matches!(error, Error::Setup(_)));
    assert!(!pipeline.is_ready());

    let mut renderer = ClearRenderer::uniform(wgpu::Color::BLACK);

    for tick in 0..100 {
        pipeline.advance(&mut renderer, tick as f64 / 60.0);
    }

    assert_eq!(renderer.calls, 0);
    assert!(pipeline.published_map().is_none());
}

#[test]
fn direction_lut_builds_are_deterministic_and_in_bounds() {
    let context = match context() {
        Some(context) => context,
        None => return,
    };

    let mut builder = LutBuilder::new(&context);

    let first = builder.build(64, 2).unwrap();
    let second = builder.build(64, 2).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.key.resolution, 64);
    assert_eq!(first.key.supersampling, 2);
    assert_eq!(first.entries.len(), DirectionLut::expected_len(64));

    // validate() already bounds-checks; spot-check the quadrant layout by
    // making sure all four quadrants are actually referenced
    let mut quadrants = [false; 4];

    for &[u, v] in &first.entries {
        let quadrant = (u * 2.0).min(1.99) as usize + 2 * (v * 2.0).min(1.99) as usize;
        quadrants[quadrant] = true;
    }

    assert_eq!(quadrants, [true; 4]);
}

#[test]
fn tetrahedral_capture_publishes_a_filtered_chain() {
    let context = match context() {
        Some(context) => context,
        None => return,
    };

    let mut builder = LutBuilder::new(&context);
    let lut = builder.build(64, 2).unwrap();

    let mut settings = Settings::default();

    Dirty::modify(&mut settings.capture, |capture| {
        capture.resolution = NonZeroU32::new(64).unwrap();
        capture.projection = CaptureProjection::Tetrahedral;
        capture.update_policy = UpdatePolicy::Manual;
    });

    settings.direction_lut = Dirty::new(Some(lut));

    let mut pipeline = Pipeline::new(&context).unwrap();
    pipeline.update(&mut settings).unwrap();

    let color = wgpu::Color {
        r: 0.5,
        g: 0.25,
        b: 0.125,
        a: 1.0,
    };

    let mut renderer = ClearRenderer::uniform(color);
    pipeline.capture_now(&mut renderer);

    assert_eq!(renderer.calls, 4);

    let map = pipeline.published_map().expect("a map was published");

    for face in 0..6 {
        let texels = decode_rgba16f(&map.read_face(&context, face, 0).unwrap());

        for texel in texels {
            assert!((texel[0] - 0.5).abs() < 0.02, "face {}: {:?}", face, texel);
            assert!((texel[1] - 0.25).abs() < 0.02, "face {}: {:?}", face, texel);
        }
    }
}

#[test]
fn tetrahedral_resolve_never_blends_across_quadrants() {
    let context = match context() {
        Some(context) => context,
        None => return,
    };

    let mut builder = LutBuilder::new(&context);
    let lut = builder.build(64, 2).unwrap();

    let mut settings = Settings::default();

    Dirty::modify(&mut settings.capture, |capture| {
        capture.resolution = NonZeroU32::new(64).unwrap();
        capture.projection = CaptureProjection::Tetrahedral;
        capture.update_policy = UpdatePolicy::Manual;
    });

    settings.direction_lut = Dirty::new(Some(lut));

    let mut pipeline = Pipeline::new(&context).unwrap();
    pipeline.update(&mut settings).unwrap();

    // one flat color per capture direction; any cube texel resolved from
    // the atlas must then match exactly one of them, never a mix of two
    let colors: Vec<f32> = vec![0.2, 0.4, 0.6, 0.8];

    let mut renderer = ClearRenderer::per_direction(
        colors
            .iter()
            .map(|&r| wgpu::Color {
                r: r as f64,
                g: 0.0,
                b: 0.0,
                a: 1.0,
            })
            .collect(),
    );

    pipeline.capture_now(&mut renderer);

    let map = pipeline.published_map().unwrap();

    for face in 0..6 {
        for texel in decode_rgba16f(&map.read_face(&context, face, 0).unwrap()) {
            let nearest = colors
                .iter()
                .map(|color| (texel[0] - color).abs())
                .fold(f32::MAX, f32::min);

            assert!(nearest < 0.05, "face {} blended texel {:?}", face, texel);
        }
    }
}

#[test]
fn tetrahedral_update_without_a_lut_is_an_error() {
    let context = match context() {
        Some(context) => context,
        None => return,
    };

    let mut settings = Settings::default();

    Dirty::modify(&mut settings.capture, |capture| {
        capture.projection = CaptureProjection::Tetrahedral;
    });

    let mut pipeline = Pipeline::new(&context).unwrap();

    assert!(pipeline.update(&mut settings).is_err());
    assert!(!pipeline.is_ready());

    let mut renderer = ClearRenderer::uniform(wgpu::Color::BLACK);
    pipeline.capture_now(&mut renderer);

    assert_eq!(renderer.calls, 0);
}

#[test]
fn mismatched_lut_key_is_rejected() {
    let context = match context() {
        Some(context) => context,
        None => return,
    };

    let mut builder = LutBuilder::new(&context);
    let lut = builder.build(32, 2).unwrap();

    let mut settings = Settings::default();

    Dirty::modify(&mut settings.capture, |capture| {
        capture.resolution = NonZeroU32::new(64).unwrap();
        capture.projection = CaptureProjection::Tetrahedral;
    });

    settings.direction_lut = Dirty::new(Some(lut));

    let mut pipeline = Pipeline::new(&context).unwrap();

    let error = pipeline.update(&mut settings).unwrap_err();
    assert!(matches!(error, Error::ConfigMismatch(_)));
}

#[test]
fn sky_masks_tint_fully_visible_texels() {
    let context = match context() {
        Some(context) => context,
        None => return,
    };

    let resolution = 16u32;
    let texels = (resolution * resolution) as usize;

    // every texel of every face is sky
    let masks = SkyVisibilityMasks {
        resolution,
        faces: vec![vec![255; texels]; 6],
    };

    let mut settings = Settings::default();

    Dirty::modify(&mut settings.capture, |capture| {
        capture.resolution = NonZeroU32::new(resolution).unwrap();
        capture.update_policy = UpdatePolicy::Manual;
        capture.sky_tint = [0.0, 1.0, 0.0];
    });

    settings.sky_visibility = Dirty::new(Some(masks));

    let mut pipeline = Pipeline::new(&context).unwrap();
    pipeline.update(&mut settings).unwrap();

    let mut renderer = ClearRenderer::uniform(wgpu::Color::WHITE);
    pipeline.capture_now(&mut renderer);

    let map = pipeline.published_map().unwrap();
    let texels = decode_rgba16f(&map.read_face(&context, 0, 0).unwrap());

    for texel in texels {
        assert!(texel[0].abs() < 0.01, "{:?}", texel);
        assert!((texel[1] - 1.0).abs() < 0.01, "{:?}", texel);
        assert!(texel[2].abs() < 0.01, "{:?}", texel);
    }
}
