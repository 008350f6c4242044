#![deny(unsafe_code)]

#[allow(unused_imports)]
use log::{debug, info, warn};

macro_rules! export {
    [$( $module:ident ),* $(,)*] => {
        $(
            mod $module;
            pub use self::$module::*;
        )*
    };
}

export![device, domain, engine, error, settings];

/// WGSL compute kernels.
pub mod kernels {
    /// A compute kernel source together with its entry point.
    #[derive(Clone, Copy, Debug)]
    pub struct KernelInfo {
        pub name: &'static str,
        pub entry: &'static str,
        pub code: &'static str,
    }

    pub static FACE_BLIT: KernelInfo = KernelInfo {
        name: "face-blit",
        entry: "blit",
        code: include_str!("shaders/face_blit.wgsl"),
    };

    pub static FACE_BLIT_MASKED: KernelInfo = KernelInfo {
        name: "face-blit-masked",
        entry: "blit_masked",
        code: include_str!("shaders/face_blit.wgsl"),
    };

    pub static ATLAS_COMBINE: KernelInfo = KernelInfo {
        name: "atlas-combine",
        entry: "combine",
        code: include_str!("shaders/atlas_combine.wgsl"),
    };

    pub static ATLAS_RESOLVE: KernelInfo = KernelInfo {
        name: "atlas-resolve",
        entry: "resolve",
        code: include_str!("shaders/atlas_resolve.wgsl"),
    };

    pub static CONVOLVE_GGX: KernelInfo = KernelInfo {
        name: "convolve-ggx",
        entry: "convolve_ggx",
        code: include_str!("shaders/convolve_ggx.wgsl"),
    };

    pub static CONVOLVE_GAUSSIAN: KernelInfo = KernelInfo {
        name: "convolve-gaussian",
        entry: "convolve_gaussian",
        code: include_str!("shaders/convolve_gaussian.wgsl"),
    };

    pub static LUT_BUILD: KernelInfo = KernelInfo {
        name: "lut-build",
        entry: "build",
        code: include_str!("shaders/lut_build.wgsl"),
    };
}
