mod settings;

pub use settings::Settings;

export![capture, convolution, dirty, viewpoint];
