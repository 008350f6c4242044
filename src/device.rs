export![
    capture,
    convolve,
    environment_map,
    lut,
    pipeline,
    reparameterize,
    sky_visibility
];
