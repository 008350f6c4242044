export![
    context,
    kernel,
    query,
    readback_buffer,
    texture,
    uniform_buffer
];
