#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{AsBindTarget, BindTarget, Context, Error};

/// Owned GPU image with create-if-changed semantics.
///
/// A texture is either a plain 2D image (`layers == 0`) or a 2D array; a
/// six-layer array additionally exposes cube views of every mip so the
/// convolution kernels can sample the lower level as a cubemap while
/// storage-writing the next one. Creating a texture with the layout and
/// format it already has is a no-op and keeps the contents.
#[derive(Debug)]
pub struct Texture {
    context: Context,
    handle: Option<wgpu::Texture>,
    usage: wgpu::TextureUsages,
    format: Option<wgpu::TextureFormat>,
    layout: (usize, usize, usize),
    mip_count: usize,
    default_view: Option<wgpu::TextureView>,
    mip_views: Vec<wgpu::TextureView>,
    cube_views: Vec<wgpu::TextureView>,
    layer_views: Vec<wgpu::TextureView>,
}

impl Texture {
    pub fn new(context: Context, usage: wgpu::TextureUsages) -> Self {
        Self {
            context,
            handle: None,
            usage,
            format: None,
            layout: (0, 0, 0),
            mip_count: 1,
            default_view: None,
            mip_views: vec![],
            cube_views: vec![],
            layer_views: vec![],
        }
    }

    pub fn create(
        &mut self,
        cols: usize,
        rows: usize,
        format: wgpu::TextureFormat,
    ) -> Result<(), Error> {
        self.create_internal(cols, rows, 0, 1, format)
    }

    pub fn create_array(
        &mut self,
        cols: usize,
        rows: usize,
        layers: usize,
        format: wgpu::TextureFormat,
    ) -> Result<(), Error> {
        self.create_internal(cols, rows, layers, 1, format)
    }

    pub fn create_array_with_mips(
        &mut self,
        cols: usize,
        rows: usize,
        layers: usize,
        mip_count: usize,
        format: wgpu::TextureFormat,
    ) -> Result<(), Error> {
        self.create_internal(cols, rows, layers, mip_count, format)
    }

    fn create_internal(
        &mut self,
        cols: usize,
        rows: usize,
        layers: usize,
        mip_count: usize,
        format: wgpu::TextureFormat,
    ) -> Result<(), Error> {
        assert!(cols > 0 && rows > 0, "invalid texture layout requested");

        if self.handle.is_some()
            && self.layout == (cols, rows, layers)
            && self.mip_count == mip_count
            && self.format == Some(format)
        {
            return Ok(());
        }

        self.invalidate();

        let device = self.context.device();

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let handle = device.create_texture(&wgpu::TextureDescriptor {
            label: None,
            size: wgpu::Extent3d {
                width: cols as u32,
                height: rows as u32,
                depth_or_array_layers: layers.max(1) as u32,
            },
            mip_level_count: mip_count as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: self.usage,
            view_formats: &[],
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            warn!("texture allocation failed: {}", error);

            return Err(Error::exhausted(format!(
                "out of memory allocating {}x{}x{} texture",
                cols,
                rows,
                layers.max(1)
            )));
        }

        let dimension = if layers == 0 {
            wgpu::TextureViewDimension::D2
        } else {
            wgpu::TextureViewDimension::D2Array
        };

        self.default_view = Some(handle.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(dimension),
            ..Default::default()
        }));

        self.mip_views = (0..mip_count)
            .map(|mip| {
                handle.create_view(&wgpu::TextureViewDescriptor {
                    dimension: Some(dimension),
                    base_mip_level: mip as u32,
                    mip_level_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        self.cube_views = if layers == 6 {
            (0..mip_count)
                .map(|mip| {
                    handle.create_view(&wgpu::TextureViewDescriptor {
                        dimension: Some(wgpu::TextureViewDimension::Cube),
                        base_mip_level: mip as u32,
                        mip_level_count: Some(1),
                        ..Default::default()
                    })
                })
                .collect()
        } else {
            vec![]
        };

        self.layer_views = (0..layers)
            .map(|layer| {
                handle.create_view(&wgpu::TextureViewDescriptor {
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer as u32,
                    array_layer_count: Some(1),
                    base_mip_level: 0,
                    mip_level_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        self.handle = Some(handle);
        self.format = Some(format);
        self.layout = (cols, rows, layers);
        self.mip_count = mip_count;

        Ok(())
    }

    /// Uploads texel data into one layer of mip 0.
    pub fn upload_layer(&mut self, layer: usize, data: &[u8]) {
        let (handle, format) = match (&self.handle, self.format) {
            (Some(handle), Some(format)) => (handle, format),
            _ => {
                warn!("upload into an invalid texture ignored");
                return;
            }
        };

        let texel_size = format.block_copy_size(None).unwrap_or(4);

        self.context.queue().write_texture(
            wgpu::ImageCopyTexture {
                texture: handle,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: layer as u32,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(self.layout.0 as u32 * texel_size),
                rows_per_image: Some(self.layout.1 as u32),
            },
            wgpu::Extent3d {
                width: self.layout.0 as u32,
                height: self.layout.1 as u32,
                depth_or_array_layers: 1,
            },
        );
    }

    pub fn invalidate(&mut self) {
        self.handle = None;
        self.format = None;
        self.layout = (0, 0, 0);
        self.default_view = None;
        self.mip_views.clear();
        self.cube_views.clear();
        self.layer_views.clear();
    }

    pub fn is_invalid(&self) -> bool {
        self.handle.is_none()
    }

    pub fn cols(&self) -> usize {
        self.layout.0
    }

    pub fn rows(&self) -> usize {
        self.layout.1
    }

    pub fn layers(&self) -> usize {
        self.layout.2
    }

    pub fn mip_count(&self) -> usize {
        self.mip_count
    }

    pub(crate) fn handle(&self) -> Option<&wgpu::Texture> {
        self.handle.as_ref()
    }

    pub(crate) fn format(&self) -> Option<wgpu::TextureFormat> {
        self.format
    }

    /// Single-mip view, for storage writes.
    pub fn mip(&self, mip: usize) -> TextureBinding {
        TextureBinding(self.mip_views.get(mip))
    }

    /// Cube view of a single mip; only present on six-layer arrays.
    pub fn cube_mip(&self, mip: usize) -> TextureBinding {
        TextureBinding(self.cube_views.get(mip))
    }

    /// Single-layer view of mip 0.
    pub fn layer(&self, layer: usize) -> TextureBinding {
        TextureBinding(self.layer_views.get(layer))
    }

    pub fn render_target(&self) -> Option<&wgpu::TextureView> {
        self.default_view.as_ref()
    }
}

impl AsBindTarget for Texture {
    fn bind_target(&self) -> BindTarget {
        BindTarget::TextureView(self.default_view.as_ref())
    }
}

/// Borrowed view of part of a texture, bindable by name.
pub struct TextureBinding<'a>(Option<&'a wgpu::TextureView>);

impl AsBindTarget for TextureBinding<'_> {
    fn bind_target(&self) -> BindTarget {
        BindTarget::TextureView(self.0)
    }
}
