#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{AsBindTarget, BindTarget, Context, Error};
use std::marker::PhantomData;
use std::mem::size_of;
use zerocopy::{AsBytes, FromBytes};

/// GPU uniform buffer holding one `T` (or a `[T]` slice).
///
/// The buffer is reallocated whenever the written size changes; contents
/// become visible to the GPU at the start of the next submission, so a
/// buffer written during setup is stable for every dispatch of a pass.
#[derive(Debug)]
pub struct UniformBuffer<T: ?Sized> {
    context: Context,
    handle: Option<wgpu::Buffer>,
    len: usize,
    phantom: PhantomData<T>,
}

impl<T: AsBytes + FromBytes> UniformBuffer<[T]> {
    pub fn write_array(&mut self, contents: &[T]) -> Result<(), Error> {
        if self.len != contents.len().max(1) || self.handle.is_none() {
            self.create_and_allocate(size_of::<T>() * contents.len().max(1))?;
            self.len = contents.len().max(1);
        }

        if let Some(handle) = &self.handle {
            self.context.queue().write_buffer(handle, 0, contents.as_bytes());
        }

        Ok(())
    }
}

impl<T: AsBytes + FromBytes> UniformBuffer<T> {
    pub fn write(&mut self, contents: &T) -> Result<(), Error> {
        if self.len != 1 || self.handle.is_none() {
            self.create_and_allocate(size_of::<T>())?;
            self.len = 1;
        }

        if let Some(handle) = &self.handle {
            self.context.queue().write_buffer(handle, 0, contents.as_bytes());
        }

        Ok(())
    }
}

impl<T: ?Sized> UniformBuffer<T> {
    pub fn new(context: Context) -> Self {
        Self {
            context,
            handle: None,
            len: 0,
            phantom: PhantomData,
        }
    }

    pub fn invalidate(&mut self) {
        self.handle = None;
        self.len = 0;
    }

    pub fn element_count(&self) -> usize {
        self.len
    }

    fn create_and_allocate(&mut self, size: usize) -> Result<(), Error> {
        if size > self.context.limits().max_uniform_buffer_binding_size as usize {
            return Err(Error::exhausted("uniform buffer size limit exceeded"));
        }

        self.handle = Some(self.context.device().create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size: size as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));

        Ok(())
    }
}

impl<T: ?Sized> AsBindTarget for UniformBuffer<T> {
    fn bind_target(&self) -> BindTarget {
        BindTarget::UniformBuffer(self.handle.as_ref())
    }
}
