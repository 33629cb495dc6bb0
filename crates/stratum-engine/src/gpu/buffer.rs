use super::release::{Release, ReleaseQueue};
use super::{Backend, BufferTarget, GpuContext, RawId};

/// Owned GPU buffer object. The backend name is released when dropped.
#[derive(Debug)]
pub struct GpuBuffer {
    id: RawId,
    target: BufferTarget,
    len: usize,
    releases: ReleaseQueue,
}

impl GpuBuffer {
    /// Creates an empty buffer for `target`. `None` when the backend cannot
    /// allocate a name.
    pub fn new<B: Backend>(ctx: &mut GpuContext<B>, target: BufferTarget) -> Option<Self> {
        let id = ctx.call("create_buffer", |b| b.create_buffer())?;
        Some(Self { id, target, len: 0, releases: ctx.releases().clone() })
    }

    #[inline]
    pub fn id(&self) -> RawId {
        self.id
    }

    #[inline]
    pub fn target(&self) -> BufferTarget {
        self.target
    }

    /// Size in bytes of the last upload.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn bind<B: Backend>(&self, ctx: &mut GpuContext<B>) {
        let (target, id) = (self.target, self.id);
        ctx.call("bind_buffer", |b| b.bind_buffer(target, Some(id)));
    }

    #[inline]
    pub fn unbind<B: Backend>(ctx: &mut GpuContext<B>, target: BufferTarget) {
        ctx.call("unbind_buffer", |b| b.bind_buffer(target, None));
    }

    /// Replaces the buffer contents with `data`.
    pub fn load<B: Backend>(&mut self, ctx: &mut GpuContext<B>, data: &[u8]) {
        debug_assert!(self.releases.is_shared_with(ctx.releases()));
        self.bind(ctx);
        let target = self.target;
        ctx.call("buffer_data", |b| b.buffer_data(target, data));
        Self::unbind(ctx, target);
        self.len = data.len();
    }

    /// Typed convenience over [`GpuBuffer::load`].
    #[inline]
    pub fn load_pod<B: Backend, T: bytemuck::Pod>(&mut self, ctx: &mut GpuContext<B>, data: &[T]) {
        self.load(ctx, bytemuck::cast_slice(data));
    }

    /// Starts a write of `size` bytes.
    ///
    /// The buffer stays bound for the whole write, and the context is
    /// borrowed, so no other binding can interleave before the commit.
    pub fn begin_write<'a, B: Backend>(
        &'a mut self,
        ctx: &'a mut GpuContext<B>,
        size: usize,
    ) -> BufferWrite<'a, B> {
        debug_assert!(self.releases.is_shared_with(ctx.releases()));
        self.bind(ctx);
        let target = self.target;

        let mapped = ctx.caps().map_buffer && ctx.call("map_buffer", |b| b.map_buffer(target, size));
        let staging = if mapped {
            Staging::Mapped
        } else {
            Staging::Host(vec![0; size])
        };

        BufferWrite { ctx, buffer: self, size, staging, committed: false }
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        self.releases.push(Release::Buffer(self.id));
    }
}

enum Staging {
    Mapped,
    Host(Vec<u8>),
}

/// An in-progress buffer write.
///
/// Writes into mapped backend memory when the backend supports mapping and
/// into a host staging allocation otherwise. Either way the data reaches the
/// buffer on [`BufferWrite::commit`], or on drop if commit was not called.
pub struct BufferWrite<'a, B: Backend> {
    ctx: &'a mut GpuContext<B>,
    buffer: &'a mut GpuBuffer,
    size: usize,
    staging: Staging,
    committed: bool,
}

impl<B: Backend> BufferWrite<'_, B> {
    #[inline]
    pub fn is_mapped(&self) -> bool {
        matches!(self.staging, Staging::Mapped)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The writable region; exactly `len()` bytes.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let target = self.buffer.target;
        match &mut self.staging {
            Staging::Host(data) => data.as_mut_slice(),
            Staging::Mapped => self.ctx.backend_mut().mapped_bytes(target).unwrap_or(&mut []),
        }
    }

    /// Copies `data` to the start of the region. Excess input is ignored.
    pub fn write_pod<T: bytemuck::Pod>(&mut self, data: &[T]) {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let dst = self.as_mut_slice();
        let n = bytes.len().min(dst.len());
        dst[..n].copy_from_slice(&bytes[..n]);
    }

    /// Publishes the written bytes to the buffer.
    pub fn commit(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.committed {
            return;
        }
        self.committed = true;

        let target = self.buffer.target;
        match &self.staging {
            Staging::Mapped => self.ctx.call("unmap_buffer", |b| b.unmap_buffer(target)),
            Staging::Host(data) => self.ctx.call("buffer_data", |b| b.buffer_data(target, data)),
        }
        GpuBuffer::unbind(self.ctx, target);
        self.buffer.len = self.size;
    }
}

impl<B: Backend> Drop for BufferWrite<'_, B> {
    fn drop(&mut self) {
        self.finish();
    }
}
