use anyhow::{Context, Result};
use std::collections::HashMap;

/// Opaque handle to a buffer owned by a device context.
///
/// Handles are never reused by the context that issued them.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferId(u32);

impl BufferId {
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Who reads and writes a buffer after creation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    /// GPU read/write; CPU updates go through `update_subresource`.
    Default,
    /// GPU read, CPU write through `map_write_discard`.
    Dynamic,
}

/// Pipeline stage a buffer is bound to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BindTarget {
    Vertex,
    Constant,
}

/// CPU access granted to a buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CpuAccess {
    None,
    Write,
}

/// Buffer creation parameters.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferDesc {
    pub label: &'static str,
    pub usage: BufferUsage,
    pub byte_width: u32,
    pub bind: BindTarget,
    pub cpu_access: CpuAccess,
}

impl BufferDesc {
    /// Dynamic vertex buffer the CPU fills once via map/unmap.
    pub fn vertex(label: &'static str, byte_width: u32) -> Self {
        Self {
            label,
            usage: BufferUsage::Dynamic,
            byte_width,
            bind: BindTarget::Vertex,
            cpu_access: CpuAccess::Write,
        }
    }

    /// Default-usage constant buffer updated through `update_subresource`.
    pub fn constant(label: &'static str, byte_width: u32) -> Self {
        Self {
            label,
            usage: BufferUsage::Default,
            byte_width,
            bind: BindTarget::Constant,
            cpu_access: CpuAccess::None,
        }
    }

    /// Checks creation rules shared by every backend.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.byte_width > 0, "buffer `{}` has zero size", self.label);
        if self.bind == BindTarget::Constant {
            anyhow::ensure!(
                self.byte_width % 16 == 0,
                "constant buffer `{}` width {} is not a multiple of 16",
                self.label,
                self.byte_width
            );
        }
        match (self.usage, self.cpu_access) {
            (BufferUsage::Dynamic, CpuAccess::None) => {
                anyhow::bail!("dynamic buffer `{}` requires CPU write access", self.label)
            }
            (BufferUsage::Default, CpuAccess::Write) => {
                anyhow::bail!("default-usage buffer `{}` cannot be CPU-writable", self.label)
            }
            _ => Ok(()),
        }
    }

    /// Checks that a `map_write_discard` of this buffer is legal.
    pub fn ensure_mappable(&self) -> Result<()> {
        anyhow::ensure!(
            self.usage == BufferUsage::Dynamic && self.cpu_access == CpuAccess::Write,
            "buffer `{}` is not CPU-writable",
            self.label
        );
        Ok(())
    }

    /// Checks that an `update_subresource` of `len` bytes is legal.
    pub fn ensure_updatable(&self, len: usize) -> Result<()> {
        anyhow::ensure!(
            self.usage == BufferUsage::Default,
            "buffer `{}` is dynamic; use map_write_discard",
            self.label
        );
        anyhow::ensure!(
            len <= self.byte_width as usize,
            "update of {} bytes overflows buffer `{}` ({} bytes)",
            len,
            self.label,
            self.byte_width
        );
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FillMode {
    Solid,
    Wireframe,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Rasterizer configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RasterizerDesc {
    pub fill: FillMode,
    pub cull: CullMode,
}

impl Default for RasterizerDesc {
    fn default() -> Self {
        Self {
            fill: FillMode::Solid,
            cull: CullMode::Back,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
    LineList,
}

/// Per-vertex attribute formats understood by the input layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    pub fn size(self) -> u32 {
        match self {
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

/// One entry of an input layout. Shader location = index in the layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct InputElement {
    pub semantic: &'static str,
    pub format: VertexFormat,
    pub offset: u32,
}

/// Vertex + pixel stage description.
///
/// `source` is WGSL; compilation is left to the backend's shader runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderPipelineDesc {
    pub label: &'static str,
    pub source: &'static str,
    pub vs_entry: &'static str,
    pub ps_entry: &'static str,
    pub input_layout: &'static [InputElement],
}

/// Rasterizer viewport in physical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { x: 0.0, y: 0.0, width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    #[inline]
    pub fn aspect(self) -> f32 {
        self.width / self.height
    }
}

/// Handle table used by backends to own their buffers.
#[derive(Debug)]
pub(crate) struct ResourceTable<T> {
    entries: HashMap<BufferId, (T, BufferDesc)>,
    next: u32,
}

impl<T> Default for ResourceTable<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next: 1,
        }
    }
}

impl<T> ResourceTable<T> {
    pub(crate) fn insert(&mut self, resource: T, desc: BufferDesc) -> BufferId {
        let id = BufferId(self.next);
        self.next += 1;
        self.entries.insert(id, (resource, desc));
        id
    }

    pub(crate) fn get(&self, id: BufferId) -> Result<(&T, &BufferDesc)> {
        self.entries
            .get(&id)
            .map(|(r, d)| (r, d))
            .with_context(|| format!("unknown or released buffer #{}", id.0))
    }

    pub(crate) fn get_mut(&mut self, id: BufferId) -> Result<(&mut T, &BufferDesc)> {
        self.entries
            .get_mut(&id)
            .map(|(r, d)| (r, &*d))
            .with_context(|| format!("unknown or released buffer #{}", id.0))
    }

    pub(crate) fn remove(&mut self, id: BufferId) -> Result<(T, BufferDesc)> {
        self.entries
            .remove(&id)
            .with_context(|| format!("buffer #{} released twice or never created", id.0))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
