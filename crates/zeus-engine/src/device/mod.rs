//! GPU device capability and its backends.
//!
//! This module is responsible for:
//! - the backend-agnostic `DeviceContext` trait and resource descriptions
//! - the wgpu backend (`Gpu`): instance/adapter/device/queue, surface, resources
//! - the in-memory `RecordingContext` used for headless verification

mod context;
mod error;
mod frame;
mod gpu;
mod init;
mod recording;
mod resource;
mod surface;
mod wgpu_backend;

pub use context::DeviceContext;
pub use error::SurfaceErrorAction;
pub use gpu::Gpu;
pub use init::GpuInit;
pub use recording::{DeviceCommand, RecordingContext};
pub use resource::{
    BindTarget, BufferDesc, BufferId, BufferUsage, CpuAccess, CullMode, FillMode, InputElement,
    PrimitiveTopology, RasterizerDesc, ShaderPipelineDesc, VertexFormat, Viewport,
};

#[cfg(test)]
pub(crate) use resource::ResourceTable;
