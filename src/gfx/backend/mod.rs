//! GPU backend seam.
//!
//! Rendering code talks to a [`GpuBackend`] trait object instead of a concrete
//! device, so the scene walk, shader registry and interaction layer can be
//! exercised in tests against a recording double. The real implementation is
//! [`WgpuBackend`].

pub mod wgpu_backend;

pub use wgpu_backend::WgpuBackend;

use crate::error::Result;
use crate::gfx::material::{LightUniform, MaterialUniform};

/// Opaque id of a compiled-and-linked shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub(crate) u32);

/// Opaque id of an uploaded vertex or index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    /// Accepted for the tessellated-patch path; backends without hardware
    /// tessellation may fold these into the vertex stage.
    TessellationControl,
    TessellationEvaluation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Points,
    Lines,
    Triangles,
    /// 3-control-point patches for GPU subdivision.
    Patches,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4([[f32; 4]; 4]),
    Material(MaterialUniform),
    Light(LightUniform),
}

/// The rendering contract the scene walk is written against.
///
/// `set_uniform` calls accumulate until the next draw on the same program;
/// frame timing is polled, never blocked on.
pub trait GpuBackend {
    fn compile_program(&mut self, stages: &[(ShaderStage, &str)]) -> Result<ProgramHandle>;

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformValue);

    fn upload_buffer(&mut self, data: &[u8]) -> BufferHandle;

    fn release_buffer(&mut self, buffer: BufferHandle);

    /// Draw `count` vertices starting at `first` from a flat vertex buffer.
    fn draw(
        &mut self,
        program: ProgramHandle,
        primitive: PrimitiveKind,
        buffer: BufferHandle,
        first: u32,
        count: u32,
    );

    fn draw_indexed(
        &mut self,
        program: ProgramHandle,
        primitive: PrimitiveKind,
        vertices: BufferHandle,
        indices: BufferHandle,
        index_count: u32,
    );

    /// Start a GPU timestamp pair around the current frame, if supported.
    fn begin_timed_frame(&mut self);

    /// Elapsed GPU time of a previously timed frame, in milliseconds, if a
    /// result has arrived. Never blocks.
    fn poll_elapsed_ms(&mut self) -> Option<f32>;
}

#[cfg(test)]
pub(crate) mod recording {
    //! In-memory backend that records every call, for asserting on render
    //! order and resource lifetimes.

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Compile(Vec<ShaderStage>),
        SetUniform {
            program: ProgramHandle,
            name: String,
            value: UniformValue,
        },
        Upload(usize),
        Release(BufferHandle),
        Draw {
            program: ProgramHandle,
            primitive: PrimitiveKind,
            buffer: BufferHandle,
            first: u32,
            count: u32,
        },
        DrawIndexed {
            program: ProgramHandle,
            primitive: PrimitiveKind,
            index_count: u32,
        },
    }

    #[derive(Debug, Default)]
    pub struct RecordingBackend {
        pub calls: Vec<Call>,
        next_program: u32,
        next_buffer: u32,
        pub live_buffers: Vec<BufferHandle>,
    }

    impl RecordingBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn draw_calls(&self) -> impl Iterator<Item = &Call> {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::Draw { .. } | Call::DrawIndexed { .. }))
        }
    }

    impl GpuBackend for RecordingBackend {
        fn compile_program(&mut self, stages: &[(ShaderStage, &str)]) -> Result<ProgramHandle> {
            self.calls
                .push(Call::Compile(stages.iter().map(|(s, _)| *s).collect()));
            let handle = ProgramHandle(self.next_program);
            self.next_program += 1;
            Ok(handle)
        }

        fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformValue) {
            self.calls.push(Call::SetUniform {
                program,
                name: name.to_string(),
                value,
            });
        }

        fn upload_buffer(&mut self, data: &[u8]) -> BufferHandle {
            self.calls.push(Call::Upload(data.len()));
            let handle = BufferHandle(self.next_buffer);
            self.next_buffer += 1;
            self.live_buffers.push(handle);
            handle
        }

        fn release_buffer(&mut self, buffer: BufferHandle) {
            self.calls.push(Call::Release(buffer));
            self.live_buffers.retain(|b| *b != buffer);
        }

        fn draw(
            &mut self,
            program: ProgramHandle,
            primitive: PrimitiveKind,
            buffer: BufferHandle,
            first: u32,
            count: u32,
        ) {
            self.calls.push(Call::Draw {
                program,
                primitive,
                buffer,
                first,
                count,
            });
        }

        fn draw_indexed(
            &mut self,
            program: ProgramHandle,
            primitive: PrimitiveKind,
            _vertices: BufferHandle,
            _indices: BufferHandle,
            index_count: u32,
        ) {
            self.calls.push(Call::DrawIndexed {
                program,
                primitive,
                index_count,
            });
        }

        fn begin_timed_frame(&mut self) {}

        fn poll_elapsed_ms(&mut self) -> Option<f32> {
            None
        }
    }
}
