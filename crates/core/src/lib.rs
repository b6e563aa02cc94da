#![deny(unsafe_code)]
//! Core of the learngl OpenGL 3.3 tutorial: GPU resource wrappers, camera,
//! input, transforms, meshes, models and the frame loop.
//!
//! All GPU work goes through the [`Gpu`] trait. [`HeadlessGpu`] records
//! calls in memory for tests and display-less runs; with the `render`
//! feature, [`gpu::GlowGpu`] forwards them to a live `glow` context.
//!
//! Resource wrappers ([`GpuBuffer`], [`VertexLayout`], [`Texture2D`],
//! [`ShaderProgram`]) own one GL object each and must be released
//! explicitly; using one after release is a [`GlError::UseAfterRelease`].

pub mod buffer;
pub mod camera;
pub mod config;
pub mod controller;
pub mod error;
pub mod frame_loop;
pub mod gpu;
pub mod input;
pub mod layout;
pub mod mesh;
pub mod model;
pub mod params;
pub mod resources;
pub mod shader;
pub mod texture;
pub mod time;
pub mod transform;
pub mod window;

pub use buffer::GpuBuffer;
pub use camera::{Camera, MouseLook};
pub use config::AppConfig;
pub use controller::FlyController;
pub use error::GlError;
pub use frame_loop::{Capture, CloseReason, FrameCtx, FrameLoop, FrameStats, LoopState, Scene};
pub use gpu::{Gpu, GlHandle, HeadlessGpu};
pub use input::{InputEvent, InputState, Key};
pub use layout::{VertexAttribute, VertexLayout};
pub use mesh::{Mesh, Vertex};
pub use model::Model;
pub use params::SceneParams;
pub use resources::{ResourceKey, Resources};
pub use shader::{Shader, ShaderProgram};
pub use texture::{Texture2D, TextureKind};
pub use time::{FrameClock, FrameTime};
pub use transform::Transform;
pub use window::{HeadlessWindow, Window};
