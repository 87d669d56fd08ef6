//! # Cinder Engine
//!
//! A Vulkan presentation and frame-synchronization core for real-time
//! renderers.
//!
//! The crate owns the hard parts of driving a swapchain: device and queue
//! selection, the double-buffered presentation loop, cross-frame
//! synchronization, surface recreation on resize, and the pooled
//! descriptor and buffer resources render systems bind against. Scene
//! storage, materials, UI widgets and window plumbing are deliberately
//! external; they talk to this core through [`render::SurfaceProvider`]
//! and the command buffers handed out by [`render::Renderer`].
//!
//! ## Frame loop
//!
//! ```rust,no_run
//! # use cinder_engine::prelude::*;
//! # fn drive(renderer: &mut Renderer, window: &mut dyn SurfaceProvider) -> VulkanResult<()> {
//! if let Some(command_buffer) = renderer.begin_frame(window)? {
//!     renderer.begin_swapchain_render_pass(command_buffer);
//!     // external render systems and the UI overlay record here
//!     renderer.end_swapchain_render_pass(command_buffer);
//!     renderer.end_frame(window)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! A `None` from [`render::Renderer::begin_frame`] means the surface went
//! out of date (a resize, typically); the frame is skipped and the next
//! loop iteration runs against the recreated surface. That path is
//! expected and recoverable, never an error.

pub mod core;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::core::config::{ConfigError, RendererConfig};
    pub use crate::render::vulkan::{
        Buffer, DescriptorPool, DescriptorSetLayout, DescriptorWriter, GraphicsContext, Renderer,
        Swapchain, VulkanError, VulkanResult, MAX_FRAMES_IN_FLIGHT,
    };
    pub use crate::render::SurfaceProvider;
}
