//! Rendering core: the Vulkan presentation and synchronization subsystem

pub mod surface;
pub mod vulkan;

pub use surface::{RawHandleSurface, SurfaceProvider};
pub use vulkan::{
    Buffer, DescriptorPool, DescriptorSetLayout, DescriptorWriter, GraphicsContext, Renderer,
    Swapchain, VulkanError, VulkanResult, MAX_FRAMES_IN_FLIGHT,
};
