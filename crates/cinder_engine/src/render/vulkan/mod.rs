//! Vulkan backend: context, presentation surface, frame orchestration and
//! pooled GPU resources

pub mod buffer;
pub mod context;
pub mod descriptor;
pub mod renderer;
pub mod swapchain;
pub mod sync;

pub use buffer::Buffer;
pub use context::{GraphicsContext, SwapchainSupport, VulkanError, VulkanResult};
pub use descriptor::{DescriptorPool, DescriptorSetLayout, DescriptorWriter};
pub use renderer::Renderer;
pub use swapchain::{FrameStatus, PresentStatus, Swapchain, MAX_FRAMES_IN_FLIGHT};
pub use sync::{Fence, FrameSync, Semaphore};
