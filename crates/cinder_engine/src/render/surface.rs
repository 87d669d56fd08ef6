//! Window-system seam for the presentation core
//!
//! The renderer never talks to a concrete windowing library. Whatever owns
//! the window (GLFW, winit, an embedder) implements [`SurfaceProvider`]:
//! the current drawable extent, a resize flag with reset, the instance
//! extensions the platform needs, and a factory for the platform
//! `vk::SurfaceKHR`. [`RawHandleSurface`] is a ready-made implementation
//! over `raw-window-handle` handles for hosts that already expose them.

use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::render::vulkan::{VulkanError, VulkanResult};

/// Window-system abstraction consumed by the renderer.
///
/// Implementations are driven from the window event loop: the host updates
/// the extent and sets the resize flag; the renderer reads both when it
/// recreates the presentation surface and clears the flag once a
/// recreation has been scheduled.
pub trait SurfaceProvider {
    /// Current drawable extent in pixels.
    ///
    /// A minimized window may report a zero dimension; implementations
    /// should return the true extent rather than substituting one. The
    /// renderer defers swapchain recreation while the extent has no area
    /// and retries on a later frame, keeping the resize flag raised.
    fn drawable_extent(&self) -> vk::Extent2D;

    /// Whether the drawable was resized since the flag was last reset
    fn was_resized(&self) -> bool;

    /// Clear the resize flag
    fn reset_resized(&mut self);

    /// Instance extensions required to create a surface on this platform
    fn required_extensions(&self) -> VulkanResult<Vec<*const i8>>;

    /// Create the platform presentation surface
    fn create_surface(
        &self,
        entry: &ash::Entry,
        instance: &ash::Instance,
    ) -> VulkanResult<vk::SurfaceKHR>;
}

/// [`SurfaceProvider`] over raw window and display handles.
///
/// The window glue owns the event loop and forwards size changes through
/// [`RawHandleSurface::set_extent`]; surface creation goes through
/// `ash-window`.
pub struct RawHandleSurface {
    display_handle: RawDisplayHandle,
    window_handle: RawWindowHandle,
    extent: vk::Extent2D,
    resized: bool,
}

impl RawHandleSurface {
    /// Wrap raw platform handles with an initial drawable extent
    pub fn new(
        display_handle: RawDisplayHandle,
        window_handle: RawWindowHandle,
        extent: vk::Extent2D,
    ) -> Self {
        Self {
            display_handle,
            window_handle,
            extent,
            resized: false,
        }
    }

    /// Record a new drawable extent and raise the resize flag
    pub fn set_extent(&mut self, extent: vk::Extent2D) {
        if extent.width != self.extent.width || extent.height != self.extent.height {
            self.extent = extent;
            self.resized = true;
        }
    }
}

impl SurfaceProvider for RawHandleSurface {
    fn drawable_extent(&self) -> vk::Extent2D {
        self.extent
    }

    fn was_resized(&self) -> bool {
        self.resized
    }

    fn reset_resized(&mut self) {
        self.resized = false;
    }

    fn required_extensions(&self) -> VulkanResult<Vec<*const i8>> {
        let extensions = ash_window::enumerate_required_extensions(self.display_handle)
            .map_err(VulkanError::Api)?;
        Ok(extensions.to_vec())
    }

    fn create_surface(
        &self,
        entry: &ash::Entry,
        instance: &ash::Instance,
    ) -> VulkanResult<vk::SurfaceKHR> {
        unsafe {
            ash_window::create_surface(entry, instance, self.display_handle, self.window_handle, None)
                .map_err(VulkanError::Api)
        }
    }
}
