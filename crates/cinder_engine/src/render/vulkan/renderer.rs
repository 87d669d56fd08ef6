//! Frame orchestration over the presentation surface
//!
//! The renderer owns the swapchain and one primary command buffer per
//! frame-in-flight slot, and exposes the begin/record/end protocol the
//! host drives every frame. Stale-surface results never surface as
//! errors: the renderer recreates the swapchain and the host simply
//! skips or continues, keeping the frame loop free of recovery logic.

use std::sync::Arc;

use ash::vk;

use crate::core::config::RendererConfig;
use crate::render::surface::SurfaceProvider;
use crate::render::vulkan::context::GraphicsContext;
use crate::render::vulkan::swapchain::{
    FrameStatus, PresentStatus, Swapchain, MAX_FRAMES_IN_FLIGHT,
};
use crate::render::vulkan::{VulkanError, VulkanResult};

/// Per-frame command recording and presentation driver.
///
/// The host calls [`Renderer::begin_frame`], records into the returned
/// command buffer between [`Renderer::begin_swapchain_render_pass`] and
/// [`Renderer::end_swapchain_render_pass`], then calls
/// [`Renderer::end_frame`]. A `None` from `begin_frame` means the surface
/// was stale and this frame is skipped; the host moves on to the next
/// loop iteration.
pub struct Renderer {
    context: Arc<GraphicsContext>,
    swapchain: Swapchain,
    command_buffers: Vec<vk::CommandBuffer>,
    current_image_index: u32,
    frames: FrameCounter,
    clear_color: [f32; 3],
}

impl Renderer {
    /// Create a renderer for the given surface, sized to its current
    /// drawable extent
    pub fn new(
        context: Arc<GraphicsContext>,
        surface: &dyn SurfaceProvider,
        config: &RendererConfig,
    ) -> VulkanResult<Self> {
        let swapchain = Swapchain::new(&context, surface.drawable_extent())?;
        let command_buffers = Self::allocate_command_buffers(&context)?;

        log::info!(
            "Renderer ready: {} swapchain images, {} frames in flight",
            swapchain.image_count(),
            MAX_FRAMES_IN_FLIGHT
        );

        Ok(Self {
            context,
            swapchain,
            command_buffers,
            current_image_index: 0,
            frames: FrameCounter::new(),
            clear_color: config.clear_color,
        })
    }

    fn allocate_command_buffers(context: &GraphicsContext) -> VulkanResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_pool(context.command_pool())
            .command_buffer_count(MAX_FRAMES_IN_FLIGHT as u32);

        unsafe {
            context
                .device()
                .allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::Api)
        }
    }

    /// Whether a frame is currently open
    pub fn is_frame_started(&self) -> bool {
        self.frames.is_open()
    }

    /// Index of the current frame-in-flight slot.
    ///
    /// Only meaningful while a frame is open; hosts index per-frame
    /// resources (uniform buffers, descriptor sets) with it.
    pub fn frame_index(&self) -> usize {
        assert!(
            self.frames.is_open(),
            "cannot get frame index when no frame is in progress"
        );
        self.frames.index()
    }

    /// Number of presentable images the swapchain holds
    pub fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    /// Width:height ratio of the current swapchain extent
    pub fn aspect_ratio(&self) -> f32 {
        self.swapchain.aspect_ratio()
    }

    /// Render pass that pipelines drawing to the swapchain must target
    pub fn swapchain_render_pass(&self) -> vk::RenderPass {
        self.swapchain.render_pass()
    }

    /// Set the background color used when the render pass clears
    pub fn set_clear_color(&mut self, r: f32, g: f32, b: f32) {
        self.clear_color = [r, g, b];
    }

    /// Block until all submitted GPU work has drained
    pub fn wait_idle(&self) -> VulkanResult<()> {
        self.context.wait_idle()
    }

    /// Open a frame: acquire an image and begin the frame's command
    /// buffer.
    ///
    /// Returns `Ok(None)` when the surface was out of date; the swapchain
    /// has already been recreated and the host skips this frame. Panics if
    /// a frame is already open.
    pub fn begin_frame(
        &mut self,
        surface: &mut dyn SurfaceProvider,
    ) -> VulkanResult<Option<vk::CommandBuffer>> {
        assert!(
            !self.frames.is_open(),
            "cannot begin a frame while another is in progress"
        );

        let image_index = match self.swapchain.acquire_next_image()? {
            FrameStatus::Ready { image_index, .. } => image_index,
            FrameStatus::OutOfDate => {
                self.recreate_swapchain(surface)?;
                return Ok(None);
            }
        };

        self.current_image_index = image_index;
        self.frames.open();

        let command_buffer = self.current_command_buffer();
        let begin_info = vk::CommandBufferBeginInfo::builder();
        unsafe {
            self.context
                .device()
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(VulkanError::Submission)?;
        }

        Ok(Some(command_buffer))
    }

    /// Close the frame: submit the command buffer and present.
    ///
    /// Recreates the swapchain when presentation reports a stale surface
    /// or the host raised its resize flag; both are routine, not errors.
    /// Advances the frame slot and closes the frame unconditionally.
    pub fn end_frame(&mut self, surface: &mut dyn SurfaceProvider) -> VulkanResult<()> {
        assert!(
            self.frames.is_open(),
            "cannot end a frame when none is in progress"
        );

        let command_buffer = self.current_command_buffer();
        unsafe {
            self.context
                .device()
                .end_command_buffer(command_buffer)
                .map_err(VulkanError::Submission)?;
        }

        let status = self
            .swapchain
            .submit_command_buffers(command_buffer, self.current_image_index)?;

        if status == PresentStatus::Stale || surface.was_resized() {
            self.recreate_swapchain(surface)?;
        }

        self.frames.close();
        Ok(())
    }

    /// Begin the swapchain render pass on the frame's command buffer.
    ///
    /// Clears color and depth, and sets a full-extent dynamic viewport and
    /// scissor so pipelines need no per-extent state. Panics when no frame
    /// is open or `command_buffer` is not the one `begin_frame` returned.
    pub fn begin_swapchain_render_pass(&self, command_buffer: vk::CommandBuffer) {
        assert!(
            self.frames.is_open(),
            "cannot begin a render pass when no frame is in progress"
        );
        assert_eq!(
            command_buffer,
            self.current_command_buffer(),
            "cannot begin a render pass on a command buffer from a different frame"
        );

        let extent = self.swapchain.extent();
        let clear_values = clear_values(self.clear_color);

        let render_pass_info = vk::RenderPassBeginInfo::builder()
            .render_pass(self.swapchain.render_pass())
            .framebuffer(self.swapchain.framebuffer(self.current_image_index as usize))
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clear_values);

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };

        unsafe {
            let device = self.context.device();
            device.cmd_begin_render_pass(
                command_buffer,
                &render_pass_info,
                vk::SubpassContents::INLINE,
            );
            device.cmd_set_viewport(command_buffer, 0, &[viewport]);
            device.cmd_set_scissor(command_buffer, 0, &[scissor]);
        }
    }

    /// End the swapchain render pass on the frame's command buffer.
    ///
    /// Panics under the same contract as
    /// [`Renderer::begin_swapchain_render_pass`].
    pub fn end_swapchain_render_pass(&self, command_buffer: vk::CommandBuffer) {
        assert!(
            self.frames.is_open(),
            "cannot end a render pass when no frame is in progress"
        );
        assert_eq!(
            command_buffer,
            self.current_command_buffer(),
            "cannot end a render pass on a command buffer from a different frame"
        );

        unsafe {
            self.context.device().cmd_end_render_pass(command_buffer);
        }
    }

    /// Command buffer for the open frame. Panics when no frame is open.
    pub fn current_command_buffer(&self) -> vk::CommandBuffer {
        assert!(
            self.frames.is_open(),
            "cannot get a command buffer when no frame is in progress"
        );
        self.command_buffers[self.frames.index()]
    }

    fn recreate_swapchain(&mut self, surface: &mut dyn SurfaceProvider) -> VulkanResult<()> {
        let extent = surface.drawable_extent();

        // A minimized window reports a zero dimension; a swapchain cannot
        // back a zero-area surface. Leave the resize flag raised so a
        // later frame retries once the drawable has area again.
        if !has_drawable_area(extent) {
            log::debug!("Deferring swapchain recreation while the drawable has no area");
            return Ok(());
        }
        surface.reset_resized();

        log::debug!(
            "Recreating swapchain at {}x{}",
            extent.width,
            extent.height
        );

        // Everything referencing the old attachments must have drained.
        self.context.wait_idle()?;
        self.swapchain = Swapchain::recreate(&self.context, extent, &self.swapchain)?;
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        unsafe {
            self.context
                .device()
                .free_command_buffers(self.context.command_pool(), &self.command_buffers);
        }
    }
}

/// Open-frame flag and frame-slot index bookkeeping.
///
/// The slot index advances only when a frame closes, so it stays
/// congruent to the number of completed frames regardless of how many
/// acquisitions were skipped in between. Kept free of device state so
/// the protocol contract is testable on its own.
struct FrameCounter {
    index: usize,
    open: bool,
}

impl FrameCounter {
    fn new() -> Self {
        Self {
            index: 0,
            open: false,
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn index(&self) -> usize {
        self.index
    }

    /// Open a frame; panics when one is already open
    fn open(&mut self) {
        assert!(
            !self.open,
            "cannot begin a frame while another is in progress"
        );
        self.open = true;
    }

    /// Close the frame and advance the slot; panics when none is open
    fn close(&mut self) {
        assert!(self.open, "cannot end a frame when none is in progress");
        self.open = false;
        self.index = next_frame_index(self.index);
    }
}

/// Next frame-in-flight slot, wrapping at [`MAX_FRAMES_IN_FLIGHT`]
fn next_frame_index(current: usize) -> usize {
    (current + 1) % MAX_FRAMES_IN_FLIGHT
}

/// Whether the drawable can back a swapchain; a minimized window reports
/// a zero dimension
fn has_drawable_area(extent: vk::Extent2D) -> bool {
    extent.width > 0 && extent.height > 0
}

/// Clear values matching the render pass attachment order: color first,
/// then depth (cleared to the far plane)
fn clear_values(color: [f32; 3]) -> [vk::ClearValue; 2] {
    [
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [color[0], color[1], color[2], 1.0],
            },
        },
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: 1.0,
                stencil: 0,
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_index_wraps() {
        let mut index = 0;
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(index);
            index = next_frame_index(index);
        }
        assert_eq!(seen, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_frame_index_stays_in_range() {
        let mut index = 0;
        for _ in 0..64 {
            index = next_frame_index(index);
            assert!(index < MAX_FRAMES_IN_FLIGHT);
        }
    }

    #[test]
    fn test_frame_index_congruent_to_completed_frames() {
        // Skipped acquisitions (stale surface, nothing opened) must not
        // advance the slot: it tracks completed frames only.
        let mut frames = FrameCounter::new();
        let mut completed = 0;
        let pattern = [true, false, true, true, false, false, true, true];

        for &frame_completes in &pattern {
            if frame_completes {
                frames.open();
                frames.close();
                completed += 1;
            }
            assert_eq!(frames.index(), completed % MAX_FRAMES_IN_FLIGHT);
            assert!(!frames.is_open());
        }
    }

    #[test]
    #[should_panic(expected = "another is in progress")]
    fn test_double_begin_panics() {
        let mut frames = FrameCounter::new();
        frames.open();
        frames.open();
    }

    #[test]
    #[should_panic(expected = "none is in progress")]
    fn test_end_without_begin_panics() {
        let mut frames = FrameCounter::new();
        frames.close();
    }

    #[test]
    fn test_zero_area_extent_defers_recreation() {
        // Minimized-window extents must never reach swapchain creation.
        assert!(!has_drawable_area(vk::Extent2D {
            width: 0,
            height: 600
        }));
        assert!(!has_drawable_area(vk::Extent2D {
            width: 800,
            height: 0
        }));
        assert!(!has_drawable_area(vk::Extent2D {
            width: 0,
            height: 0
        }));
        assert!(has_drawable_area(vk::Extent2D {
            width: 1,
            height: 1
        }));
    }

    #[test]
    fn test_clear_values_cover_both_attachments() {
        let values = clear_values([0.1, 0.2, 0.3]);
        let color = unsafe { values[0].color.float32 };
        assert_eq!(color, [0.1, 0.2, 0.3, 1.0]);
        let depth = unsafe { values[1].depth_stencil };
        assert_eq!(depth.depth, 1.0);
        assert_eq!(depth.stencil, 0);
    }
}
