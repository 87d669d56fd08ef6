//! Presentation surface: swapchain, attachments and frame synchronization
//!
//! Owns the presentable images, their views, one depth buffer per image,
//! the render pass compatible with those attachments, the framebuffers,
//! and the rotating per-frame synchronization bundles. Construction runs
//! six ordered steps (swapchain → image views → depth resources → render
//! pass → framebuffers → sync objects); any failure mid-sequence tears the
//! whole object down. Recreation takes the previous instance as a
//! one-shot donor so the driver can recycle format-compatible images.

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::vk;
use ash::Device;

use crate::render::vulkan::context::GraphicsContext;
use crate::render::vulkan::sync::{FrameSync, ImagesInFlight};
use crate::render::vulkan::{VulkanError, VulkanResult};

/// Number of frames the CPU may record ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Outcome of an image acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// An image was acquired and may be rendered to
    Ready {
        /// Index of the acquired presentable image
        image_index: u32,
        /// The surface no longer matches exactly; rendering proceeds but
        /// the caller should recreate soon
        suboptimal: bool,
    },
    /// The surface is out of date; no image was consumed. The caller
    /// recreates the swapchain and skips this frame.
    OutOfDate,
}

/// Outcome of a submit-and-present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    /// The image was presented against a current surface
    Optimal,
    /// The surface is stale (out of date or suboptimal); the caller
    /// recreates the swapchain before the next frame
    Stale,
}

/// Swapchain and the per-frame resources bound to it.
///
/// Per-image arrays (images, views, depth resources, framebuffers, the
/// image-fence table) all share one length, built together in
/// construction and never resized separately. Per-frame arrays are sized
/// to [`MAX_FRAMES_IN_FLIGHT`]; the two counts are independent.
///
/// Depth buffers are allocated per presentable image rather than per
/// frame slot. Depth contents are transient per draw, so this spends
/// memory for simplicity; other components rely on that lifetime, so it
/// is deliberate, documented behavior.
pub struct Swapchain {
    device: Device,
    swapchain_loader: SwapchainLoader,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,

    swapchain: vk::SwapchainKHR,
    image_format: vk::Format,
    depth_format: vk::Format,
    swapchain_extent: vk::Extent2D,

    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    depth_images: Vec<vk::Image>,
    depth_image_memories: Vec<vk::DeviceMemory>,
    depth_image_views: Vec<vk::ImageView>,
    framebuffers: Vec<vk::Framebuffer>,
    render_pass: vk::RenderPass,

    frame_sync: Vec<FrameSync>,
    images_in_flight: ImagesInFlight,
    current_frame: usize,
}

impl Swapchain {
    /// Create a presentation surface for the requested drawable extent
    pub fn new(context: &GraphicsContext, window_extent: vk::Extent2D) -> VulkanResult<Self> {
        Self::init(context, window_extent, vk::SwapchainKHR::null())
    }

    /// Recreate after a resize or stale-surface result, with the previous
    /// instance as a one-shot donor.
    ///
    /// The donor's handle is passed as `old_swapchain` so the driver can
    /// recycle its images, and its formats are checked against the
    /// replacement; the caller drops the donor once this returns. A color
    /// or depth format change is a hard error: pipelines built against the
    /// old render pass would be invalid and this core has no rebuild
    /// facility.
    pub fn recreate(
        context: &GraphicsContext,
        window_extent: vk::Extent2D,
        previous: &Swapchain,
    ) -> VulkanResult<Self> {
        let swapchain = Self::init(context, window_extent, previous.swapchain)?;
        if !swapchain.compare_swap_formats(previous) {
            return Err(VulkanError::IncompatibleSwapchain);
        }
        Ok(swapchain)
    }

    fn init(
        context: &GraphicsContext,
        window_extent: vk::Extent2D,
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<Self> {
        let mut swapchain = Self {
            device: context.raw_device(),
            swapchain_loader: context.swapchain_loader().clone(),
            graphics_queue: context.graphics_queue(),
            present_queue: context.present_queue(),
            swapchain: vk::SwapchainKHR::null(),
            image_format: vk::Format::UNDEFINED,
            depth_format: vk::Format::UNDEFINED,
            swapchain_extent: vk::Extent2D::default(),
            images: Vec::new(),
            image_views: Vec::new(),
            depth_images: Vec::new(),
            depth_image_memories: Vec::new(),
            depth_image_views: Vec::new(),
            framebuffers: Vec::new(),
            render_pass: vk::RenderPass::null(),
            frame_sync: Vec::new(),
            images_in_flight: ImagesInFlight::new(0),
            current_frame: 0,
        };

        // Six ordered steps, each depending on the prior. On error the
        // partially built object drops and Drop releases whatever exists.
        swapchain.create_swapchain(context, window_extent, old_swapchain)?;
        swapchain.create_image_views()?;
        swapchain.create_depth_resources(context)?;
        swapchain.create_render_pass()?;
        swapchain.create_framebuffers()?;
        swapchain.create_sync_objects()?;

        debug_assert_eq!(swapchain.images.len(), swapchain.depth_images.len());
        debug_assert_eq!(swapchain.images.len(), swapchain.framebuffers.len());
        debug_assert_eq!(swapchain.images.len(), swapchain.images_in_flight.len());
        debug_assert_eq!(swapchain.frame_sync.len(), MAX_FRAMES_IN_FLIGHT);

        Ok(swapchain)
    }

    /// Number of presentable images the device chose
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Current swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain_extent
    }

    /// Width:height ratio of the swapchain extent
    pub fn aspect_ratio(&self) -> f32 {
        self.swapchain_extent.width as f32 / self.swapchain_extent.height as f32
    }

    /// Color format of the presentable images
    pub fn image_format(&self) -> vk::Format {
        self.image_format
    }

    /// Format of the depth attachments
    pub fn depth_format(&self) -> vk::Format {
        self.depth_format
    }

    /// Render pass compatible with the color/depth attachments
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Framebuffer for a presentable image index
    pub fn framebuffer(&self, index: usize) -> vk::Framebuffer {
        self.framebuffers[index]
    }

    /// View over a presentable image index
    pub fn image_view(&self, index: usize) -> vk::ImageView {
        self.image_views[index]
    }

    /// Whether both color and depth formats match another instance.
    ///
    /// True means pipelines built against the other instance's render pass
    /// remain valid for this one.
    pub fn compare_swap_formats(&self, other: &Swapchain) -> bool {
        other.depth_format == self.depth_format && other.image_format == self.image_format
    }

    /// Acquire the next presentable image.
    ///
    /// Blocks on the current frame slot's in-flight fence first, bounding
    /// CPU submission rate to GPU drain rate. An out-of-date surface is a
    /// recoverable status, not an error: no image is consumed and the
    /// caller retries after recreating.
    pub fn acquire_next_image(&self) -> VulkanResult<FrameStatus> {
        self.frame_sync[self.current_frame].in_flight.wait(u64::MAX)?;

        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                self.frame_sync[self.current_frame].image_available.handle(),
                vk::Fence::null(),
            )
        };

        match result {
            Ok((image_index, suboptimal)) => Ok(FrameStatus::Ready {
                image_index,
                suboptimal,
            }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(FrameStatus::OutOfDate),
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    /// Submit a recorded command buffer and present the image.
    ///
    /// Two hazards are fenced independently: the frame-slot fence was
    /// already waited in [`Self::acquire_next_image`]; here the *image's*
    /// parked fence is waited as well, because an image can be handed back
    /// by acquisition before the frame that last wrote it has drained.
    /// Advances the frame slot modulo [`MAX_FRAMES_IN_FLIGHT`].
    pub fn submit_command_buffers(
        &mut self,
        command_buffer: vk::CommandBuffer,
        image_index: u32,
    ) -> VulkanResult<PresentStatus> {
        if let Some(fence) = self.images_in_flight.in_flight_fence(image_index as usize) {
            unsafe {
                self.device
                    .wait_for_fences(&[fence], true, u64::MAX)
                    .map_err(VulkanError::Api)?;
            }
        }
        let frame = &self.frame_sync[self.current_frame];
        self.images_in_flight
            .claim(image_index as usize, frame.in_flight.handle());

        let wait_semaphores = [frame.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [frame.render_finished.handle()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        frame.in_flight.reset()?;
        unsafe {
            self.device
                .queue_submit(
                    self.graphics_queue,
                    &[submit_info.build()],
                    frame.in_flight.handle(),
                )
                .map_err(VulkanError::Submission)?;
        }

        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.swapchain_loader
                .queue_present(self.present_queue, &present_info)
        };

        self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;

        match result {
            Ok(false) => Ok(PresentStatus::Optimal),
            Ok(true) => Ok(PresentStatus::Stale),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentStatus::Stale),
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    fn create_swapchain(
        &mut self,
        context: &GraphicsContext,
        window_extent: vk::Extent2D,
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<()> {
        let support = context.swapchain_support()?;

        let surface_format = choose_surface_format(&support.formats);
        let present_mode = choose_present_mode(&support.present_modes);
        let extent = choose_extent(&support.capabilities, window_extent);
        let image_count = choose_image_count(&support.capabilities);

        let graphics_family = context.graphics_family();
        let present_family = context.present_family();
        let queue_family_indices = [graphics_family, present_family];

        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(context.surface())
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        // Images shared across families only when the pair is split.
        create_info = if graphics_family != present_family {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&queue_family_indices)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        self.swapchain = unsafe {
            self.swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        self.images = unsafe {
            self.swapchain_loader
                .get_swapchain_images(self.swapchain)
                .map_err(VulkanError::Api)?
        };
        self.image_format = surface_format.format;
        self.swapchain_extent = extent;

        Ok(())
    }

    fn create_image_views(&mut self) -> VulkanResult<()> {
        self.image_views.reserve(self.images.len());
        for &image in &self.images {
            let create_info = vk::ImageViewCreateInfo::builder()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.image_format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            let view = unsafe {
                self.device
                    .create_image_view(&create_info, None)
                    .map_err(VulkanError::Api)?
            };
            self.image_views.push(view);
        }
        Ok(())
    }

    fn create_depth_resources(&mut self, context: &GraphicsContext) -> VulkanResult<()> {
        self.depth_format = find_depth_format(context)?;
        let extent = self.swapchain_extent;

        self.depth_images.reserve(self.images.len());
        self.depth_image_memories.reserve(self.images.len());
        self.depth_image_views.reserve(self.images.len());

        for _ in 0..self.images.len() {
            let image_info = vk::ImageCreateInfo::builder()
                .image_type(vk::ImageType::TYPE_2D)
                .extent(vk::Extent3D {
                    width: extent.width,
                    height: extent.height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .format(self.depth_format)
                .tiling(vk::ImageTiling::OPTIMAL)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
                .samples(vk::SampleCountFlags::TYPE_1)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let (image, memory) =
                context.create_image_with_info(&image_info, vk::MemoryPropertyFlags::DEVICE_LOCAL)?;
            self.depth_images.push(image);
            self.depth_image_memories.push(memory);

            let view_info = vk::ImageViewCreateInfo::builder()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.depth_format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::DEPTH,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            let view = unsafe {
                self.device
                    .create_image_view(&view_info, None)
                    .map_err(VulkanError::Api)?
            };
            self.depth_image_views.push(view);
        }

        Ok(())
    }

    fn create_render_pass(&mut self) -> VulkanResult<()> {
        let color_attachment = vk::AttachmentDescription::builder()
            .format(self.image_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .build();

        let depth_attachment = vk::AttachmentDescription::builder()
            .format(self.depth_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .build();

        let color_ref = vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        };
        let depth_ref = vk::AttachmentReference {
            attachment: 1,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };

        let color_refs = [color_ref];
        let subpass = vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .depth_stencil_attachment(&depth_ref)
            .build();

        let dependency = vk::SubpassDependency::builder()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .src_access_mask(vk::AccessFlags::empty())
            .src_stage_mask(
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                    | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            )
            .dst_subpass(0)
            .dst_stage_mask(
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                    | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            )
            .dst_access_mask(
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )
            .build();

        let attachments = [color_attachment, depth_attachment];
        let subpasses = [subpass];
        let dependencies = [dependency];
        let render_pass_info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        self.render_pass = unsafe {
            self.device
                .create_render_pass(&render_pass_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(())
    }

    fn create_framebuffers(&mut self) -> VulkanResult<()> {
        self.framebuffers.reserve(self.images.len());
        for i in 0..self.images.len() {
            let attachments = [self.image_views[i], self.depth_image_views[i]];

            let framebuffer_info = vk::FramebufferCreateInfo::builder()
                .render_pass(self.render_pass)
                .attachments(&attachments)
                .width(self.swapchain_extent.width)
                .height(self.swapchain_extent.height)
                .layers(1);

            let framebuffer = unsafe {
                self.device
                    .create_framebuffer(&framebuffer_info, None)
                    .map_err(VulkanError::Api)?
            };
            self.framebuffers.push(framebuffer);
        }
        Ok(())
    }

    fn create_sync_objects(&mut self) -> VulkanResult<()> {
        self.frame_sync = FrameSync::create_all(&self.device, MAX_FRAMES_IN_FLIGHT)?;
        self.images_in_flight = ImagesInFlight::new(self.images.len());
        Ok(())
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.image_views {
                self.device.destroy_image_view(view, None);
            }

            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }

            for i in 0..self.depth_images.len() {
                self.device.destroy_image_view(self.depth_image_views[i], None);
                self.device.destroy_image(self.depth_images[i], None);
                self.device.free_memory(self.depth_image_memories[i], None);
            }

            for &framebuffer in &self.framebuffers {
                self.device.destroy_framebuffer(framebuffer, None);
            }

            if self.render_pass != vk::RenderPass::null() {
                self.device.destroy_render_pass(self.render_pass, None);
            }
        }
        // frame_sync drops afterwards, releasing semaphores and fences.
    }
}

/// Preferred depth formats, highest precision first
fn find_depth_format(context: &GraphicsContext) -> VulkanResult<vk::Format> {
    context.find_supported_format(
        &[
            vk::Format::D32_SFLOAT,
            vk::Format::D32_SFLOAT_S8_UINT,
            vk::Format::D24_UNORM_S8_UINT,
        ],
        vk::ImageTiling::OPTIMAL,
        vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
    )
}

/// Prefer 8-bit BGRA sRGB with a non-linear color space; otherwise the
/// first offered format. The fallback is documented behavior, not an
/// error: device selection already guaranteed the list is non-empty.
fn choose_surface_format(available: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    available
        .iter()
        .find(|format| {
            format.format == vk::Format::B8G8R8A8_SRGB
                && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .copied()
        .unwrap_or(available[0])
}

/// Prefer mailbox (submit without blocking on refresh), else FIFO, which
/// every conformant device supports. Fixed preference order; not
/// user-configurable.
fn choose_present_mode(available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if available.contains(&vk::PresentModeKHR::MAILBOX) {
        log::info!("present mode: mailbox");
        vk::PresentModeKHR::MAILBOX
    } else {
        log::info!("present mode: v-sync");
        vk::PresentModeKHR::FIFO
    }
}

/// The surface's current extent is authoritative unless it reports the
/// "don't care" sentinel, in which case the requested extent is clamped
/// to the surface's bounds.
fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    requested: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: requested.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: requested.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// One more than the minimum, capped by the maximum when the device
/// reports one (zero means unbounded)
fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && count > capabilities.max_image_count {
        count = capabilities.max_image_count;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(
        min_count: u32,
        max_count: u32,
        current: vk::Extent2D,
        min_extent: vk::Extent2D,
        max_extent: vk::Extent2D,
    ) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min_count,
            max_image_count: max_count,
            current_extent: current,
            min_image_extent: min_extent,
            max_image_extent: max_extent,
            ..Default::default()
        }
    }

    #[test]
    fn test_preferred_surface_format_selected() {
        let formats = [
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn test_surface_format_falls_back_to_first() {
        let formats = [vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn test_present_mode_prefers_mailbox() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn test_present_mode_falls_back_to_fifo() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_current_extent_is_authoritative() {
        let caps = capabilities(
            2,
            3,
            vk::Extent2D {
                width: 800,
                height: 600,
            },
            vk::Extent2D {
                width: 1,
                height: 1,
            },
            vk::Extent2D {
                width: 4096,
                height: 4096,
            },
        );
        let requested = vk::Extent2D {
            width: 1920,
            height: 1080,
        };
        // Surface already knows its size; the request is overridden.
        assert_eq!(
            choose_extent(&caps, requested),
            vk::Extent2D {
                width: 800,
                height: 600
            }
        );
    }

    #[test]
    fn test_sentinel_extent_clamps_request() {
        let caps = capabilities(
            2,
            3,
            vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            vk::Extent2D {
                width: 200,
                height: 200,
            },
            vk::Extent2D {
                width: 1024,
                height: 768,
            },
        );
        let clamped_low = choose_extent(
            &caps,
            vk::Extent2D {
                width: 100,
                height: 100,
            },
        );
        assert_eq!(
            clamped_low,
            vk::Extent2D {
                width: 200,
                height: 200
            }
        );

        let clamped_high = choose_extent(
            &caps,
            vk::Extent2D {
                width: 4000,
                height: 3000,
            },
        );
        assert_eq!(
            clamped_high,
            vk::Extent2D {
                width: 1024,
                height: 768
            }
        );

        let passthrough = choose_extent(
            &caps,
            vk::Extent2D {
                width: 400,
                height: 300,
            },
        );
        assert_eq!(
            passthrough,
            vk::Extent2D {
                width: 400,
                height: 300
            }
        );
    }

    #[test]
    fn test_image_count_within_device_bounds() {
        // min 2, max 3: the device ends up with a count in [2, 3].
        let caps = capabilities(
            2,
            3,
            vk::Extent2D::default(),
            vk::Extent2D::default(),
            vk::Extent2D::default(),
        );
        let count = choose_image_count(&caps);
        assert!((2..=3).contains(&count));
        assert_eq!(count, 3);
    }

    #[test]
    fn test_image_count_unbounded_max() {
        let caps = capabilities(
            2,
            0,
            vk::Extent2D::default(),
            vk::Extent2D::default(),
            vk::Extent2D::default(),
        );
        assert_eq!(choose_image_count(&caps), 3);
    }
}
