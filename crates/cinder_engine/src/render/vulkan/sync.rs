//! Synchronization primitives for CPU/GPU frame coordination
//!
//! RAII wrappers over semaphores and fences, the per-frame bundle the
//! swapchain rotates through, and the per-image fence table. Frames in
//! flight and images in flight are two different hazards with different
//! cardinalities: the frame-slot fence bounds how far ahead the CPU may
//! record, while the image table guards a specific presentable image
//! against reuse before its previous frame has drained.

use ash::vk;
use ash::Device;

use crate::render::vulkan::{VulkanError, VulkanResult};

/// GPU-side-only synchronization primitive ordering queue operations
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create a new binary semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();

        let semaphore = unsafe {
            device
                .create_semaphore(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, semaphore })
    }

    /// Get the semaphore handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// CPU-observable synchronization primitive signaled on GPU completion
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a new fence, optionally already signaled
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::builder().flags(flags);

        let fence = unsafe {
            device
                .create_fence(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, fence })
    }

    /// Block until the fence signals
    pub fn wait(&self, timeout: u64) -> VulkanResult<()> {
        unsafe {
            self.device
                .wait_for_fences(&[self.fence], true, timeout)
                .map_err(VulkanError::Api)
        }
    }

    /// Reset the fence to unsignaled
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe {
            self.device
                .reset_fences(&[self.fence])
                .map_err(VulkanError::Api)
        }
    }

    /// Get the fence handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// Synchronization objects for one frame-in-flight slot
pub struct FrameSync {
    /// Signaled when the acquired swapchain image becomes available
    pub image_available: Semaphore,
    /// Signaled when the frame's rendering is complete
    pub render_finished: Semaphore,
    /// Fence bounding CPU submission rate to GPU drain rate; created
    /// signaled so the first wait on each slot passes immediately
    pub in_flight: Fence,
}

impl FrameSync {
    /// Create the synchronization objects for one frame slot
    pub fn new(device: Device) -> VulkanResult<Self> {
        let image_available = Semaphore::new(device.clone())?;
        let render_finished = Semaphore::new(device.clone())?;
        let in_flight = Fence::new(device, true)?;

        Ok(Self {
            image_available,
            render_finished,
            in_flight,
        })
    }

    /// Create one bundle per frame-in-flight slot
    pub fn create_all(device: &Device, count: usize) -> VulkanResult<Vec<Self>> {
        (0..count).map(|_| Self::new(device.clone())).collect()
    }
}

/// Per-image fence table tracking which frame last used each presentable
/// image.
///
/// Image count and frame-slot count genuinely differ, so an image can come
/// back from acquisition before its original frame slot cycles around.
/// Before recording over it, the fence parked in its slot must be waited;
/// `vk::Fence::null()` marks an image no in-flight frame references.
pub struct ImagesInFlight {
    fences: Vec<vk::Fence>,
}

impl ImagesInFlight {
    /// Create a table with every image slot free
    pub fn new(image_count: usize) -> Self {
        Self {
            fences: vec![vk::Fence::null(); image_count],
        }
    }

    /// Fence that must drain before `image_index` may be reused, if any
    pub fn in_flight_fence(&self, image_index: usize) -> Option<vk::Fence> {
        let fence = self.fences[image_index];
        (fence != vk::Fence::null()).then_some(fence)
    }

    /// Park the current frame's fence in the image's slot, claiming the
    /// image for this frame
    pub fn claim(&mut self, image_index: usize, frame_fence: vk::Fence) {
        self.fences[image_index] = frame_fence;
    }

    /// Number of image slots tracked
    pub fn len(&self) -> usize {
        self.fences.len()
    }

    /// Whether the table tracks zero images
    pub fn is_empty(&self) -> bool {
        self.fences.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn fence(raw: u64) -> vk::Fence {
        vk::Fence::from_raw(raw)
    }

    #[test]
    fn test_fresh_table_has_no_pending_fences() {
        let table = ImagesInFlight::new(3);
        assert_eq!(table.len(), 3);
        for image in 0..3 {
            assert!(table.in_flight_fence(image).is_none());
        }
    }

    #[test]
    fn test_image_reuse_surfaces_prior_fence() {
        // 3 images, 2 frame slots: image 0 is re-acquired while the frame
        // that last used it may still be in flight.
        let mut table = ImagesInFlight::new(3);
        let frame_fences = [fence(0xa), fence(0xb)];

        assert!(table.in_flight_fence(0).is_none());
        table.claim(0, frame_fences[0]);

        assert!(table.in_flight_fence(1).is_none());
        table.claim(1, frame_fences[1]);

        // Image 0 comes back before frame slot 0 cycles: its fence must be
        // the one waited on, not the current slot's.
        assert_eq!(table.in_flight_fence(0), Some(frame_fences[0]));
        table.claim(0, frame_fences[0]);
    }

    #[test]
    fn test_wait_order_precedes_every_reuse() {
        // Drive an acquisition pattern and record, per submission, whether
        // a wait was required before the image was touched. A wait must be
        // demanded exactly when the image was previously claimed.
        let mut table = ImagesInFlight::new(2);
        let frame_fences = [fence(1), fence(2)];
        let pattern = [0usize, 1, 0, 1, 0];
        let mut waits = Vec::new();

        for (submission, &image) in pattern.iter().enumerate() {
            let frame = submission % frame_fences.len();
            waits.push(table.in_flight_fence(image).is_some());
            table.claim(image, frame_fences[frame]);
        }

        assert_eq!(waits, vec![false, false, true, true, true]);
    }
}
