//! GPU buffer with instance-aligned addressing
//!
//! One allocation holding `instance_count` fixed-size instances, each
//! padded out to the device's minimum offset alignment so any instance
//! can be bound through a dynamic offset or flushed on its own. Mapping
//! is explicit; writes go through `bytemuck` so only plain-old-data types
//! can reach the mapped range.
//!
//! Per-frame uniform data conventionally uses one buffer per
//! frame-in-flight slot, indexed by the renderer's frame index, so the
//! CPU never writes a region the GPU is still reading.

use ash::vk;
use ash::Device;

use crate::render::vulkan::context::GraphicsContext;
use crate::render::vulkan::{VulkanError, VulkanResult};

/// Device buffer addressed in aligned instances
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    mapped: *mut std::ffi::c_void,
    buffer_size: vk::DeviceSize,
    instance_size: vk::DeviceSize,
    instance_count: u32,
    alignment_size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
    memory_properties: vk::MemoryPropertyFlags,
}

impl Buffer {
    /// Create a buffer sized for `instance_count` instances of
    /// `instance_size` bytes, each padded to `min_offset_alignment`.
    ///
    /// Pass the device limit (e.g. `min_uniform_buffer_offset_alignment`)
    /// when instances will be bound at dynamic offsets, or zero when the
    /// buffer is addressed as a whole.
    pub fn new(
        context: &GraphicsContext,
        instance_size: vk::DeviceSize,
        instance_count: u32,
        usage: vk::BufferUsageFlags,
        memory_properties: vk::MemoryPropertyFlags,
        min_offset_alignment: vk::DeviceSize,
    ) -> VulkanResult<Self> {
        let alignment_size = alignment(instance_size, min_offset_alignment);
        let buffer_size = alignment_size * vk::DeviceSize::from(instance_count);

        let (buffer, memory) = context.create_buffer(buffer_size, usage, memory_properties)?;

        Ok(Self {
            device: context.raw_device(),
            buffer,
            memory,
            mapped: std::ptr::null_mut(),
            buffer_size,
            instance_size,
            instance_count,
            alignment_size,
            usage,
            memory_properties,
        })
    }

    /// Create a host-visible upload source pre-filled with `bytes`.
    ///
    /// Short-lived by convention: the caller copies out of it with
    /// [`GraphicsContext::copy_buffer`] or
    /// [`GraphicsContext::copy_buffer_to_image`] and drops it.
    pub fn staging(context: &GraphicsContext, bytes: &[u8]) -> VulkanResult<Self> {
        let mut buffer = Self::new(
            context,
            bytes.len() as vk::DeviceSize,
            1,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            0,
        )?;
        buffer.map()?;
        buffer.write_to_buffer(bytes);
        buffer.unmap();
        Ok(buffer)
    }

    /// Map the whole buffer for CPU access
    pub fn map(&mut self) -> VulkanResult<()> {
        self.mapped = unsafe {
            self.device
                .map_memory(
                    self.memory,
                    0,
                    vk::WHOLE_SIZE,
                    vk::MemoryMapFlags::empty(),
                )
                .map_err(VulkanError::Api)?
        };
        Ok(())
    }

    /// Unmap the buffer; a no-op when not mapped
    pub fn unmap(&mut self) {
        if !self.mapped.is_null() {
            unsafe {
                self.device.unmap_memory(self.memory);
            }
            self.mapped = std::ptr::null_mut();
        }
    }

    /// Copy `data` to the start of the mapped range. Panics when the
    /// buffer is unmapped or the data exceeds the buffer.
    pub fn write_to_buffer<T: bytemuck::Pod>(&mut self, data: &[T]) {
        assert!(!self.mapped.is_null(), "buffer is not mapped");
        let bytes: &[u8] = bytemuck::cast_slice(data);
        assert!(
            bytes.len() as vk::DeviceSize <= self.buffer_size,
            "write of {} bytes exceeds buffer of {} bytes",
            bytes.len(),
            self.buffer_size
        );
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.mapped.cast::<u8>(), bytes.len());
        }
    }

    /// Copy one instance to its aligned slot. Panics when the buffer is
    /// unmapped, the value exceeds the instance size, or the index is out
    /// of range.
    pub fn write_to_index<T: bytemuck::Pod>(&mut self, data: &T, index: u32) {
        assert!(!self.mapped.is_null(), "buffer is not mapped");
        assert!(index < self.instance_count, "instance index out of range");
        let bytes = bytemuck::bytes_of(data);
        assert!(
            bytes.len() as vk::DeviceSize <= self.instance_size,
            "value of {} bytes exceeds instance size of {}",
            bytes.len(),
            self.instance_size
        );
        let offset = vk::DeviceSize::from(index) * self.alignment_size;
        unsafe {
            let dst = self.mapped.cast::<u8>().add(offset as usize);
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
        }
    }

    /// Make the whole mapped range visible to the device. Only needed for
    /// non-coherent memory.
    pub fn flush(&self) -> VulkanResult<()> {
        self.flush_range(0, vk::WHOLE_SIZE)
    }

    /// Make one instance's aligned slot visible to the device
    pub fn flush_index(&self, index: u32) -> VulkanResult<()> {
        assert!(index < self.instance_count, "instance index out of range");
        self.flush_range(
            vk::DeviceSize::from(index) * self.alignment_size,
            self.alignment_size,
        )
    }

    fn flush_range(&self, offset: vk::DeviceSize, size: vk::DeviceSize) -> VulkanResult<()> {
        let range = vk::MappedMemoryRange::builder()
            .memory(self.memory)
            .offset(offset)
            .size(size)
            .build();
        unsafe {
            self.device
                .flush_mapped_memory_ranges(&[range])
                .map_err(VulkanError::Api)
        }
    }

    /// Make device writes to the whole range visible to the CPU
    pub fn invalidate(&self) -> VulkanResult<()> {
        self.invalidate_range(0, vk::WHOLE_SIZE)
    }

    /// Make device writes to one instance's slot visible to the CPU
    pub fn invalidate_index(&self, index: u32) -> VulkanResult<()> {
        assert!(index < self.instance_count, "instance index out of range");
        self.invalidate_range(
            vk::DeviceSize::from(index) * self.alignment_size,
            self.alignment_size,
        )
    }

    fn invalidate_range(&self, offset: vk::DeviceSize, size: vk::DeviceSize) -> VulkanResult<()> {
        let range = vk::MappedMemoryRange::builder()
            .memory(self.memory)
            .offset(offset)
            .size(size)
            .build();
        unsafe {
            self.device
                .invalidate_mapped_memory_ranges(&[range])
                .map_err(VulkanError::Api)
        }
    }

    /// Descriptor info covering the whole buffer
    pub fn descriptor_info(&self) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.buffer,
            offset: 0,
            range: vk::WHOLE_SIZE,
        }
    }

    /// Descriptor info covering one instance's aligned slot
    pub fn descriptor_info_for_index(&self, index: u32) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.buffer,
            offset: vk::DeviceSize::from(index) * self.alignment_size,
            range: self.alignment_size,
        }
    }

    /// Get the buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Total allocation size in bytes
    pub fn size(&self) -> vk::DeviceSize {
        self.buffer_size
    }

    /// Unpadded size of one instance
    pub fn instance_size(&self) -> vk::DeviceSize {
        self.instance_size
    }

    /// Number of instances the buffer holds
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Padded stride between instances
    pub fn alignment_size(&self) -> vk::DeviceSize {
        self.alignment_size
    }

    /// Usage flags the buffer was created with
    pub fn usage(&self) -> vk::BufferUsageFlags {
        self.usage
    }

    /// Memory property flags the backing allocation satisfies
    pub fn memory_properties(&self) -> vk::MemoryPropertyFlags {
        self.memory_properties
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.unmap();
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Instance size rounded up to the next multiple of the alignment; zero
/// alignment means pack tightly
fn alignment(instance_size: vk::DeviceSize, min_offset_alignment: vk::DeviceSize) -> vk::DeviceSize {
    if min_offset_alignment > 0 {
        (instance_size + min_offset_alignment - 1) & !(min_offset_alignment - 1)
    } else {
        instance_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_rounds_up_to_limit() {
        assert_eq!(alignment(64, 256), 256);
        assert_eq!(alignment(257, 256), 512);
        assert_eq!(alignment(1, 64), 64);
    }

    #[test]
    fn test_alignment_keeps_exact_multiples() {
        assert_eq!(alignment(256, 256), 256);
        assert_eq!(alignment(512, 256), 512);
    }

    #[test]
    fn test_zero_alignment_packs_tightly() {
        assert_eq!(alignment(100, 0), 100);
        assert_eq!(alignment(7, 0), 7);
    }

    #[test]
    fn test_aligned_instances_never_overlap() {
        // Dynamic-offset uniform case: 80-byte instances on a device with
        // a 64-byte minimum offset alignment.
        let stride = alignment(80, 64);
        assert_eq!(stride, 128);
        let offsets: Vec<u64> = (0..4u64).map(|i| i * stride).collect();
        for pair in offsets.windows(2) {
            assert!(pair[0] + 80 <= pair[1]);
        }
    }
}
