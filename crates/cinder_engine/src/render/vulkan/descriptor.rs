//! Descriptor set layouts, pools and batched writes
//!
//! Builder-pattern wrappers over the descriptor machinery. The pool keeps
//! its own set budget on the CPU so exhaustion is deterministic and
//! observable before the driver is ever asked; allocation failure is a
//! `false` return the caller handles, not an error that unwinds the
//! frame. The writer validates every write against the layout up front
//! and applies writes only after allocation succeeds, so a failed build
//! mutates nothing.

use std::collections::BTreeMap;

use ash::vk;
use ash::Device;

use crate::render::vulkan::{VulkanError, VulkanResult};

/// Layout bindings keyed by binding index
pub type BindingMap = BTreeMap<u32, vk::DescriptorSetLayoutBinding>;

/// Descriptor set layout with its binding table retained for validation
pub struct DescriptorSetLayout {
    device: Device,
    layout: vk::DescriptorSetLayout,
    bindings: BindingMap,
}

impl DescriptorSetLayout {
    /// Start building a layout
    pub fn builder() -> DescriptorSetLayoutBuilder {
        DescriptorSetLayoutBuilder {
            bindings: BindingMap::new(),
        }
    }

    /// Get the layout handle
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    /// Bindings this layout declares, keyed by binding index
    pub fn bindings(&self) -> &BindingMap {
        &self.bindings
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Accumulates bindings for a [`DescriptorSetLayout`]
pub struct DescriptorSetLayoutBuilder {
    bindings: BindingMap,
}

impl DescriptorSetLayoutBuilder {
    /// Declare a binding. Each binding index may be declared at most once;
    /// a duplicate is a programming error and panics.
    pub fn add_binding(
        mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        stage_flags: vk::ShaderStageFlags,
        count: u32,
    ) -> Self {
        assert!(
            !self.bindings.contains_key(&binding),
            "binding {binding} already declared on this layout"
        );
        let layout_binding = vk::DescriptorSetLayoutBinding::builder()
            .binding(binding)
            .descriptor_type(descriptor_type)
            .descriptor_count(count)
            .stage_flags(stage_flags)
            .build();
        self.bindings.insert(binding, layout_binding);
        self
    }

    /// Create the layout on the device
    pub fn build(self, device: Device) -> VulkanResult<DescriptorSetLayout> {
        let set_layout_bindings: Vec<vk::DescriptorSetLayoutBinding> =
            self.bindings.values().copied().collect();
        let create_info =
            vk::DescriptorSetLayoutCreateInfo::builder().bindings(&set_layout_bindings);

        let layout = unsafe {
            device
                .create_descriptor_set_layout(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(DescriptorSetLayout {
            device,
            layout,
            bindings: self.bindings,
        })
    }
}

/// CPU-side set budget mirroring the pool's `max_sets`.
///
/// The driver's own exhaustion behavior varies; tracking the budget here
/// makes running out a deterministic, testable condition.
struct SetBudget {
    capacity: u32,
    used: u32,
}

impl SetBudget {
    fn new(capacity: u32) -> Self {
        Self { capacity, used: 0 }
    }

    /// Reserve one set; false when the budget is spent
    fn try_reserve(&mut self) -> bool {
        if self.used < self.capacity {
            self.used += 1;
            true
        } else {
            false
        }
    }

    fn release(&mut self, count: u32) {
        self.used = self.used.saturating_sub(count);
    }

    fn reset(&mut self) {
        self.used = 0;
    }
}

/// Descriptor pool with deterministic set accounting
pub struct DescriptorPool {
    device: Device,
    pool: vk::DescriptorPool,
    budget: SetBudget,
    flags: vk::DescriptorPoolCreateFlags,
}

impl DescriptorPool {
    /// Start building a pool
    pub fn builder() -> DescriptorPoolBuilder {
        DescriptorPoolBuilder {
            pool_sizes: Vec::new(),
            max_sets: 1000,
            flags: vk::DescriptorPoolCreateFlags::empty(),
        }
    }

    /// Get the pool handle
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }

    /// Allocate one set with the given layout into `set`.
    ///
    /// Returns false, leaving `set` untouched, when the set budget is
    /// spent or the driver refuses the allocation. Callers react by
    /// building a fresh pool rather than treating this as fatal.
    pub fn allocate_descriptor(
        &mut self,
        layout: vk::DescriptorSetLayout,
        set: &mut vk::DescriptorSet,
    ) -> bool {
        if !self.budget.try_reserve() {
            log::warn!("Descriptor pool set budget exhausted");
            return false;
        }

        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        match unsafe { self.device.allocate_descriptor_sets(&alloc_info) } {
            Ok(sets) => {
                *set = sets[0];
                true
            }
            Err(result) => {
                log::warn!("Descriptor set allocation failed: {result:?}");
                self.budget.release(1);
                false
            }
        }
    }

    /// Return sets to the pool. Requires the pool to have been built with
    /// the free-individual-sets flag.
    pub fn free_descriptors(&mut self, sets: &[vk::DescriptorSet]) -> VulkanResult<()> {
        assert!(
            self.flags
                .contains(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET),
            "pool was not created with FREE_DESCRIPTOR_SET"
        );
        unsafe {
            self.device
                .free_descriptor_sets(self.pool, sets)
                .map_err(VulkanError::Api)?;
        }
        self.budget.release(sets.len() as u32);
        Ok(())
    }

    /// Return every set to the pool at once
    pub fn reset(&mut self) -> VulkanResult<()> {
        unsafe {
            self.device
                .reset_descriptor_pool(self.pool, vk::DescriptorPoolResetFlags::empty())
                .map_err(VulkanError::Api)?;
        }
        self.budget.reset();
        Ok(())
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

/// Accumulates sizing for a [`DescriptorPool`]
pub struct DescriptorPoolBuilder {
    pool_sizes: Vec<vk::DescriptorPoolSize>,
    max_sets: u32,
    flags: vk::DescriptorPoolCreateFlags,
}

impl DescriptorPoolBuilder {
    /// Reserve capacity for `count` descriptors of one type
    pub fn add_pool_size(mut self, descriptor_type: vk::DescriptorType, count: u32) -> Self {
        self.pool_sizes.push(vk::DescriptorPoolSize {
            ty: descriptor_type,
            descriptor_count: count,
        });
        self
    }

    /// Cap the number of sets the pool may hand out
    pub fn set_max_sets(mut self, max_sets: u32) -> Self {
        self.max_sets = max_sets;
        self
    }

    /// Set pool creation flags (e.g. free-individual-sets)
    pub fn set_pool_flags(mut self, flags: vk::DescriptorPoolCreateFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Create the pool on the device
    pub fn build(self, device: Device) -> VulkanResult<DescriptorPool> {
        let create_info = vk::DescriptorPoolCreateInfo::builder()
            .pool_sizes(&self.pool_sizes)
            .max_sets(self.max_sets)
            .flags(self.flags);

        let pool = unsafe {
            device
                .create_descriptor_pool(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(DescriptorPool {
            device,
            pool,
            budget: SetBudget::new(self.max_sets),
            flags: self.flags,
        })
    }
}

enum PendingWrite {
    Buffer {
        binding: u32,
        descriptor_type: vk::DescriptorType,
        info: vk::DescriptorBufferInfo,
    },
    Image {
        binding: u32,
        descriptor_type: vk::DescriptorType,
        info: vk::DescriptorImageInfo,
    },
}

/// Batches descriptor writes for one set, validated against its layout.
///
/// Writes accumulate CPU-side; [`DescriptorWriter::build`] allocates the
/// set and applies them in one `update_descriptor_sets` call. When
/// allocation fails nothing is applied and the target handle is left
/// untouched.
pub struct DescriptorWriter<'a> {
    layout: &'a DescriptorSetLayout,
    pool: &'a mut DescriptorPool,
    writes: Vec<PendingWrite>,
}

impl<'a> DescriptorWriter<'a> {
    /// Start writing a set with the given layout, allocated from `pool`
    pub fn new(layout: &'a DescriptorSetLayout, pool: &'a mut DescriptorPool) -> Self {
        Self {
            layout,
            pool,
            writes: Vec::new(),
        }
    }

    /// Queue a buffer descriptor write. The binding must exist on the
    /// layout and hold a single descriptor; violations panic.
    pub fn write_buffer(mut self, binding: u32, info: vk::DescriptorBufferInfo) -> Self {
        let layout_binding = expect_single_binding(self.layout.bindings(), binding);
        self.writes.push(PendingWrite::Buffer {
            binding,
            descriptor_type: layout_binding.descriptor_type,
            info,
        });
        self
    }

    /// Queue an image descriptor write, under the same contract as
    /// [`Self::write_buffer`]
    pub fn write_image(mut self, binding: u32, info: vk::DescriptorImageInfo) -> Self {
        let layout_binding = expect_single_binding(self.layout.bindings(), binding);
        self.writes.push(PendingWrite::Image {
            binding,
            descriptor_type: layout_binding.descriptor_type,
            info,
        });
        self
    }

    /// Allocate the set and apply every queued write.
    ///
    /// Returns false without touching `set` when allocation fails.
    pub fn build(&mut self, set: &mut vk::DescriptorSet) -> bool {
        let mut allocated = vk::DescriptorSet::null();
        if !self
            .pool
            .allocate_descriptor(self.layout.handle(), &mut allocated)
        {
            return false;
        }
        *set = allocated;
        self.overwrite(*set);
        true
    }

    /// Apply the queued writes to an already-allocated set
    pub fn overwrite(&mut self, set: vk::DescriptorSet) {
        let writes: Vec<vk::WriteDescriptorSet> = self
            .writes
            .iter()
            .map(|write| match write {
                PendingWrite::Buffer {
                    binding,
                    descriptor_type,
                    info,
                } => vk::WriteDescriptorSet::builder()
                    .dst_set(set)
                    .dst_binding(*binding)
                    .descriptor_type(*descriptor_type)
                    .buffer_info(std::slice::from_ref(info))
                    .build(),
                PendingWrite::Image {
                    binding,
                    descriptor_type,
                    info,
                } => vk::WriteDescriptorSet::builder()
                    .dst_set(set)
                    .dst_binding(*binding)
                    .descriptor_type(*descriptor_type)
                    .image_info(std::slice::from_ref(info))
                    .build(),
            })
            .collect();

        unsafe {
            self.pool.device.update_descriptor_sets(&writes, &[]);
        }
    }
}

/// Look up a binding that must exist and hold exactly one descriptor
fn expect_single_binding(bindings: &BindingMap, binding: u32) -> &vk::DescriptorSetLayoutBinding {
    let layout_binding = bindings
        .get(&binding)
        .unwrap_or_else(|| panic!("layout has no binding {binding}"));
    assert_eq!(
        layout_binding.descriptor_count, 1,
        "binding {binding} expects multiple descriptors, single info given"
    );
    layout_binding
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding_map(entries: &[(u32, u32)]) -> BindingMap {
        entries
            .iter()
            .map(|&(binding, count)| {
                let layout_binding = vk::DescriptorSetLayoutBinding::builder()
                    .binding(binding)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .descriptor_count(count)
                    .stage_flags(vk::ShaderStageFlags::ALL_GRAPHICS)
                    .build();
                (binding, layout_binding)
            })
            .collect()
    }

    #[test]
    fn test_layout_builder_accumulates_bindings() {
        let builder = DescriptorSetLayout::builder()
            .add_binding(
                0,
                vk::DescriptorType::UNIFORM_BUFFER,
                vk::ShaderStageFlags::VERTEX,
                1,
            )
            .add_binding(
                1,
                vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                vk::ShaderStageFlags::FRAGMENT,
                1,
            );
        assert_eq!(builder.bindings.len(), 2);
        assert_eq!(
            builder.bindings[&1].descriptor_type,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER
        );
    }

    #[test]
    #[should_panic(expected = "already declared")]
    fn test_duplicate_binding_panics() {
        let _ = DescriptorSetLayout::builder()
            .add_binding(
                0,
                vk::DescriptorType::UNIFORM_BUFFER,
                vk::ShaderStageFlags::VERTEX,
                1,
            )
            .add_binding(
                0,
                vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                vk::ShaderStageFlags::FRAGMENT,
                1,
            );
    }

    #[test]
    fn test_expect_single_binding_accepts_declared() {
        let bindings = binding_map(&[(0, 1), (2, 1)]);
        let found = expect_single_binding(&bindings, 2);
        assert_eq!(found.binding, 2);
    }

    #[test]
    #[should_panic(expected = "no binding")]
    fn test_expect_single_binding_rejects_undeclared() {
        let bindings = binding_map(&[(0, 1)]);
        expect_single_binding(&bindings, 7);
    }

    #[test]
    #[should_panic(expected = "expects multiple descriptors")]
    fn test_expect_single_binding_rejects_arrayed() {
        let bindings = binding_map(&[(0, 4)]);
        expect_single_binding(&bindings, 0);
    }

    #[test]
    fn test_set_budget_exhausts_deterministically() {
        let mut budget = SetBudget::new(2);
        assert!(budget.try_reserve());
        assert!(budget.try_reserve());
        assert!(!budget.try_reserve());

        budget.release(1);
        assert!(budget.try_reserve());
        assert!(!budget.try_reserve());
    }

    #[test]
    fn test_set_budget_reset_restores_capacity() {
        let mut budget = SetBudget::new(1);
        assert!(budget.try_reserve());
        assert!(!budget.try_reserve());
        budget.reset();
        assert!(budget.try_reserve());
    }

    #[test]
    fn test_set_budget_release_saturates() {
        let mut budget = SetBudget::new(1);
        budget.release(5);
        assert!(budget.try_reserve());
        assert!(!budget.try_reserve());
    }
}
