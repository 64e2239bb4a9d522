/// Device limits and allocation policy for a [`crate::Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextConfig {
    /// Reported as the kernel work-group size. D3D12 caps compute thread groups at 1024 threads.
    pub max_threads_per_group: u32,
    pub preferred_work_group_size_multiple: u32,
    /// Largest single buffer allocation, in bytes.
    pub max_mem_alloc_size: u64,
}

impl ContextConfig {
    pub const D3D12_CS_THREAD_GROUP_MAX_THREADS_PER_GROUP: u32 = 1024;
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_threads_per_group: Self::D3D12_CS_THREAD_GROUP_MAX_THREADS_PER_GROUP,
            preferred_work_group_size_multiple: 64,
            max_mem_alloc_size: 256 * 1024 * 1024,
        }
    }
}
