//! Approximate size accounting and the pre-insert capacity gate
//!
//! Sizes are structural estimates of the payload, not allocator
//! measurements. They ignore allocator slack, hash-table load factor and
//! shared buffers, so the real resident size can be larger or smaller than
//! the estimate. The guard is a soft throttle, not a hard ceiling.

use serde_json::Value;

/// Bookkeeping charged per stored entry (timestamps, map slots)
pub const ENTRY_OVERHEAD_BYTES: usize = 64;

const VALUE_OVERHEAD_BYTES: usize = 8;
const CONTAINER_OVERHEAD_BYTES: usize = 24;

/// Estimated in-memory size of a cached payload
pub trait SizeEstimate {
    fn estimated_size(&self) -> usize;
}

impl SizeEstimate for Value {
    fn estimated_size(&self) -> usize {
        match self {
            Value::Null | Value::Bool(_) | Value::Number(_) => VALUE_OVERHEAD_BYTES,
            Value::String(s) => CONTAINER_OVERHEAD_BYTES + s.len(),
            Value::Array(items) => {
                CONTAINER_OVERHEAD_BYTES + items.iter().map(|v| v.estimated_size()).sum::<usize>()
            }
            Value::Object(map) => {
                CONTAINER_OVERHEAD_BYTES
                    + map
                        .iter()
                        .map(|(k, v)| CONTAINER_OVERHEAD_BYTES + k.len() + v.estimated_size())
                        .sum::<usize>()
            }
        }
    }
}

impl SizeEstimate for String {
    fn estimated_size(&self) -> usize {
        CONTAINER_OVERHEAD_BYTES + self.len()
    }
}

impl SizeEstimate for str {
    fn estimated_size(&self) -> usize {
        CONTAINER_OVERHEAD_BYTES + self.len()
    }
}

macro_rules! impl_size_estimate_fixed {
    ($($ty:ty),*) => {
        $(impl SizeEstimate for $ty {
            #[inline]
            fn estimated_size(&self) -> usize {
                std::mem::size_of::<$ty>()
            }
        })*
    };
}

impl_size_estimate_fixed!(bool, u8, u16, u32, u64, usize, i32, i64, f32, f64);

impl<T: SizeEstimate> SizeEstimate for Vec<T> {
    fn estimated_size(&self) -> usize {
        CONTAINER_OVERHEAD_BYTES + self.iter().map(|v| v.estimated_size()).sum::<usize>()
    }
}

impl<T: SizeEstimate + ?Sized> SizeEstimate for std::sync::Arc<T> {
    fn estimated_size(&self) -> usize {
        VALUE_OVERHEAD_BYTES + self.as_ref().estimated_size()
    }
}

/// Static capacity budget consulted before every insert
///
/// Never evicts; eviction belongs to the maintenance sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeGuard {
    capacity_bytes: usize,
}

impl SizeGuard {
    pub fn new(capacity_bytes: usize) -> Self {
        Self { capacity_bytes }
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    /// Whether a store with this footprint may take another entry
    #[inline]
    pub fn within_capacity(&self, footprint_bytes: usize) -> bool {
        footprint_bytes < self.capacity_bytes
    }

    /// Fraction of the budget in use (0.0 when the budget is zero)
    pub fn utilization(&self, footprint_bytes: usize) -> f64 {
        if self.capacity_bytes == 0 {
            return 0.0;
        }
        footprint_bytes as f64 / self.capacity_bytes as f64
    }
}
