//! Temporary render target pool
//!
//! Render targets requested by passes live for a single frame. Instead of
//! creating a texture every frame, released targets are parked on a free list
//! keyed by their descriptor and handed out again to the next request with an
//! identical descriptor.
//!
//! # Example
//!
//! ```ignore
//! use crate::renderer::pool::{TargetDesc, TargetPool};
//!
//! let mut pool: TargetPool<Texture> = TargetPool::new();
//! let desc = TargetDesc::new(1280, 720, wgpu::TextureFormat::Rgba16Float);
//!
//! // Bind a target under a name passes can look up
//! let index = pool.acquire_named("_OcclusionMask", desc, |d| create_texture(d));
//!
//! // Release at the end of the frame, the texture stays around for reuse
//! pool.release_named("_OcclusionMask");
//! pool.end_frame();
//! ```

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

// ============================================================================
// Descriptors and indices
// ============================================================================

/// Key used to match pooled targets with new requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetDesc {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Texel format
    pub format: wgpu::TextureFormat,
}

impl TargetDesc {
    /// Create a new descriptor. Zero extents are bumped to 1.
    #[must_use]
    pub fn new(width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            format,
        }
    }

    /// Descriptor scaled by `scale`, keeping at least one pixel per side.
    #[must_use]
    pub fn scaled(width: u32, height: u32, scale: f32, format: wgpu::TextureFormat) -> Self {
        let w = (width as f32 * scale).round() as u32;
        let h = (height as f32 * scale).round() as u32;
        Self::new(w, h, format)
    }

    /// Size as an `Extent3d`
    #[must_use]
    pub const fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

/// Index into a pool, identifying a specific slot.
///
/// The index stays valid until the target is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolIndex(usize);

// ============================================================================
// Pool slot
// ============================================================================

#[derive(Debug)]
enum Slot<T> {
    /// Handed out for the current frame
    InUse { desc: TargetDesc, value: T },
    /// Released, waiting for a matching request
    Idle {
        desc: TargetDesc,
        value: T,
        idle_frames: u32,
    },
    /// Dropped by `trim`, links to the next vacant slot
    Vacant(usize),
}

// ============================================================================
// Target pool
// ============================================================================

/// Descriptor-keyed pool of per-frame render targets.
///
/// | Operation       | Time Complexity |
/// |-----------------|-----------------|
/// | `acquire`       | O(1) amortized  |
/// | `release`       | O(1)            |
/// | `get` / `named` | O(1)            |
/// | `end_frame`     | O(n)            |
/// | `trim`          | O(n)            |
#[derive(Debug)]
pub struct TargetPool<T> {
    slots: Vec<Slot<T>>,
    /// Head of the vacant slot list, `NONE` when empty
    vacant_head: usize,
    /// Idle slots by descriptor, most recently released last
    idle: FxHashMap<TargetDesc, SmallVec<[usize; 4]>>,
    /// Shader-visible names bound this frame
    names: FxHashMap<String, PoolIndex>,
    active_count: usize,
}

impl<T> TargetPool<T> {
    const NONE: usize = usize::MAX;

    /// Create an empty pool
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            vacant_head: Self::NONE,
            idle: FxHashMap::default(),
            names: FxHashMap::default(),
            active_count: 0,
        }
    }

    /// Acquire a target matching `desc`.
    ///
    /// An idle target with the same descriptor is reused when available,
    /// otherwise `create` builds a new one.
    pub fn acquire(
        &mut self,
        desc: TargetDesc,
        create: impl FnOnce(&TargetDesc) -> T,
    ) -> PoolIndex {
        self.active_count += 1;

        if let Some(index) = self.idle.get_mut(&desc).and_then(|list| list.pop()) {
            let slot = std::mem::replace(&mut self.slots[index], Slot::Vacant(Self::NONE));
            if let Slot::Idle { desc, value, .. } = slot {
                self.slots[index] = Slot::InUse { desc, value };
                return PoolIndex(index);
            }
            // Free lists only ever point at idle slots
            self.slots[index] = slot;
        }

        let value = create(&desc);
        log::trace!(
            "Allocating render target {}x{} {:?}",
            desc.width,
            desc.height,
            desc.format
        );

        if self.vacant_head != Self::NONE {
            let index = self.vacant_head;
            if let Slot::Vacant(next) = self.slots[index] {
                self.vacant_head = next;
            }
            self.slots[index] = Slot::InUse { desc, value };
            PoolIndex(index)
        } else {
            let index = self.slots.len();
            self.slots.push(Slot::InUse { desc, value });
            PoolIndex(index)
        }
    }

    /// Release a target back to the pool.
    ///
    /// Returns `false` if the index was not in use.
    pub fn release(&mut self, index: PoolIndex) -> bool {
        let Some(slot) = self.slots.get_mut(index.0) else {
            return false;
        };
        if !matches!(slot, Slot::InUse { .. }) {
            return false;
        }

        let taken = std::mem::replace(slot, Slot::Vacant(Self::NONE));
        if let Slot::InUse { desc, value } = taken {
            *slot = Slot::Idle {
                desc,
                value,
                idle_frames: 0,
            };
            self.idle.entry(desc).or_default().push(index.0);
        }
        self.active_count -= 1;

        true
    }

    /// Acquire a target and bind it to `name`.
    ///
    /// If `name` is already bound to a target with the same descriptor that
    /// target is returned as is. A binding with a different descriptor is
    /// released first.
    pub fn acquire_named(
        &mut self,
        name: &str,
        desc: TargetDesc,
        create: impl FnOnce(&TargetDesc) -> T,
    ) -> PoolIndex {
        if let Some(&existing) = self.names.get(name) {
            if self.desc(existing) == Some(desc) {
                return existing;
            }
            self.release_named(name);
        }

        let index = self.acquire(desc, create);
        self.names.insert(name.to_owned(), index);
        index
    }

    /// Index bound to `name` this frame
    #[must_use]
    pub fn named(&self, name: &str) -> Option<PoolIndex> {
        self.names.get(name).copied()
    }

    /// Target bound to `name` this frame
    #[must_use]
    pub fn get_named(&self, name: &str) -> Option<&T> {
        self.named(name).and_then(|index| self.get(index))
    }

    /// Release the target bound to `name` and drop the binding.
    pub fn release_named(&mut self, name: &str) -> bool {
        match self.names.remove(name) {
            Some(index) => self.release(index),
            None => false,
        }
    }

    /// Get an in-use target by index
    #[must_use]
    #[inline]
    pub fn get(&self, index: PoolIndex) -> Option<&T> {
        match self.slots.get(index.0)? {
            Slot::InUse { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Descriptor of an in-use target
    #[must_use]
    pub fn desc(&self, index: PoolIndex) -> Option<TargetDesc> {
        match self.slots.get(index.0)? {
            Slot::InUse { desc, .. } => Some(*desc),
            _ => None,
        }
    }

    /// Age idle targets by one frame.
    pub fn end_frame(&mut self) {
        for slot in &mut self.slots {
            if let Slot::Idle { idle_frames, .. } = slot {
                *idle_frames = idle_frames.saturating_add(1);
            }
        }
    }

    /// Drop idle targets unused for more than `max_idle_frames` frames.
    ///
    /// Returns the number of targets dropped.
    pub fn trim(&mut self, max_idle_frames: u32) -> usize {
        let mut dropped = 0;

        for index in 0..self.slots.len() {
            let stale = match &self.slots[index] {
                Slot::Idle {
                    desc, idle_frames, ..
                } if *idle_frames > max_idle_frames => Some(*desc),
                _ => None,
            };
            let Some(desc) = stale else {
                continue;
            };

            if let Some(list) = self.idle.get_mut(&desc) {
                list.retain(|i| *i != index);
                if list.is_empty() {
                    self.idle.remove(&desc);
                }
            }
            self.slots[index] = Slot::Vacant(self.vacant_head);
            self.vacant_head = index;
            dropped += 1;
        }

        if dropped > 0 {
            log::debug!("Trimmed {} idle render targets", dropped);
        }
        dropped
    }

    /// Number of targets handed out
    #[must_use]
    #[inline]
    pub const fn active_count(&self) -> usize {
        self.active_count
    }

    /// Number of targets parked for reuse
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.values().map(|list| list.len()).sum()
    }
}

impl<T> Default for TargetPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    #[derive(Debug, PartialEq)]
    struct FakeTarget {
        id: u32,
    }

    fn desc(w: u32, h: u32) -> TargetDesc {
        TargetDesc::new(w, h, FORMAT)
    }

    #[test]
    fn test_reuses_matching_descriptor() {
        let mut pool: TargetPool<FakeTarget> = TargetPool::new();

        let a = pool.acquire(desc(64, 64), |_| FakeTarget { id: 1 });
        assert!(pool.release(a));

        let b = pool.acquire(desc(64, 64), |_| FakeTarget { id: 2 });
        assert_eq!(a, b);
        assert_eq!(pool.get(b).unwrap().id, 1, "Texture should be reused");
    }

    #[test]
    fn test_mismatched_descriptor_allocates() {
        let mut pool: TargetPool<FakeTarget> = TargetPool::new();

        let a = pool.acquire(desc(64, 64), |_| FakeTarget { id: 1 });
        pool.release(a);

        let b = pool.acquire(desc(32, 64), |_| FakeTarget { id: 2 });
        assert_ne!(a, b);
        assert_eq!(pool.get(b).unwrap().id, 2);
        assert_eq!(pool.idle_count(), 1);

        let c = pool.acquire(
            TargetDesc::new(64, 64, wgpu::TextureFormat::Rgba8Unorm),
            |_| FakeTarget { id: 3 },
        );
        assert_eq!(pool.get(c).unwrap().id, 3);
    }

    #[test]
    fn test_double_release() {
        let mut pool: TargetPool<FakeTarget> = TargetPool::new();

        let a = pool.acquire(desc(8, 8), |_| FakeTarget { id: 1 });
        assert!(pool.release(a));
        assert!(!pool.release(a));
        assert_eq!(pool.active_count(), 0);
        assert!(pool.get(a).is_none());
    }

    #[test]
    fn test_named_binding() {
        let mut pool: TargetPool<FakeTarget> = TargetPool::new();

        let a = pool.acquire_named("_Mask", desc(16, 16), |_| FakeTarget { id: 1 });
        assert_eq!(pool.named("_Mask"), Some(a));
        assert_eq!(pool.get_named("_Mask").unwrap().id, 1);

        // Same descriptor keeps the binding
        let again = pool.acquire_named("_Mask", desc(16, 16), |_| FakeTarget { id: 9 });
        assert_eq!(again, a);
        assert_eq!(pool.active_count(), 1);

        // New descriptor rebinds
        let b = pool.acquire_named("_Mask", desc(32, 32), |_| FakeTarget { id: 2 });
        assert_ne!(a, b);
        assert_eq!(pool.active_count(), 1);
        assert_eq!(pool.get_named("_Mask").unwrap().id, 2);

        assert!(pool.release_named("_Mask"));
        assert!(pool.named("_Mask").is_none());
        assert!(!pool.release_named("_Mask"));
    }

    #[test]
    fn test_trim_drops_stale_targets() {
        let mut pool: TargetPool<FakeTarget> = TargetPool::new();

        let a = pool.acquire(desc(8, 8), |_| FakeTarget { id: 1 });
        let b = pool.acquire(desc(16, 16), |_| FakeTarget { id: 2 });
        pool.release(a);

        pool.end_frame();
        pool.end_frame();
        assert_eq!(pool.trim(3), 0);

        pool.end_frame();
        pool.end_frame();
        assert_eq!(pool.trim(3), 1);
        assert_eq!(pool.idle_count(), 0);

        // The vacated slot is reused for the next allocation
        let c = pool.acquire(desc(8, 8), |_| FakeTarget { id: 3 });
        assert_eq!(c, a);
        assert_eq!(pool.get(c).unwrap().id, 3);
        assert_eq!(pool.get(b).unwrap().id, 2);
    }

    #[test]
    fn test_scaled_descriptor_never_zero() {
        let d = TargetDesc::scaled(3, 1, 0.25, FORMAT);
        assert_eq!((d.width, d.height), (1, 1));

        let d = TargetDesc::scaled(1280, 720, 0.5, FORMAT);
        assert_eq!((d.width, d.height), (640, 360));
    }
}
