// SPDX-License-Identifier: MPL-2.0

//! Fixed-capacity device slot table with generational handles
//!
//! Handles are plain integers for callers but carry a per-slot generation
//! internally, so a handle kept across a free/reopen of the same slot fails
//! fast instead of silently addressing the wrong device.

use crate::errors::{CaptureError, CaptureResult};

/// Maximum number of simultaneously open capture devices
pub const MAX_DEVICES: usize = 100;

/// Opaque handle to an open capture device slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureHandle {
    raw: u64,
}

impl CaptureHandle {
    fn new(index: usize, generation: u64) -> Self {
        CaptureHandle {
            raw: generation * MAX_DEVICES as u64 + index as u64,
        }
    }

    /// Integer value of the handle, stable for the lifetime of the slot
    pub fn raw(self) -> u64 {
        self.raw
    }

    /// Reconstruct a handle from its integer value (e.g. CLI input).
    /// Validity is only established by a successful slot lookup.
    pub fn from_raw(raw: u64) -> Self {
        CaptureHandle { raw }
    }

    fn index(self) -> usize {
        (self.raw % MAX_DEVICES as u64) as usize
    }

    fn generation(self) -> u64 {
        self.raw / MAX_DEVICES as u64
    }
}

impl std::fmt::Display for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

struct Slot<T> {
    generation: u64,
    value: Option<T>,
}

/// Bounded arena mapping handles to per-device records
pub struct SlotTable<T> {
    slots: Vec<Slot<T>>,
}

impl<T> SlotTable<T> {
    /// Table with the default capacity of [`MAX_DEVICES`]
    pub fn new() -> Self {
        Self::with_capacity(MAX_DEVICES)
    }

    /// Table with an explicit capacity (tests use small ones)
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            slots.push(Slot {
                generation: 0,
                value: None,
            });
        }
        SlotTable { slots }
    }

    /// Claim a free slot for `value`.
    ///
    /// Exceeding the capacity is a caller error, not a leak: the value is
    /// dropped and `OutOfSlots` returned.
    pub fn allocate(&mut self, value: T) -> CaptureResult<CaptureHandle> {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.is_none() {
                slot.value = Some(value);
                return Ok(CaptureHandle::new(index, slot.generation));
            }
        }
        Err(CaptureError::OutOfSlots)
    }

    /// Look up the record for a handle, failing fast on freed, stale or
    /// never-allocated handles
    pub fn get(&self, handle: CaptureHandle) -> CaptureResult<&T> {
        let slot = self
            .slots
            .get(handle.index())
            .ok_or(CaptureError::InvalidHandle)?;
        if slot.generation != handle.generation() {
            return Err(CaptureError::InvalidHandle);
        }
        slot.value.as_ref().ok_or(CaptureError::InvalidHandle)
    }

    /// Release a slot, bumping its generation so the handle is dead.
    /// Returns the stored record so the caller can run teardown on it.
    pub fn free(&mut self, handle: CaptureHandle) -> CaptureResult<T> {
        let slot = self
            .slots
            .get_mut(handle.index())
            .ok_or(CaptureError::InvalidHandle)?;
        if slot.generation != handle.generation() || slot.value.is_none() {
            return Err(CaptureError::InvalidHandle);
        }
        slot.generation += 1;
        Ok(slot.value.take().unwrap())
    }

    /// Number of occupied slots
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|s| s.value.is_some()).count()
    }

    /// Iterate over all occupied slots
    pub fn iter(&self) -> impl Iterator<Item = (CaptureHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|v| (CaptureHandle::new(index, slot.generation), v))
        })
    }
}

impl<T> Default for SlotTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_get_free() {
        let mut table: SlotTable<&str> = SlotTable::with_capacity(4);
        let h = table.allocate("camera0").unwrap();
        assert_eq!(*table.get(h).unwrap(), "camera0");
        assert_eq!(table.free(h).unwrap(), "camera0");
        assert!(matches!(table.get(h), Err(CaptureError::InvalidHandle)));
    }

    #[test]
    fn test_out_of_slots() {
        let mut table: SlotTable<u32> = SlotTable::with_capacity(2);
        table.allocate(0).unwrap();
        table.allocate(1).unwrap();
        assert!(matches!(table.allocate(2), Err(CaptureError::OutOfSlots)));
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut table: SlotTable<u32> = SlotTable::with_capacity(1);
        let old = table.allocate(7).unwrap();
        table.free(old).unwrap();

        // Same physical slot, new generation
        let new = table.allocate(8).unwrap();
        assert_ne!(old.raw(), new.raw());
        assert!(matches!(table.get(old), Err(CaptureError::InvalidHandle)));
        assert_eq!(*table.get(new).unwrap(), 8);
    }

    #[test]
    fn test_double_free_is_error_not_panic() {
        let mut table: SlotTable<u32> = SlotTable::with_capacity(1);
        let h = table.allocate(1).unwrap();
        table.free(h).unwrap();
        assert!(matches!(table.free(h), Err(CaptureError::InvalidHandle)));
    }

    #[test]
    fn test_never_allocated_handle() {
        let table: SlotTable<u32> = SlotTable::with_capacity(4);
        let bogus = CaptureHandle::from_raw(2);
        assert!(matches!(table.get(bogus), Err(CaptureError::InvalidHandle)));
        let beyond = CaptureHandle::from_raw(MAX_DEVICES as u64 * 50 + 3);
        assert!(matches!(table.get(beyond), Err(CaptureError::InvalidHandle)));
    }

    #[test]
    fn test_open_count_tracks_occupancy() {
        let mut table: SlotTable<u32> = SlotTable::with_capacity(3);
        assert_eq!(table.open_count(), 0);
        let a = table.allocate(0).unwrap();
        let _b = table.allocate(1).unwrap();
        assert_eq!(table.open_count(), 2);
        table.free(a).unwrap();
        assert_eq!(table.open_count(), 1);
    }
}
