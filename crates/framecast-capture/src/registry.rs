//! Fixed-capacity render-target registry.
//!
//! Every registered surface occupies one slot. Slot indices are stable
//! for the lifetime of a registration and are the currency the rest of
//! the pipeline trades in (submission queue entries, encode calls). All
//! transitions are linearized through a single mutex, so two concurrent
//! `register` calls can never hand out the same index.

use std::sync::Mutex;

use framecast_core::errors::RegistryError;
use framecast_core::types::{BufferId, Resolution, SlotIndex, SurfaceRef};

/// Internal lifecycle state of one capture slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Free,
    Used,
    /// Surface is mid-CSC. Treated as `Used` by [`TargetRegistry::query_state`];
    /// the distinction only matters to the pipeline's convert bracket.
    Converting,
}

/// Answer to a non-blocking state query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotQuery {
    Free,
    Used,
    /// Index out of range. Reported as a value, not an error, so state
    /// polling never fails.
    Invalid,
}

#[derive(Debug)]
struct Slot {
    state: SlotState,
    surface: Option<SurfaceRef>,
    size: Resolution,
    last_buffer: Option<BufferId>,
}

impl Slot {
    fn free() -> Self {
        Self {
            state: SlotState::Free,
            surface: None,
            size: Resolution::new(0, 0),
            last_buffer: None,
        }
    }
}

/// Fixed-capacity table of capture slots.
pub struct TargetRegistry {
    slots: Mutex<Vec<Slot>>,
    limit: Resolution,
}

impl TargetRegistry {
    /// `capacity` is the maximum number of simultaneously registered
    /// targets; `limit` the backend's maximum input dimensions.
    pub fn new(capacity: usize, limit: Resolution) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, Slot::free);
        Self { slots: Mutex::new(slots), limit }
    }

    pub fn capacity(&self) -> usize {
        self.slots.lock().expect("registry lock").len()
    }

    pub fn used_count(&self) -> usize {
        self.slots
            .lock()
            .expect("registry lock")
            .iter()
            .filter(|s| s.state != SlotState::Free)
            .count()
    }

    /// Register a render target. Moves the first free slot `FREE → USED`
    /// and returns its index. Fails without mutating any state when
    /// capacity is exhausted or the dimensions are invalid.
    pub fn register(
        &self,
        surface: SurfaceRef,
        size: Resolution,
    ) -> Result<SlotIndex, RegistryError> {
        if !size.is_valid() || !size.fits_within(self.limit) {
            return Err(RegistryError::InvalidDimensions {
                requested: size,
                limit: self.limit,
            });
        }

        let mut slots = self.slots.lock().expect("registry lock");
        let capacity = slots.len();
        let Some((index, slot)) = slots
            .iter_mut()
            .enumerate()
            .find(|(_, s)| s.state == SlotState::Free)
        else {
            return Err(RegistryError::Capacity { capacity });
        };

        slot.state = SlotState::Used;
        slot.surface = Some(surface);
        slot.size = size;
        slot.last_buffer = None;
        Ok(index as SlotIndex)
    }

    /// Remove a registration, returning the slot to the free pool.
    ///
    /// Not idempotent: removing an out-of-range or already-free index is
    /// an invalid-handle error, not a no-op.
    pub fn remove(&self, index: SlotIndex) -> Result<(), RegistryError> {
        let mut slots = self.slots.lock().expect("registry lock");
        let slot = slots
            .get_mut(index as usize)
            .filter(|s| s.state != SlotState::Free)
            .ok_or(RegistryError::InvalidHandle { index })?;
        *slot = Slot::free();
        Ok(())
    }

    /// Non-blocking state query. Out-of-range indices report
    /// [`SlotQuery::Invalid`] rather than failing.
    pub fn query_state(&self, index: SlotIndex) -> SlotQuery {
        let slots = self.slots.lock().expect("registry lock");
        match slots.get(index as usize).map(|s| s.state) {
            Some(SlotState::Free) => SlotQuery::Free,
            Some(SlotState::Used) | Some(SlotState::Converting) => SlotQuery::Used,
            None => SlotQuery::Invalid,
        }
    }

    /// Move a slot `USED → CONVERTING` and hand back what the CSC pass
    /// needs. The caller must close the bracket with [`Self::end_convert`].
    pub fn begin_convert(
        &self,
        index: SlotIndex,
    ) -> Result<(SurfaceRef, Resolution), RegistryError> {
        let mut slots = self.slots.lock().expect("registry lock");
        let slot = slots
            .get_mut(index as usize)
            .filter(|s| s.state == SlotState::Used)
            .ok_or(RegistryError::InvalidHandle { index })?;
        slot.state = SlotState::Converting;
        let surface = slot.surface.expect("USED slot always has a surface");
        Ok((surface, slot.size))
    }

    /// Close a convert bracket: `CONVERTING → USED`, recording the
    /// converted buffer identity when the pass succeeded. The slot stays
    /// USED on failure so the caller can inspect or retry.
    pub fn end_convert(
        &self,
        index: SlotIndex,
        buffer: Option<BufferId>,
    ) -> Result<(), RegistryError> {
        let mut slots = self.slots.lock().expect("registry lock");
        let slot = slots
            .get_mut(index as usize)
            .filter(|s| s.state == SlotState::Converting)
            .ok_or(RegistryError::InvalidHandle { index })?;
        slot.state = SlotState::Used;
        if buffer.is_some() {
            slot.last_buffer = buffer;
        }
        Ok(())
    }

    /// Last buffer identity recorded for a slot, if any conversion has
    /// completed since registration.
    pub fn last_buffer(&self, index: SlotIndex) -> Option<BufferId> {
        let slots = self.slots.lock().expect("registry lock");
        slots.get(index as usize).and_then(|s| s.last_buffer)
    }

    /// Re-validate every USED slot against a new target dimension.
    ///
    /// Returns the indices of slots whose backing surface no longer fits
    /// and must be re-registered by the caller. Incompatible slots stay
    /// USED; the registry never drops them silently.
    pub fn resize(&self, new_size: Resolution) -> Result<Vec<SlotIndex>, RegistryError> {
        if !new_size.is_valid() || !new_size.fits_within(self.limit) {
            return Err(RegistryError::InvalidDimensions {
                requested: new_size,
                limit: self.limit,
            });
        }

        let slots = self.slots.lock().expect("registry lock");
        let incompatible = slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.state != SlotState::Free && !s.size.fits_within(new_size))
            .map(|(i, _)| i as SlotIndex)
            .collect();
        Ok(incompatible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(capacity: usize) -> TargetRegistry {
        TargetRegistry::new(capacity, Resolution::UHD)
    }

    #[test]
    fn register_moves_slot_to_used() {
        let reg = registry(2);
        let idx = reg.register(SurfaceRef::new(0xA), Resolution::FHD).unwrap();
        assert_eq!(reg.query_state(idx), SlotQuery::Used);
    }

    #[test]
    fn indices_are_unique_among_used_slots() {
        let reg = registry(2);
        let a = reg.register(SurfaceRef::new(1), Resolution::FHD).unwrap();
        let b = reg.register(SurfaceRef::new(2), Resolution::FHD).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn register_beyond_capacity_fails_without_mutation() {
        let reg = registry(2);
        reg.register(SurfaceRef::new(1), Resolution::FHD).unwrap();
        reg.register(SurfaceRef::new(2), Resolution::FHD).unwrap();
        let err = reg.register(SurfaceRef::new(3), Resolution::FHD).unwrap_err();
        assert_eq!(err, RegistryError::Capacity { capacity: 2 });
        assert_eq!(reg.used_count(), 2);
    }

    #[test]
    fn zero_and_oversize_dimensions_are_rejected() {
        let reg = registry(2);
        assert!(matches!(
            reg.register(SurfaceRef::new(1), Resolution::new(0, 1080)),
            Err(RegistryError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            reg.register(SurfaceRef::new(1), Resolution::new(7680, 4320)),
            Err(RegistryError::InvalidDimensions { .. })
        ));
        assert_eq!(reg.used_count(), 0);
    }

    #[test]
    fn double_remove_is_an_error_not_a_noop() {
        let reg = registry(2);
        let idx = reg.register(SurfaceRef::new(1), Resolution::FHD).unwrap();
        reg.remove(idx).unwrap();
        assert_eq!(
            reg.remove(idx),
            Err(RegistryError::InvalidHandle { index: idx })
        );
    }

    #[test]
    fn query_state_reports_invalid_out_of_range() {
        let reg = registry(2);
        assert_eq!(reg.query_state(99), SlotQuery::Invalid);
    }

    #[test]
    fn freed_slot_index_is_reused() {
        let reg = registry(1);
        let a = reg.register(SurfaceRef::new(1), Resolution::FHD).unwrap();
        reg.remove(a).unwrap();
        let b = reg.register(SurfaceRef::new(2), Resolution::FHD).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn convert_bracket_round_trips_through_used() {
        let reg = registry(1);
        let idx = reg.register(SurfaceRef::new(1), Resolution::FHD).unwrap();
        let (surface, size) = reg.begin_convert(idx).unwrap();
        assert_eq!(surface.raw(), 1);
        assert_eq!(size, Resolution::FHD);
        // Mid-conversion the slot still reads as USED externally.
        assert_eq!(reg.query_state(idx), SlotQuery::Used);
        reg.end_convert(idx, Some(BufferId(42))).unwrap();
        assert_eq!(reg.last_buffer(idx), Some(BufferId(42)));
    }

    #[test]
    fn begin_convert_on_free_slot_fails_fast() {
        let reg = registry(1);
        assert!(matches!(
            reg.begin_convert(0),
            Err(RegistryError::InvalidHandle { .. })
        ));
    }

    #[test]
    fn failed_convert_leaves_slot_used_and_buffer_unchanged() {
        let reg = registry(1);
        let idx = reg.register(SurfaceRef::new(1), Resolution::FHD).unwrap();
        reg.begin_convert(idx).unwrap();
        reg.end_convert(idx, None).unwrap();
        assert_eq!(reg.query_state(idx), SlotQuery::Used);
        assert_eq!(reg.last_buffer(idx), None);
    }

    #[test]
    fn resize_reports_incompatible_slots_without_dropping_them() {
        let reg = registry(2);
        let small = reg.register(SurfaceRef::new(1), Resolution::FHD).unwrap();
        let big = reg.register(SurfaceRef::new(2), Resolution::QHD).unwrap();
        let incompatible = reg.resize(Resolution::FHD).unwrap();
        assert_eq!(incompatible, vec![big]);
        assert_eq!(reg.query_state(small), SlotQuery::Used);
        assert_eq!(reg.query_state(big), SlotQuery::Used);
    }
}
