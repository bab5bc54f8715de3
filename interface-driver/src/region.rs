//! Region Table: tracks registered device windows by id and address range, holding the
//! backing `PROT_NONE` reservation.

use anyhow::{ensure, Context, Result};

use interface_driver_sys::mman::{self, Reservation};

/// One registered device window.
#[derive(Debug)]
pub struct Region {
    pub device_id: u32,
    pub base: usize,
    pub size: usize,
    reservation: Reservation,
}

impl Region {
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base && addr < self.base + self.size
    }

    fn overlaps(&self, base: usize, size: usize) -> bool {
        base < self.base + self.size && self.base < base + size
    }
}

/// Holds every currently-registered [`Region`]: each live region keeps a no-access
/// reservation, ranges never overlap, and the table never grows past `capacity`.
#[derive(Debug, Default)]
pub struct RegionTable {
    regions: Vec<Region>,
    capacity: usize,
}

impl RegionTable {
    pub fn new(capacity: usize) -> Self {
        RegionTable {
            regions: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Register a new device window. Reserves an anonymous `PROT_NONE` mapping at exactly
    /// `base`; fails if the id is a duplicate, the range overlaps an existing one, the
    /// table is full, or `base`/`size` are not page-aligned.
    pub fn register(&mut self, device_id: u32, base: usize, size: usize) -> Result<()> {
        ensure!(
            self.regions.len() < self.capacity,
            "region table is full (capacity={})",
            self.capacity
        );
        ensure!(
            !self.regions.iter().any(|r| r.device_id == device_id),
            "device {} is already registered",
            device_id
        );

        let page_size = mman::page_size();
        ensure!(
            base % page_size == 0,
            "base address {:#x} is not page-aligned (page size {})",
            base,
            page_size
        );
        ensure!(
            size > 0 && size % page_size == 0,
            "size {:#x} is not a nonzero multiple of the page size ({})",
            size,
            page_size
        );

        ensure!(
            !self.regions.iter().any(|r| r.overlaps(base, size)),
            "range [{:#x}, {:#x}) overlaps an already-registered region",
            base,
            base + size
        );

        // Safety: disjointness and page-alignment were just checked above, and `base` is
        // only ever reserved once per id by this function.
        let reservation = unsafe { mman::reserve_at(base, size) }
            .with_context(|| format!("failed to reserve device window at {base:#x}"))?;

        log::debug!(
            "registered device {device_id} at [{base:#x}, {:#x})",
            base + size
        );

        self.regions.push(Region {
            device_id,
            base,
            size,
            reservation,
        });

        Ok(())
    }

    /// Remove a previously registered device window and release its reservation.
    pub fn unregister(&mut self, device_id: u32) -> Result<()> {
        let index = self
            .regions
            .iter()
            .position(|r| r.device_id == device_id)
            .with_context(|| format!("device {device_id} is not registered"))?;

        let region = self.regions.remove(index);
        // Safety: the reservation is only released once, here, and the region is already
        // removed from the table so no fault can observe it as registered afterwards.
        unsafe { mman::release(&region.reservation) }
            .with_context(|| format!("failed to release device window for {device_id}"))?;

        log::debug!("unregistered device {device_id}");
        Ok(())
    }

    /// Find the region owning `addr`, used by the fault handler (component D).
    pub fn find_by_address(&self, addr: usize) -> Option<&Region> {
        self.regions.iter().find(|r| r.contains(addr))
    }

    /// Release every reservation and empty the table, used by [`crate::cleanup`].
    pub fn clear(&mut self) {
        for region in self.regions.drain(..) {
            // Safety: each region is released exactly once as it is drained.
            if let Err(err) = unsafe { mman::release(&region.reservation) } {
                log::warn!("failed to release region {}: {err}", region.device_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_by_address_respects_half_open_range() {
        let mut table = RegionTable::new(16);
        let page = mman::page_size();
        table.register(0, 0x1000_0000, page).unwrap();

        assert!(table.find_by_address(0x1000_0000).is_some());
        assert!(table.find_by_address(0x1000_0000 + page - 1).is_some());
        assert!(table.find_by_address(0x1000_0000 + page).is_none());

        table.unregister(0).unwrap();
    }

    #[test]
    fn rejects_overlapping_ranges() {
        let mut table = RegionTable::new(16);
        let page = mman::page_size();
        table.register(0, 0x1001_0000, page * 2).unwrap();

        let err = table.register(1, 0x1001_0000 + page, page);
        assert!(err.is_err());

        table.unregister(0).unwrap();
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut table = RegionTable::new(16);
        let page = mman::page_size();
        table.register(0, 0x1002_0000, page).unwrap();

        let err = table.register(0, 0x1003_0000, page);
        assert!(err.is_err());

        table.unregister(0).unwrap();
    }

    #[test]
    fn rejects_misaligned_base_and_size() {
        let mut table = RegionTable::new(16);
        let page = mman::page_size();

        assert!(table.register(0, 0x1004_0001, page).is_err());
        assert!(table.register(0, 0x1004_0000, page + 1).is_err());
    }

    #[test]
    fn enforces_capacity() {
        let mut table = RegionTable::new(1);
        let page = mman::page_size();
        table.register(0, 0x1005_0000, page).unwrap();

        let err = table.register(1, 0x1006_0000, page);
        assert!(err.is_err());

        table.unregister(0).unwrap();
    }

    #[test]
    fn unregister_unknown_device_errors() {
        let mut table = RegionTable::new(16);
        assert!(table.unregister(99).is_err());
    }
}
