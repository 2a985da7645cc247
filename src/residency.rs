use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

use crate::errors::XGError;

///
/// Accounting for arrays staged into accelerator memory.
///
/// Every staged array or scratch reservation is a guard borrowing the manager; the bytes
/// it holds are returned when the guard is dropped, on every exit path. A manager with a
/// capacity refuses a staging that would exceed it with [`XGError::AllocationFailure`].
///
#[derive(Debug, Default)]
pub struct ResidencyManager
{
    capacity: Option<usize>,
    live: AtomicUsize,
    peak: AtomicUsize,
    buffers: AtomicUsize,
    staged: AtomicUsize,
}

/// Point-in-time counters of a [`ResidencyManager`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ResidencyStats
{
    pub live_bytes: usize,
    pub peak_bytes: usize,
    pub live_buffers: usize,
    /// Stagings over the manager's lifetime.
    pub total_stagings: usize,
}

impl ResidencyManager
{
    pub fn new(capacity: Option<usize>) -> Self
    {
        Self { capacity, ..Default::default() }
    }

    pub fn unlimited() -> Self
    {
        Self::new(None)
    }

    pub fn capacity(&self) -> Option<usize>
    {
        self.capacity
    }

    pub fn live_bytes(&self) -> usize
    {
        self.live.load(Ordering::Acquire)
    }

    pub fn live_buffers(&self) -> usize
    {
        self.buffers.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> ResidencyStats
    {
        ResidencyStats {
            live_bytes: self.live.load(Ordering::Acquire),
            peak_bytes: self.peak.load(Ordering::Acquire),
            live_buffers: self.buffers.load(Ordering::Acquire),
            total_stagings: self.staged.load(Ordering::Acquire),
        }
    }

    fn acquire(&self, label: &'static str, bytes: usize) -> Result<(), XGError>
    {
        let capacity = self.capacity;
        let before = self.live.fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
            let next = live.checked_add(bytes)?;
            match capacity
            {
                Some(cap) if next > cap => None,
                _ => Some(next),
            }
        }).map_err(|_| XGError::AllocationFailure { requested_bytes: bytes })?;
        let live = before + bytes;
        self.peak.fetch_max(live, Ordering::AcqRel);
        self.buffers.fetch_add(1, Ordering::AcqRel);
        self.staged.fetch_add(1, Ordering::AcqRel);
        trace!(label, bytes, live, "staged");
        Ok(())
    }

    fn release(&self, label: &'static str, bytes: usize)
    {
        let live = self.live.fetch_sub(bytes, Ordering::AcqRel) - bytes;
        self.buffers.fetch_sub(1, Ordering::AcqRel);
        trace!(label, bytes, live, "released");
    }

    /// Reserves `bytes` of device scratch.
    pub fn reserve(&self, label: &'static str, bytes: usize) -> Result<Reservation<'_>, XGError>
    {
        self.acquire(label, bytes)?;
        Ok(Reservation { manager: self, label, bytes })
    }

    /// Stages a copy of `host` on the device.
    pub fn copy_in<T: Copy>(&self, label: &'static str, host: &[T]) -> Result<DeviceArray<'_, T>, XGError>
    {
        let reservation = self.reserve(label, std::mem::size_of_val(host))?;
        let mut data = Vec::new();
        data.try_reserve_exact(host.len())?;
        data.extend_from_slice(host);
        Ok(DeviceArray { data, _reservation: reservation })
    }
}

///
/// Device bytes held for the lifetime of the guard.
///
#[derive(Debug)]
pub struct Reservation<'m>
{
    manager: &'m ResidencyManager,
    label: &'static str,
    bytes: usize,
}

impl Drop for Reservation<'_>
{
    fn drop(&mut self) {
        self.manager.release(self.label, self.bytes);
    }
}

///
/// An array resident on the device. Dropping it unstages the array.
///
#[derive(Debug)]
pub struct DeviceArray<'m, T>
{
    data: Vec<T>,
    _reservation: Reservation<'m>,
}

impl<T> Deref for DeviceArray<'_, T>
{
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}
