use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use crate::driver::DriverService;
use crate::error::{AccelError, Result};
use crate::types::{RtFormat, SurfaceId};

/// Size and format shared by every surface of one pool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub format: RtFormat,
}

/// Decoder-visible view of an acquired surface.
///
/// Hardware surfaces have no CPU address; the decoder library reads the
/// surface id from plane slots 0 and 3 and ignores the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceHandle {
    pub id: SurfaceId,
    pub geometry: Geometry,
}

impl SurfaceHandle {
    pub fn planes(&self) -> [usize; 4] {
        let id = self.id.0 as usize;
        [id, 0, 0, id]
    }
}

/// Lifecycle of one arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotState {
    /// No surface; the index may be reused.
    Vacant,
    /// In the active set and available to `acquire`.
    Free,
    /// Lent out.
    InUse,
    /// Lent out, but dropped from the active set by a clear.
    InUseOrphaned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Keep,
    Destroy,
    Invalid,
}

impl SlotState {
    pub(crate) fn on_release(self) -> (SlotState, Action) {
        match self {
            SlotState::InUse => (SlotState::Free, Action::Keep),
            SlotState::InUseOrphaned => (SlotState::Vacant, Action::Destroy),
            SlotState::Free | SlotState::Vacant => (self, Action::Invalid),
        }
    }

    pub(crate) fn on_clear(self) -> (SlotState, Action) {
        match self {
            SlotState::Free => (SlotState::Vacant, Action::Destroy),
            SlotState::InUse => (SlotState::InUseOrphaned, Action::Keep),
            SlotState::InUseOrphaned | SlotState::Vacant => (self, Action::Keep),
        }
    }
}

#[derive(Debug)]
struct Slot {
    surface: SurfaceId,
    state: SlotState,
    /// Stamp of the most recent acquisition.
    recency: u64,
    /// Bumped whenever the index is reused for a new surface.
    generation: u32,
}

#[derive(Debug, Default)]
struct PoolState {
    slots: Vec<Slot>,
    /// Slot indices of the current configuration, in allocation order.
    active: Vec<usize>,
    geometry: Option<Geometry>,
    counter: u64,
    exhaustions: u64,
}

impl PoolState {
    fn vacant_slot(&mut self, surface: SurfaceId) -> usize {
        if let Some(idx) = self.slots.iter().position(|s| s.state == SlotState::Vacant) {
            let slot = &mut self.slots[idx];
            slot.surface = surface;
            slot.state = SlotState::Free;
            slot.recency = 0;
            slot.generation = slot.generation.wrapping_add(1);
            idx
        } else {
            self.slots.push(Slot {
                surface,
                state: SlotState::Free,
                recency: 0,
                generation: 0,
            });
            self.slots.len() - 1
        }
    }
}

struct PoolShared {
    service: Arc<DriverService>,
    state: Mutex<PoolState>,
}

impl PoolShared {
    fn destroy(&self, surfaces: &[SurfaceId]) {
        if surfaces.is_empty() {
            return;
        }
        match self.service.driver() {
            Ok(driver) => {
                if let Err(status) = driver.destroy_surfaces(surfaces) {
                    warn!(%status, count = surfaces.len(), "vaDestroySurfaces failed");
                } else {
                    trace!(?surfaces, "destroyed surfaces");
                }
            }
            Err(_) => debug!(
                count = surfaces.len(),
                "driver already shut down, surfaces went with it"
            ),
        }
    }

    fn release(&self, slot: usize, generation: u32, ticket: u64) -> Result<()> {
        let doomed = {
            let mut state = self.state.lock();
            let Some(entry) = state.slots.get_mut(slot) else {
                error!(slot, "release of unknown surface slot");
                return Err(AccelError::InvalidRelease);
            };
            if entry.generation != generation {
                error!(slot, surface = entry.surface.0, "release of a stale surface lease");
                return Err(AccelError::InvalidRelease);
            }
            // Tickets are unique per acquisition, so a mismatch under the same
            // generation means the slot was force-reused after this lease was
            // issued, whatever the newer owner has done with it since.
            if entry.recency != ticket {
                warn!(
                    surface = entry.surface.0,
                    "lease was superseded by forced reuse, ignoring release"
                );
                return Ok(());
            }

            let (next, action) = entry.state.on_release();
            match action {
                Action::Keep => {
                    entry.state = next;
                    trace!(surface = entry.surface.0, "surface returned to pool");
                    return Ok(());
                }
                Action::Destroy => {
                    entry.state = next;
                    entry.surface
                }
                Action::Invalid => {
                    error!(surface = entry.surface.0, state = ?entry.state, "surface released twice");
                    return Err(AccelError::InvalidRelease);
                }
            }
        };

        debug!(surface = doomed.0, "destroying orphaned surface on release");
        self.destroy(&[doomed]);
        Ok(())
    }
}

impl Drop for PoolShared {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let remaining: Vec<SurfaceId> = state
            .slots
            .iter()
            .filter(|s| s.state != SlotState::Vacant)
            .map(|s| s.surface)
            .collect();
        if !remaining.is_empty() {
            debug!(count = remaining.len(), "destroying surfaces with the last pool handle");
            self.destroy(&remaining);
        }
    }
}

/// Ownership token for one acquired surface.
///
/// The holder must hand it back through [`SurfaceLease::release`] (or
/// [`SurfacePool::release`]) once the decoder and renderer are done with the
/// surface; this may happen on any thread. Dropping a lease without
/// releasing it keeps the surface lent out until the pool itself goes away.
#[must_use = "a surface lease must be released back to its pool"]
pub struct SurfaceLease {
    pool: Arc<PoolShared>,
    slot: usize,
    generation: u32,
    ticket: u64,
    handle: SurfaceHandle,
}

impl SurfaceLease {
    pub fn handle(&self) -> SurfaceHandle {
        self.handle
    }

    pub fn id(&self) -> SurfaceId {
        self.handle.id
    }

    pub fn release(self) -> Result<()> {
        self.pool.release(self.slot, self.generation, self.ticket)
    }
}

impl std::fmt::Debug for SurfaceLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceLease")
            .field("slot", &self.slot)
            .field("ticket", &self.ticket)
            .field("handle", &self.handle)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Surfaces in the current configuration.
    pub capacity: usize,
    /// Surfaces of the current configuration that are lent out.
    pub in_use: usize,
    /// Surfaces from earlier configurations still awaiting release.
    pub orphaned: usize,
    /// Acquisitions that had to reuse a surface still lent out.
    pub exhaustions: u64,
}

/// Fixed set of hardware surfaces recycled across decoded frames.
///
/// Cloning is cheap and yields another handle to the same pool, so render
/// threads can hold one for releasing.
#[derive(Clone)]
pub struct SurfacePool {
    inner: Arc<PoolShared>,
}

impl SurfacePool {
    pub fn new(service: Arc<DriverService>) -> Self {
        SurfacePool {
            inner: Arc::new(PoolShared {
                service,
                state: Mutex::new(PoolState::default()),
            }),
        }
    }

    /// Allocate `count` surfaces of the given geometry, replacing the current
    /// set. A no-op when nothing changed.
    pub fn configure(&self, count: usize, width: u32, height: u32, format: RtFormat) -> Result<()> {
        if count == 0 {
            return Err(AccelError::InvalidArgument("surface count must be non-zero"));
        }
        let geometry = Geometry {
            width,
            height,
            format,
        };
        {
            let state = self.inner.state.lock();
            if state.geometry == Some(geometry) && state.active.len() == count {
                trace!(count, width, height, %format, "surface pool unchanged");
                return Ok(());
            }
        }

        self.clear();

        let driver = self.inner.service.driver()?;
        let ids = driver
            .create_surfaces(format, width, height, count)
            .map_err(AccelError::driver("vaCreateSurfaces"))?;
        if ids.len() != count {
            warn!(requested = count, got = ids.len(), "driver returned a short surface list");
            self.inner.destroy(&ids);
            return Err(AccelError::SurfaceAllocation {
                count,
                width,
                height,
            });
        }

        let mut state = self.inner.state.lock();
        for id in ids {
            let idx = state.vacant_slot(id);
            state.active.push(idx);
        }
        state.geometry = Some(geometry);
        debug!(count, width, height, %format, "surface pool configured");
        Ok(())
    }

    /// Hand out a surface for the next decoded frame.
    ///
    /// Picks the free surface that has been idle longest. When every surface
    /// is lent out, the least recently acquired one is reused anyway; that
    /// only happens if the pool is undersized for the stream and is counted
    /// in [`PoolStats::exhaustions`].
    pub fn acquire(&self) -> Result<SurfaceLease> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        if state.active.is_empty() {
            return Err(AccelError::PoolNotConfigured);
        }
        let geometry = state.geometry.ok_or(AccelError::PoolNotConfigured)?;

        let slots = &state.slots;
        let free = state
            .active
            .iter()
            .copied()
            .filter(|&i| slots[i].state == SlotState::Free)
            .min_by_key(|&i| slots[i].recency);
        let idx = match free {
            Some(idx) => idx,
            None => {
                let idx = state
                    .active
                    .iter()
                    .copied()
                    .min_by_key(|&i| slots[i].recency)
                    .ok_or(AccelError::PoolNotConfigured)?;
                state.exhaustions += 1;
                warn!(
                    surface = slots[idx].surface.0,
                    pool_size = state.active.len(),
                    "surface pool exhausted, reusing least recently acquired surface"
                );
                idx
            }
        };

        state.counter += 1;
        let ticket = state.counter;
        let slot = &mut state.slots[idx];
        slot.state = SlotState::InUse;
        slot.recency = ticket;
        trace!(surface = slot.surface.0, ticket, "surface acquired");

        Ok(SurfaceLease {
            pool: Arc::clone(&self.inner),
            slot: idx,
            generation: slot.generation,
            ticket,
            handle: SurfaceHandle {
                id: slot.surface,
                geometry,
            },
        })
    }

    /// Return a surface obtained from this pool.
    pub fn release(&self, lease: SurfaceLease) -> Result<()> {
        if !Arc::ptr_eq(&self.inner, &lease.pool) {
            error!(surface = lease.id().0, "surface released into a foreign pool");
            return Err(AccelError::InvalidRelease);
        }
        lease.release()
    }

    /// Drop the current configuration. Surfaces still lent out are orphaned
    /// and destroyed when released; the rest are destroyed now.
    pub fn clear(&self) {
        let doomed: Vec<SurfaceId> = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let mut doomed = Vec::new();
            let mut orphaned = 0;
            for idx in state.active.drain(..) {
                let slot = &mut state.slots[idx];
                let (next, action) = slot.state.on_clear();
                slot.state = next;
                match action {
                    Action::Destroy => doomed.push(slot.surface),
                    _ if next == SlotState::InUseOrphaned => orphaned += 1,
                    _ => {}
                }
            }
            state.geometry = None;
            if orphaned > 0 {
                debug!(orphaned, "surfaces still in use, deferring destruction");
            }
            doomed
        };
        self.inner.destroy(&doomed);
    }

    /// Surface ids of the current configuration, the render targets of the
    /// execution context.
    pub fn ids(&self) -> Vec<SurfaceId> {
        let state = self.inner.state.lock();
        state.active.iter().map(|&i| state.slots[i].surface).collect()
    }

    pub fn geometry(&self) -> Option<Geometry> {
        self.inner.state.lock().geometry
    }

    pub fn format(&self) -> Option<RtFormat> {
        self.geometry().map(|g| g.format)
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        let in_use = state
            .active
            .iter()
            .filter(|&&i| state.slots[i].state == SlotState::InUse)
            .count();
        let orphaned = state
            .slots
            .iter()
            .filter(|s| s.state == SlotState::InUseOrphaned)
            .count();
        PoolStats {
            capacity: state.active.len(),
            in_use,
            orphaned,
            exhaustions: state.exhaustions,
        }
    }
}

impl std::fmt::Debug for SurfacePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfacePool")
            .field("geometry", &self.geometry())
            .field("stats", &self.stats())
            .finish()
    }
}
