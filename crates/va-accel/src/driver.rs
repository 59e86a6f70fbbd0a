use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{AccelError, Result};
use crate::filter::{FilterType, ParamRange};
use crate::types::{ConfigId, ContextId, Entrypoint, Profile, RtFormat, Status, SurfaceId};

/// One capability entry as the driver reports it, before family semantics
/// are applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawFilterCap {
    /// Single-algorithm families (noise reduction, sharpening).
    Range(ParamRange),
    /// One deinterlacing algorithm.
    Deinterlacing(i32),
    /// One color balance attribute with its range.
    ColorBalance(i32, ParamRange),
}

/// The subset of the native acceleration API used by this crate.
///
/// Every call reports a [`Status`]; implementations must map exactly one
/// native value to `Ok` and surface every other value unchanged.
pub trait Driver: Send + Sync {
    /// Initialize the display connection. Returns the API version.
    fn initialize(&self) -> std::result::Result<(i32, i32), Status>;

    fn terminate(&self);

    fn query_config_profiles(&self) -> std::result::Result<Vec<Profile>, Status>;

    fn query_config_entrypoints(
        &self,
        profile: Profile,
    ) -> std::result::Result<Vec<Entrypoint>, Status>;

    /// Read the `RTFormat` config attribute for a profile/entry point pair.
    fn rt_formats(
        &self,
        profile: Profile,
        entrypoint: Entrypoint,
    ) -> std::result::Result<RtFormat, Status>;

    fn create_config(
        &self,
        profile: Profile,
        entrypoint: Entrypoint,
        rt_format: RtFormat,
    ) -> std::result::Result<ConfigId, Status>;

    fn destroy_config(&self, config: ConfigId) -> std::result::Result<(), Status>;

    fn create_surfaces(
        &self,
        format: RtFormat,
        width: u32,
        height: u32,
        count: usize,
    ) -> std::result::Result<Vec<SurfaceId>, Status>;

    fn destroy_surfaces(&self, surfaces: &[SurfaceId]) -> std::result::Result<(), Status>;

    fn create_context(
        &self,
        config: ConfigId,
        width: u32,
        height: u32,
        progressive: bool,
        render_targets: &[SurfaceId],
    ) -> std::result::Result<ContextId, Status>;

    fn destroy_context(&self, context: ContextId) -> std::result::Result<(), Status>;

    fn query_filters(&self, context: ContextId) -> std::result::Result<Vec<FilterType>, Status>;

    /// Query up to `max_entries` capability entries for one filter family.
    fn query_filter_caps(
        &self,
        context: ContextId,
        filter: FilterType,
        max_entries: usize,
    ) -> std::result::Result<Vec<RawFilterCap>, Status>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServiceState {
    Uninitialized,
    Ready { major: i32, minor: i32 },
    Unavailable(Status),
    Shutdown,
}

/// Process-wide owner of the driver connection.
///
/// Created once by the host and passed to the registry and every
/// accelerator context. Initialization is lazy and happens at most once;
/// [`shutdown`](Self::shutdown) terminates the connection and is final.
pub struct DriverService {
    driver: Arc<dyn Driver>,
    state: Mutex<ServiceState>,
}

impl DriverService {
    pub fn new(driver: Arc<dyn Driver>) -> Arc<Self> {
        Arc::new(DriverService {
            driver,
            state: Mutex::new(ServiceState::Uninitialized),
        })
    }

    /// Initialize the driver on first use.
    pub fn ensure_initialized(&self) -> Result<()> {
        let mut state = self.state.lock();
        match *state {
            ServiceState::Ready { .. } => Ok(()),
            ServiceState::Unavailable(_) | ServiceState::Shutdown => Err(AccelError::Unavailable),
            ServiceState::Uninitialized => match self.driver.initialize() {
                Ok((major, minor)) => {
                    info!(major, minor, "VA-API initialized");
                    *state = ServiceState::Ready { major, minor };
                    Ok(())
                }
                Err(status) => {
                    warn!(%status, "vaInitialize failed, hardware decode unavailable");
                    *state = ServiceState::Unavailable(status);
                    Err(AccelError::Unavailable)
                }
            },
        }
    }

    /// The live driver, or `Unavailable` if it was never initialized or has
    /// been shut down.
    pub fn driver(&self) -> Result<&dyn Driver> {
        match *self.state.lock() {
            ServiceState::Ready { .. } => Ok(&*self.driver),
            _ => Err(AccelError::Unavailable),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.state.lock(), ServiceState::Ready { .. })
    }

    pub fn version(&self) -> Option<(i32, i32)> {
        match *self.state.lock() {
            ServiceState::Ready { major, minor } => Some((major, minor)),
            _ => None,
        }
    }

    /// Terminate the driver connection. Later calls are no-ops.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if let ServiceState::Ready { .. } = *state {
            self.driver.terminate();
            debug!("VA-API terminated");
        }
        *state = ServiceState::Shutdown;
    }
}

impl std::fmt::Debug for DriverService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverService")
            .field("state", &*self.state.lock())
            .finish()
    }
}
