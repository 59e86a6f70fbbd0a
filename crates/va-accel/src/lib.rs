//! Hardware video-decode acceleration over VA-API.
//!
//! A [`CapabilityRegistry`] negotiates what the driver supports once at
//! startup; each decode session then binds an [`AccelContext`], which hands
//! out pooled hardware surfaces to the decoder.

pub mod codec;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod filter;
pub mod registry;
pub mod surface_pool;
pub mod types;

#[cfg(target_os = "linux")]
mod ffi;
#[cfg(target_os = "linux")]
pub mod libva;

#[cfg(test)]
mod fake;

pub use codec::{CodecDescriptor, CodecId, DecoderProfile, ProfileCandidate};
pub use config::AccelConfig;
pub use context::{AccelContext, HwContext};
pub use driver::{Driver, DriverService, RawFilterCap};
pub use error::{AccelError, Result};
pub use filter::{FilterCapability, FilterDescriptor, FilterType, ParamRange};
pub use registry::CapabilityRegistry;
pub use surface_pool::{Geometry, PoolStats, SurfaceHandle, SurfaceLease, SurfacePool};
pub use types::{ConfigId, ContextId, Entrypoint, Profile, RtFormat, Status, SurfaceId};

#[cfg(target_os = "linux")]
pub use libva::LibVaDriver;
