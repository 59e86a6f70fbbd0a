//! Error type for negotiation and surface management (thiserror-based).

use thiserror::Error;

use crate::codec::{CodecId, DecoderProfile};
use crate::types::{Profile, RtFormat, Status};

#[derive(Error, Debug)]
pub enum AccelError {
    #[error("acceleration driver unavailable")]
    Unavailable,

    #[error("failed to load libva: {0}")]
    Library(String),

    #[error("cannot open DRM device {path}: {source}")]
    Device {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported codec for hardware decode: {0:?}")]
    UnsupportedCodec(CodecId),

    #[error("no accelerator profile for {codec:?} decoder profile {profile:?}")]
    UnsupportedProfile {
        codec: CodecId,
        profile: DecoderProfile,
    },

    #[error("profile {profile} exposes no usable RT format (mask {mask})")]
    UnsupportedFormat { profile: Profile, mask: RtFormat },

    #[error("{call} failed: {status}")]
    Driver { call: &'static str, status: Status },

    #[error("could not allocate {count} surfaces at {width}x{height}")]
    SurfaceAllocation { count: usize, width: u32, height: u32 },

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("surface pool is not configured")]
    PoolNotConfigured,

    #[error("accelerator context is not bound")]
    NotBound,

    #[error("released surface lease is not outstanding")]
    InvalidRelease,
}

impl AccelError {
    /// Wrap a failed driver status with the name of the call that produced it.
    pub fn driver(call: &'static str) -> impl FnOnce(Status) -> AccelError {
        move |status| AccelError::Driver { call, status }
    }

    /// The native status behind this error, if it came from the driver.
    pub fn status(&self) -> Option<Status> {
        match self {
            AccelError::Driver { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AccelError>;
