//! Driver-level identifiers and enumerations.
//!
//! Profiles, entry points and filter types are kept as transparent newtypes
//! over the native integer values rather than closed enums: drivers advertise
//! plenty of values this crate never negotiates (HEVC, VP9, JPEG...) and the
//! registry still has to cache them.

use std::fmt;

use serde::Serialize;

/// Native status code returned by every driver call. Zero is success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

impl Status {
    pub const SUCCESS: Status = Status(0x00);
    pub const OPERATION_FAILED: Status = Status(0x01);
    pub const ALLOCATION_FAILED: Status = Status(0x02);
    pub const INVALID_DISPLAY: Status = Status(0x03);
    pub const INVALID_CONFIG: Status = Status(0x04);
    pub const INVALID_CONTEXT: Status = Status(0x05);
    pub const INVALID_SURFACE: Status = Status(0x06);
    pub const UNSUPPORTED_PROFILE: Status = Status(0x0c);
    pub const UNSUPPORTED_ENTRYPOINT: Status = Status(0x0d);
    pub const UNSUPPORTED_RT_FORMAT: Status = Status(0x0e);
    pub const SURFACE_BUSY: Status = Status(0x10);
    pub const UNKNOWN: Status = Status(-1);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Convert a raw status into a `Result`, treating only zero as success.
    pub fn check(raw: i32) -> Result<(), Status> {
        let status = Status(raw);
        if status.is_success() {
            Ok(())
        } else {
            Err(status)
        }
    }

    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::SUCCESS => "success",
            Self::OPERATION_FAILED => "operation failed",
            Self::ALLOCATION_FAILED => "resource allocation failed",
            Self::INVALID_DISPLAY => "invalid display",
            Self::INVALID_CONFIG => "invalid config",
            Self::INVALID_CONTEXT => "invalid context",
            Self::INVALID_SURFACE => "invalid surface",
            Self::UNSUPPORTED_PROFILE => "unsupported profile",
            Self::UNSUPPORTED_ENTRYPOINT => "unsupported entrypoint",
            Self::UNSUPPORTED_RT_FORMAT => "unsupported RT format",
            Self::SURFACE_BUSY => "surface busy",
            Self::UNKNOWN => "unknown error",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "VAStatus {:#x} ({name})", self.0),
            None => write!(f, "VAStatus {:#x}", self.0),
        }
    }
}

/// Accelerator profile (`VAProfile`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Profile(pub i32);

impl Profile {
    pub const NONE: Profile = Profile(-1);
    pub const MPEG2_SIMPLE: Profile = Profile(0);
    pub const MPEG2_MAIN: Profile = Profile(1);
    pub const MPEG4_SIMPLE: Profile = Profile(2);
    pub const MPEG4_ADVANCED_SIMPLE: Profile = Profile(3);
    pub const MPEG4_MAIN: Profile = Profile(4);
    pub const H264_BASELINE: Profile = Profile(5);
    pub const H264_MAIN: Profile = Profile(6);
    pub const H264_HIGH: Profile = Profile(7);
    pub const VC1_SIMPLE: Profile = Profile(8);
    pub const VC1_MAIN: Profile = Profile(9);
    pub const VC1_ADVANCED: Profile = Profile(10);
    pub const H264_CONSTRAINED_BASELINE: Profile = Profile(13);

    pub fn name(self) -> &'static str {
        match self {
            Self::NONE => "None",
            Self::MPEG2_SIMPLE => "MPEG2Simple",
            Self::MPEG2_MAIN => "MPEG2Main",
            Self::MPEG4_SIMPLE => "MPEG4Simple",
            Self::MPEG4_ADVANCED_SIMPLE => "MPEG4AdvancedSimple",
            Self::MPEG4_MAIN => "MPEG4Main",
            Self::H264_BASELINE => "H264Baseline",
            Self::H264_MAIN => "H264Main",
            Self::H264_HIGH => "H264High",
            Self::VC1_SIMPLE => "VC1Simple",
            Self::VC1_MAIN => "VC1Main",
            Self::VC1_ADVANCED => "VC1Advanced",
            Self::H264_CONSTRAINED_BASELINE => "H264ConstrainedBaseline",
            _ => "Other",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

/// Accelerator entry point (`VAEntrypoint`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Entrypoint(pub i32);

impl Entrypoint {
    /// Slice-level (variable length) decode.
    pub const VLD: Entrypoint = Entrypoint(1);
    pub const IZZ: Entrypoint = Entrypoint(2);
    pub const IDCT: Entrypoint = Entrypoint(3);
    pub const MOCOMP: Entrypoint = Entrypoint(4);
    pub const DEBLOCKING: Entrypoint = Entrypoint(5);
    pub const ENC_SLICE: Entrypoint = Entrypoint(6);
    pub const ENC_PICTURE: Entrypoint = Entrypoint(7);
    pub const VIDEO_PROC: Entrypoint = Entrypoint(10);
}

/// Render-target format bit mask (`VA_RT_FORMAT_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct RtFormat(pub u32);

impl RtFormat {
    pub const YUV420: RtFormat = RtFormat(0x0000_0001);
    pub const YUV422: RtFormat = RtFormat(0x0000_0002);
    pub const YUV444: RtFormat = RtFormat(0x0000_0004);

    pub fn contains(self, other: RtFormat) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn union(self, other: RtFormat) -> RtFormat {
        RtFormat(self.0 | other.0)
    }
}

impl fmt::Display for RtFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::YUV420 => f.write_str("YUV420"),
            Self::YUV422 => f.write_str("YUV422"),
            Self::YUV444 => f.write_str("YUV444"),
            other => write!(f, "{:#010x}", other.0),
        }
    }
}

/// Hardware surface identifier (`VASurfaceID`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SurfaceId(pub u32);

/// Hardware configuration identifier (`VAConfigID`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigId(pub u32);

/// Hardware execution context identifier (`VAContextID`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u32);
