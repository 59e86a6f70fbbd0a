//! Raw declarations for the parts of libva and libva-drm we call.
//!
//! Nothing here is linked; `libva.rs` resolves the function pointers from the
//! shared objects at runtime.

#![allow(non_snake_case, non_camel_case_types)]

use std::ffi::c_void;
use std::os::raw::{c_int, c_uint};

// ── Opaque types ──

pub type VADisplay = *mut c_void;
pub type VAStatus = c_int;
pub type VAProfile = c_int;
pub type VAEntrypoint = c_int;
pub type VAConfigID = c_uint;
pub type VAContextID = c_uint;
pub type VASurfaceID = c_uint;
pub type VAProcFilterType = c_int;

// ── Constants ──

/// `VAConfigAttribRTFormat`
pub const VA_CONFIG_ATTRIB_RT_FORMAT: c_int = 0;
pub const VA_ATTRIB_NOT_SUPPORTED: c_uint = 0x8000_0000;
pub const VA_PROGRESSIVE: c_int = 0x1;
pub const VA_INVALID_ID: c_uint = 0xFFFF_FFFF;

/// Size of the filter list passed to `vaQueryVideoProcFilters`; larger than
/// `VAProcFilterCount` in every released libva.
pub const MAX_PROC_FILTERS: usize = 32;

// ── Structures ──

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct VAConfigAttrib {
    pub type_: c_int,
    pub value: c_uint,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default)]
pub struct VAProcFilterValueRange {
    pub min_value: f32,
    pub max_value: f32,
    pub default_value: f32,
    pub step: f32,
    pub va_reserved: [u32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default)]
pub struct VAProcFilterCap {
    pub range: VAProcFilterValueRange,
    pub va_reserved: [u32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default)]
pub struct VAProcFilterCapDeinterlacing {
    pub type_: c_int,
    pub va_reserved: [u32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default)]
pub struct VAProcFilterCapColorBalance {
    pub type_: c_int,
    pub range: VAProcFilterValueRange,
    pub va_reserved: [u32; 4],
}

// ── Function pointers ──

pub type VaGetDisplayDrmFn = unsafe extern "C" fn(fd: c_int) -> VADisplay;
pub type VaInitializeFn =
    unsafe extern "C" fn(dpy: VADisplay, major: *mut c_int, minor: *mut c_int) -> VAStatus;
pub type VaTerminateFn = unsafe extern "C" fn(dpy: VADisplay) -> VAStatus;
pub type VaMaxNumFn = unsafe extern "C" fn(dpy: VADisplay) -> c_int;
pub type VaQueryConfigProfilesFn =
    unsafe extern "C" fn(dpy: VADisplay, profiles: *mut VAProfile, num: *mut c_int) -> VAStatus;
pub type VaQueryConfigEntrypointsFn = unsafe extern "C" fn(
    dpy: VADisplay,
    profile: VAProfile,
    entrypoints: *mut VAEntrypoint,
    num: *mut c_int,
) -> VAStatus;
pub type VaGetConfigAttributesFn = unsafe extern "C" fn(
    dpy: VADisplay,
    profile: VAProfile,
    entrypoint: VAEntrypoint,
    attribs: *mut VAConfigAttrib,
    num: c_int,
) -> VAStatus;
pub type VaCreateConfigFn = unsafe extern "C" fn(
    dpy: VADisplay,
    profile: VAProfile,
    entrypoint: VAEntrypoint,
    attribs: *mut VAConfigAttrib,
    num: c_int,
    config: *mut VAConfigID,
) -> VAStatus;
pub type VaDestroyConfigFn = unsafe extern "C" fn(dpy: VADisplay, config: VAConfigID) -> VAStatus;
pub type VaCreateSurfacesFn = unsafe extern "C" fn(
    dpy: VADisplay,
    format: c_uint,
    width: c_uint,
    height: c_uint,
    surfaces: *mut VASurfaceID,
    num_surfaces: c_uint,
    attribs: *mut c_void,
    num_attribs: c_uint,
) -> VAStatus;
pub type VaDestroySurfacesFn =
    unsafe extern "C" fn(dpy: VADisplay, surfaces: *mut VASurfaceID, num: c_int) -> VAStatus;
pub type VaCreateContextFn = unsafe extern "C" fn(
    dpy: VADisplay,
    config: VAConfigID,
    width: c_int,
    height: c_int,
    flag: c_int,
    render_targets: *mut VASurfaceID,
    num_render_targets: c_int,
    context: *mut VAContextID,
) -> VAStatus;
pub type VaDestroyContextFn =
    unsafe extern "C" fn(dpy: VADisplay, context: VAContextID) -> VAStatus;
pub type VaQueryVideoProcFiltersFn = unsafe extern "C" fn(
    dpy: VADisplay,
    context: VAContextID,
    filters: *mut VAProcFilterType,
    num: *mut c_uint,
) -> VAStatus;
pub type VaQueryVideoProcFilterCapsFn = unsafe extern "C" fn(
    dpy: VADisplay,
    context: VAContextID,
    filter: VAProcFilterType,
    caps: *mut c_void,
    num: *mut c_uint,
) -> VAStatus;
