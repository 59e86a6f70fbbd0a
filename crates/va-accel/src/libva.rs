//! [`Driver`] backed by the system libva, loaded at runtime.

use std::ffi::c_void;
use std::fs::File;
use std::os::fd::AsRawFd;
use std::os::raw::{c_int, c_uint};
use std::path::Path;

use libloading::Library;
use tracing::{debug, info, warn};

use crate::driver::{Driver, RawFilterCap};
use crate::error::{AccelError, Result};
use crate::ffi;
use crate::filter::{FilterType, ParamRange};
use crate::types::{ConfigId, ContextId, Entrypoint, Profile, RtFormat, Status, SurfaceId};

const LIBVA: &str = "libva.so.2";
const LIBVA_DRM: &str = "libva-drm.so.2";

fn symbol<T: Copy>(lib: &Library, name: &[u8]) -> Result<T> {
    // SAFETY: every requested symbol is declared in ffi.rs with the
    // signature libva exports it with.
    unsafe { lib.get::<T>(name) }.map(|sym| *sym).map_err(|e| {
        let name = String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name));
        AccelError::Library(format!("{name}: {e}"))
    })
}

fn open_library(name: &str) -> Result<Library> {
    // SAFETY: libva has no initialization routines with preconditions.
    unsafe { Library::new(name) }.map_err(|e| AccelError::Library(format!("{name}: {e}")))
}

struct LibVa {
    initialize: ffi::VaInitializeFn,
    terminate: ffi::VaTerminateFn,
    max_num_profiles: ffi::VaMaxNumFn,
    max_num_entrypoints: ffi::VaMaxNumFn,
    query_config_profiles: ffi::VaQueryConfigProfilesFn,
    query_config_entrypoints: ffi::VaQueryConfigEntrypointsFn,
    get_config_attributes: ffi::VaGetConfigAttributesFn,
    create_config: ffi::VaCreateConfigFn,
    destroy_config: ffi::VaDestroyConfigFn,
    create_surfaces: ffi::VaCreateSurfacesFn,
    destroy_surfaces: ffi::VaDestroySurfacesFn,
    create_context: ffi::VaCreateContextFn,
    destroy_context: ffi::VaDestroyContextFn,
    query_video_proc_filters: ffi::VaQueryVideoProcFiltersFn,
    query_video_proc_filter_caps: ffi::VaQueryVideoProcFilterCapsFn,
    // Keeps the function pointers above valid.
    _lib: Library,
}

impl LibVa {
    fn load() -> Result<Self> {
        let lib = open_library(LIBVA)?;
        Ok(LibVa {
            initialize: symbol(&lib, b"vaInitialize\0")?,
            terminate: symbol(&lib, b"vaTerminate\0")?,
            max_num_profiles: symbol(&lib, b"vaMaxNumProfiles\0")?,
            max_num_entrypoints: symbol(&lib, b"vaMaxNumEntrypoints\0")?,
            query_config_profiles: symbol(&lib, b"vaQueryConfigProfiles\0")?,
            query_config_entrypoints: symbol(&lib, b"vaQueryConfigEntrypoints\0")?,
            get_config_attributes: symbol(&lib, b"vaGetConfigAttributes\0")?,
            create_config: symbol(&lib, b"vaCreateConfig\0")?,
            destroy_config: symbol(&lib, b"vaDestroyConfig\0")?,
            create_surfaces: symbol(&lib, b"vaCreateSurfaces\0")?,
            destroy_surfaces: symbol(&lib, b"vaDestroySurfaces\0")?,
            create_context: symbol(&lib, b"vaCreateContext\0")?,
            destroy_context: symbol(&lib, b"vaDestroyContext\0")?,
            query_video_proc_filters: symbol(&lib, b"vaQueryVideoProcFilters\0")?,
            query_video_proc_filter_caps: symbol(&lib, b"vaQueryVideoProcFilterCaps\0")?,
            _lib: lib,
        })
    }
}

/// Driver talking to a real VA display.
pub struct LibVaDriver {
    va: LibVa,
    display: ffi::VADisplay,
    // The DRM display borrows the node's descriptor, so the file and the
    // library that created the display must outlive it.
    _drm: Option<(File, Library)>,
}

// SAFETY: libva serializes access to a display internally; the display
// pointer is only ever passed back to libva.
unsafe impl Send for LibVaDriver {}
unsafe impl Sync for LibVaDriver {}

impl LibVaDriver {
    /// Open a headless display on a DRM render node.
    pub fn open_drm(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let va = LibVa::load()?;
        let drm = open_library(LIBVA_DRM)?;
        let get_display: ffi::VaGetDisplayDrmFn = symbol(&drm, b"vaGetDisplayDRM\0")?;

        let file = File::options()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| AccelError::Device {
                path: path.to_path_buf(),
                source,
            })?;

        let display = unsafe { get_display(file.as_raw_fd()) };
        if display.is_null() {
            warn!(path = %path.display(), "vaGetDisplayDRM returned no display");
            return Err(AccelError::Unavailable);
        }
        info!(path = %path.display(), "opened VA display on DRM node");

        Ok(LibVaDriver {
            va,
            display,
            _drm: Some((file, drm)),
        })
    }

    /// Wrap a display created by the host's windowing layer.
    ///
    /// # Safety
    ///
    /// `display` must be a valid `VADisplay` that outlives the returned
    /// driver.
    pub unsafe fn from_display(display: *mut c_void) -> Result<Self> {
        if display.is_null() {
            return Err(AccelError::InvalidArgument("null VA display"));
        }
        let va = LibVa::load()?;
        debug!("using host-provided VA display");
        Ok(LibVaDriver {
            va,
            display,
            _drm: None,
        })
    }

    fn filter_caps<T: Copy + Default>(
        &self,
        context: ContextId,
        filter: FilterType,
        max_entries: usize,
    ) -> std::result::Result<Vec<T>, Status> {
        let mut caps = vec![T::default(); max_entries];
        let mut count = max_entries as c_uint;
        Status::check(unsafe {
            (self.va.query_video_proc_filter_caps)(
                self.display,
                context.0,
                filter.0,
                caps.as_mut_ptr() as *mut c_void,
                &mut count,
            )
        })?;
        caps.truncate((count as usize).min(max_entries));
        Ok(caps)
    }
}

impl From<ffi::VAProcFilterValueRange> for ParamRange {
    fn from(range: ffi::VAProcFilterValueRange) -> Self {
        ParamRange {
            min: range.min_value,
            max: range.max_value,
            default: range.default_value,
            step: range.step,
        }
    }
}

impl Driver for LibVaDriver {
    fn initialize(&self) -> std::result::Result<(i32, i32), Status> {
        let (mut major, mut minor): (c_int, c_int) = (0, 0);
        Status::check(unsafe { (self.va.initialize)(self.display, &mut major, &mut minor) })?;
        Ok((major, minor))
    }

    fn terminate(&self) {
        if let Err(status) = Status::check(unsafe { (self.va.terminate)(self.display) }) {
            warn!(%status, "vaTerminate failed");
        }
    }

    fn query_config_profiles(&self) -> std::result::Result<Vec<Profile>, Status> {
        let max = unsafe { (self.va.max_num_profiles)(self.display) }.max(0);
        let mut raw: Vec<ffi::VAProfile> = vec![0; max as usize];
        let mut count: c_int = 0;
        Status::check(unsafe {
            (self.va.query_config_profiles)(self.display, raw.as_mut_ptr(), &mut count)
        })?;
        raw.truncate(count.clamp(0, max) as usize);
        Ok(raw.into_iter().map(Profile).collect())
    }

    fn query_config_entrypoints(
        &self,
        profile: Profile,
    ) -> std::result::Result<Vec<Entrypoint>, Status> {
        let max = unsafe { (self.va.max_num_entrypoints)(self.display) }.max(0);
        let mut raw: Vec<ffi::VAEntrypoint> = vec![0; max as usize];
        let mut count: c_int = 0;
        Status::check(unsafe {
            (self.va.query_config_entrypoints)(self.display, profile.0, raw.as_mut_ptr(), &mut count)
        })?;
        raw.truncate(count.clamp(0, max) as usize);
        Ok(raw.into_iter().map(Entrypoint).collect())
    }

    fn rt_formats(
        &self,
        profile: Profile,
        entrypoint: Entrypoint,
    ) -> std::result::Result<RtFormat, Status> {
        let mut attrib = ffi::VAConfigAttrib {
            type_: ffi::VA_CONFIG_ATTRIB_RT_FORMAT,
            value: 0,
        };
        Status::check(unsafe {
            (self.va.get_config_attributes)(self.display, profile.0, entrypoint.0, &mut attrib, 1)
        })?;
        if attrib.value == ffi::VA_ATTRIB_NOT_SUPPORTED {
            return Ok(RtFormat::default());
        }
        Ok(RtFormat(attrib.value))
    }

    fn create_config(
        &self,
        profile: Profile,
        entrypoint: Entrypoint,
        rt_format: RtFormat,
    ) -> std::result::Result<ConfigId, Status> {
        let mut attrib = ffi::VAConfigAttrib {
            type_: ffi::VA_CONFIG_ATTRIB_RT_FORMAT,
            value: rt_format.0,
        };
        let (attribs, num) = if rt_format.0 == 0 {
            (std::ptr::null_mut(), 0)
        } else {
            (&mut attrib as *mut ffi::VAConfigAttrib, 1)
        };
        let mut config = ffi::VA_INVALID_ID;
        Status::check(unsafe {
            (self.va.create_config)(self.display, profile.0, entrypoint.0, attribs, num, &mut config)
        })?;
        Ok(ConfigId(config))
    }

    fn destroy_config(&self, config: ConfigId) -> std::result::Result<(), Status> {
        Status::check(unsafe { (self.va.destroy_config)(self.display, config.0) })
    }

    fn create_surfaces(
        &self,
        format: RtFormat,
        width: u32,
        height: u32,
        count: usize,
    ) -> std::result::Result<Vec<SurfaceId>, Status> {
        let mut ids: Vec<ffi::VASurfaceID> = vec![ffi::VA_INVALID_ID; count];
        Status::check(unsafe {
            (self.va.create_surfaces)(
                self.display,
                format.0,
                width,
                height,
                ids.as_mut_ptr(),
                count as c_uint,
                std::ptr::null_mut(),
                0,
            )
        })?;
        Ok(ids.into_iter().map(SurfaceId).collect())
    }

    fn destroy_surfaces(&self, surfaces: &[SurfaceId]) -> std::result::Result<(), Status> {
        let mut ids: Vec<ffi::VASurfaceID> = surfaces.iter().map(|s| s.0).collect();
        Status::check(unsafe {
            (self.va.destroy_surfaces)(self.display, ids.as_mut_ptr(), ids.len() as c_int)
        })
    }

    fn create_context(
        &self,
        config: ConfigId,
        width: u32,
        height: u32,
        progressive: bool,
        render_targets: &[SurfaceId],
    ) -> std::result::Result<ContextId, Status> {
        let mut targets: Vec<ffi::VASurfaceID> = render_targets.iter().map(|s| s.0).collect();
        let targets_ptr = if targets.is_empty() {
            std::ptr::null_mut()
        } else {
            targets.as_mut_ptr()
        };
        let flag = if progressive { ffi::VA_PROGRESSIVE } else { 0 };
        let mut context = ffi::VA_INVALID_ID;
        Status::check(unsafe {
            (self.va.create_context)(
                self.display,
                config.0,
                width as c_int,
                height as c_int,
                flag,
                targets_ptr,
                targets.len() as c_int,
                &mut context,
            )
        })?;
        Ok(ContextId(context))
    }

    fn destroy_context(&self, context: ContextId) -> std::result::Result<(), Status> {
        Status::check(unsafe { (self.va.destroy_context)(self.display, context.0) })
    }

    fn query_filters(&self, context: ContextId) -> std::result::Result<Vec<FilterType>, Status> {
        let mut raw: Vec<ffi::VAProcFilterType> = vec![0; ffi::MAX_PROC_FILTERS];
        let mut count = ffi::MAX_PROC_FILTERS as c_uint;
        Status::check(unsafe {
            (self.va.query_video_proc_filters)(self.display, context.0, raw.as_mut_ptr(), &mut count)
        })?;
        raw.truncate((count as usize).min(ffi::MAX_PROC_FILTERS));
        Ok(raw.into_iter().map(FilterType).collect())
    }

    fn query_filter_caps(
        &self,
        context: ContextId,
        filter: FilterType,
        max_entries: usize,
    ) -> std::result::Result<Vec<RawFilterCap>, Status> {
        let caps = match filter {
            FilterType::NOISE_REDUCTION | FilterType::SHARPENING => self
                .filter_caps::<ffi::VAProcFilterCap>(context, filter, max_entries)?
                .into_iter()
                .map(|cap| RawFilterCap::Range(cap.range.into()))
                .collect(),
            FilterType::DEINTERLACING => self
                .filter_caps::<ffi::VAProcFilterCapDeinterlacing>(context, filter, max_entries)?
                .into_iter()
                .map(|cap| RawFilterCap::Deinterlacing(cap.type_))
                .collect(),
            FilterType::COLOR_BALANCE => self
                .filter_caps::<ffi::VAProcFilterCapColorBalance>(context, filter, max_entries)?
                .into_iter()
                .map(|cap| RawFilterCap::ColorBalance(cap.type_, cap.range.into()))
                .collect(),
            _ => Vec::new(),
        };
        Ok(caps)
    }
}
