use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::codec::{CodecId, DecoderProfile};
use crate::config::AccelConfig;
use crate::driver::Driver;
use crate::error::{AccelError, Result};
use crate::registry::CapabilityRegistry;
use crate::surface_pool::{SurfaceLease, SurfacePool};
use crate::types::{ConfigId, ContextId, Entrypoint, Profile, RtFormat};

/// Native handles the decoder library needs to submit work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwContext {
    pub config: ConfigId,
    pub context: ContextId,
}

/// Hardware decode state for one decode session.
///
/// Owns a hardware config, an execution context and the surface pool the
/// context renders into. Dropping it releases all three; surfaces still
/// lent out survive until their leases are released.
pub struct AccelContext {
    registry: Arc<CapabilityRegistry>,
    config: AccelConfig,
    pool: SurfacePool,
    hw_config: Option<(Profile, ConfigId)>,
    hw_context: Option<ContextId>,
    format: Option<RtFormat>,
}

impl AccelContext {
    pub fn new(registry: Arc<CapabilityRegistry>, config: AccelConfig) -> Self {
        let pool = SurfacePool::new(Arc::clone(registry.service()));
        AccelContext {
            registry,
            config,
            pool,
            hw_config: None,
            hw_context: None,
            format: None,
        }
    }

    /// Set up hardware decode for a stream.
    ///
    /// Any previous execution context is destroyed first. Unsupported
    /// codecs and profiles are reported as errors the caller is expected to
    /// answer with software decode; the config and surfaces of an earlier
    /// bind are left alone in that case. Once the driver is queried, a
    /// failure leaves no config, context or pooled surfaces behind.
    pub fn bind(
        &mut self,
        codec: CodecId,
        decoder_profile: DecoderProfile,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.destroy_context();

        let desc = self
            .registry
            .codec_descriptor(codec)
            .ok_or(AccelError::UnsupportedCodec(codec))?;
        let profile = desc
            .profile(decoder_profile)
            .ok_or(AccelError::UnsupportedProfile {
                codec,
                profile: decoder_profile,
            })?;
        let surfaces = desc
            .surfaces()
            .checked_add(self.config.surface_headroom)
            .ok_or(AccelError::InvalidArgument("surface headroom too large"))?;
        if width == 0 || height == 0 {
            return Err(AccelError::InvalidArgument("frame dimensions must be non-zero"));
        }

        let service = Arc::clone(self.registry.service());
        let driver = service.driver()?;
        match self.bind_profile(driver, profile, surfaces, width, height) {
            Ok(()) => {
                info!(
                    codec = codec.name(),
                    %profile,
                    width,
                    height,
                    surfaces,
                    format = ?self.format,
                    "hardware decode bound"
                );
                Ok(())
            }
            Err(err) => {
                warn!(codec = codec.name(), %profile, error = %err, "hardware decode bind failed");
                self.teardown();
                Err(err)
            }
        }
    }

    fn bind_profile(
        &mut self,
        driver: &dyn Driver,
        profile: Profile,
        surfaces: usize,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let mask = driver
            .rt_formats(profile, Entrypoint::VLD)
            .map_err(AccelError::driver("vaGetConfigAttributes"))?;
        if !mask.contains(RtFormat::YUV420) && !mask.contains(RtFormat::YUV422) {
            return Err(AccelError::UnsupportedFormat { profile, mask });
        }

        let config = match self.hw_config {
            Some((bound, id)) if bound == profile => {
                debug!(%profile, config = id.0, "reusing hardware config");
                id
            }
            _ => {
                self.destroy_config();
                let id = driver
                    .create_config(profile, Entrypoint::VLD, mask)
                    .map_err(AccelError::driver("vaCreateConfig"))?;
                self.hw_config = Some((profile, id));
                id
            }
        };

        let format = self.configure_pool(mask, surfaces, width, height)?;

        let targets = self.pool.ids();
        let context = driver
            .create_context(config, width, height, true, &targets)
            .map_err(AccelError::driver("vaCreateContext"))?;
        self.hw_context = Some(context);
        self.format = Some(format);
        Ok(())
    }

    /// Allocate surfaces at YUV420, falling back to YUV422. A pool already
    /// holding the requested geometry at an allowed format is kept as is.
    fn configure_pool(
        &self,
        mask: RtFormat,
        count: usize,
        width: u32,
        height: u32,
    ) -> Result<RtFormat> {
        let mut formats = Vec::with_capacity(2);
        if mask.contains(RtFormat::YUV420) {
            formats.push(RtFormat::YUV420);
        }
        if mask.contains(RtFormat::YUV422) && (formats.is_empty() || self.config.format_fallback) {
            formats.push(RtFormat::YUV422);
        }
        if let Some(current) = self.pool.geometry() {
            let same = current.width == width
                && current.height == height
                && self.pool.stats().capacity == count;
            if same {
                if let Some(pos) = formats.iter().position(|f| *f == current.format) {
                    formats[..=pos].rotate_right(1);
                }
            }
        }

        for format in formats {
            match self.pool.configure(count, width, height, format) {
                Ok(()) => return Ok(format),
                Err(err) => warn!(%format, count, width, height, error = %err, "surface allocation failed"),
            }
        }
        Err(AccelError::SurfaceAllocation {
            count,
            width,
            height,
        })
    }

    /// Destroy the execution context, keeping the config and surfaces for a
    /// later `bind`.
    pub fn unbind(&mut self) {
        self.destroy_context();
    }

    /// Surface for the next decoded frame.
    pub fn get_surface(&self) -> Result<SurfaceLease> {
        if !self.is_bound() {
            return Err(AccelError::NotBound);
        }
        self.pool.acquire()
    }

    pub fn hw_context(&self) -> Option<HwContext> {
        match (self.hw_config, self.hw_context) {
            (Some((_, config)), Some(context)) => Some(HwContext { config, context }),
            _ => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.hw_context.is_some()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.hw_config.map(|(profile, _)| profile)
    }

    pub fn surface_format(&self) -> Option<RtFormat> {
        self.format
    }

    /// The pool backing this context. Clone it to release surfaces from
    /// another thread.
    pub fn pool(&self) -> &SurfacePool {
        &self.pool
    }

    fn destroy_context(&mut self) {
        let Some(context) = self.hw_context.take() else {
            return;
        };
        match self.registry.service().driver() {
            Ok(driver) => match driver.destroy_context(context) {
                Ok(()) => debug!(context = context.0, "execution context destroyed"),
                Err(status) => warn!(%status, context = context.0, "vaDestroyContext failed"),
            },
            Err(_) => debug!(context = context.0, "driver shut down, skipping vaDestroyContext"),
        }
    }

    fn destroy_config(&mut self) {
        let Some((_, config)) = self.hw_config.take() else {
            return;
        };
        match self.registry.service().driver() {
            Ok(driver) => {
                if let Err(status) = driver.destroy_config(config) {
                    warn!(%status, config = config.0, "vaDestroyConfig failed");
                }
            }
            Err(_) => debug!(config = config.0, "driver shut down, skipping vaDestroyConfig"),
        }
    }

    fn teardown(&mut self) {
        self.destroy_context();
        self.destroy_config();
        self.pool.clear();
        self.format = None;
    }
}

impl Drop for AccelContext {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for AccelContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccelContext")
            .field("profile", &self.profile())
            .field("hw_context", &self.hw_context())
            .field("format", &self.format)
            .field("pool", &self.pool)
            .finish()
    }
}
