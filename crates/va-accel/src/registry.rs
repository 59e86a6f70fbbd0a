use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::codec::{CodecDescriptor, CodecId, CODEC_TABLE};
use crate::driver::{Driver, DriverService};
use crate::filter::{FilterDescriptor, FilterType};
use crate::types::{ConfigId, ContextId, Entrypoint, Profile, RtFormat, Status};

/// Everything the driver advertises, negotiated once at startup.
///
/// Construction never fails: without a working driver the registry is
/// simply unavailable and reports every codec and filter as unsupported.
pub struct CapabilityRegistry {
    service: Arc<DriverService>,
    entrypoints: BTreeMap<Profile, Vec<Entrypoint>>,
    codecs: HashMap<CodecId, CodecDescriptor>,
    filters: BTreeMap<FilterType, FilterDescriptor>,
    available: bool,
}

impl CapabilityRegistry {
    pub fn initialize(service: Arc<DriverService>) -> Self {
        let mut registry = CapabilityRegistry {
            service,
            entrypoints: BTreeMap::new(),
            codecs: HashMap::new(),
            filters: BTreeMap::new(),
            available: false,
        };

        let service = Arc::clone(&registry.service);
        if service.ensure_initialized().is_err() {
            return registry;
        }
        let driver = match service.driver() {
            Ok(driver) => driver,
            Err(_) => return registry,
        };

        let profiles = match driver.query_config_profiles() {
            Ok(profiles) => profiles,
            Err(status) => {
                warn!(%status, "vaQueryConfigProfiles failed, hardware decode unavailable");
                return registry;
            }
        };

        let mut entrypoints = BTreeMap::new();
        for profile in profiles {
            match driver.query_config_entrypoints(profile) {
                Ok(entries) => {
                    debug!(%profile, ?entries, "profile entrypoints");
                    entrypoints.insert(profile, entries);
                }
                Err(status) => debug!(%profile, %status, "vaQueryConfigEntrypoints failed"),
            }
        }

        let has = |entry: Entrypoint, profile: Profile| {
            entrypoints
                .get(&profile)
                .is_some_and(|entries| entries.contains(&entry))
        };

        let codecs: HashMap<CodecId, CodecDescriptor> = CODEC_TABLE
            .iter()
            .filter_map(|entry| {
                CodecDescriptor::negotiate(entry, |profile| has(Entrypoint::VLD, profile))
                    .map(|desc| (entry.codec, desc))
            })
            .collect();

        let filters = if has(Entrypoint::VIDEO_PROC, Profile::NONE) {
            query_filters(driver)
        } else {
            BTreeMap::new()
        };

        info!(
            profiles = entrypoints.len(),
            codecs = codecs.len(),
            filters = filters.len(),
            "capability registry ready"
        );

        registry.entrypoints = entrypoints;
        registry.codecs = codecs;
        registry.filters = filters;
        registry.available = true;
        registry
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn service(&self) -> &Arc<DriverService> {
        &self.service
    }

    pub fn has_entry_point(&self, entry: Entrypoint, profile: Profile) -> bool {
        self.entrypoints
            .get(&profile)
            .is_some_and(|entries| entries.contains(&entry))
    }

    /// Every profile the driver reported, with its entry points.
    pub fn profiles(&self) -> impl Iterator<Item = (Profile, &[Entrypoint])> {
        self.entrypoints.iter().map(|(p, e)| (*p, e.as_slice()))
    }

    pub fn codec_descriptor(&self, codec: CodecId) -> Option<&CodecDescriptor> {
        self.codecs.get(&codec)
    }

    /// Supported codecs in declaration order.
    pub fn codecs(&self) -> impl Iterator<Item = &CodecDescriptor> {
        CodecId::ALL.into_iter().filter_map(|c| self.codecs.get(&c))
    }

    pub fn filter_descriptor(&self, filter: FilterType) -> Option<&FilterDescriptor> {
        self.filters.get(&filter)
    }

    pub fn filters(&self) -> impl Iterator<Item = &FilterDescriptor> {
        self.filters.values()
    }

    /// Release the driver connection. Every context must be dropped first.
    pub fn finalize(&mut self) {
        self.service.shutdown();
        self.entrypoints.clear();
        self.codecs.clear();
        self.filters.clear();
        self.available = false;
    }
}

/// Enumerate video-processing filters on a throwaway 0x0 context.
fn query_filters(driver: &dyn Driver) -> BTreeMap<FilterType, FilterDescriptor> {
    let mut filters = BTreeMap::new();
    let mut config: Option<ConfigId> = None;
    let mut context: Option<ContextId> = None;

    let result = query_filters_into(driver, &mut config, &mut context, &mut filters);
    if let Err(status) = result {
        debug!(%status, "video processing filters unavailable");
    }
    if let Some(ctx) = context {
        if let Err(status) = driver.destroy_context(ctx) {
            warn!(%status, "vaDestroyContext failed for filter query");
        }
    }
    if let Some(cfg) = config {
        if let Err(status) = driver.destroy_config(cfg) {
            warn!(%status, "vaDestroyConfig failed for filter query");
        }
    }
    filters
}

fn query_filters_into(
    driver: &dyn Driver,
    config: &mut Option<ConfigId>,
    context: &mut Option<ContextId>,
    filters: &mut BTreeMap<FilterType, FilterDescriptor>,
) -> Result<(), Status> {
    let cfg = driver.create_config(Profile::NONE, Entrypoint::VIDEO_PROC, RtFormat::default())?;
    *config = Some(cfg);
    let ctx = driver.create_context(cfg, 0, 0, false, &[])?;
    *context = Some(ctx);
    for filter in driver.query_filters(ctx)? {
        let desc = FilterDescriptor::query(driver, ctx, filter);
        if desc.is_available() {
            filters.insert(filter, desc);
        }
    }
    Ok(())
}
