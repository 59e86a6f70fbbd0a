//! In-memory driver used by the unit tests.
//!
//! Records every call, tracks live objects so leaks and double frees show up
//! as assertion failures, and lets a test inject failures per call.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::driver::{Driver, RawFilterCap};
use crate::filter::FilterType;
use crate::types::{ConfigId, ContextId, Entrypoint, Profile, RtFormat, Status, SurfaceId};

#[derive(Default)]
struct FakeState {
    entrypoints: BTreeMap<Profile, Vec<Entrypoint>>,
    rt_formats: HashMap<Profile, RtFormat>,
    filters: Vec<(FilterType, std::result::Result<Vec<RawFilterCap>, Status>)>,
    calls: HashMap<&'static str, usize>,
    next_id: u32,
    live_surfaces: HashSet<SurfaceId>,
    destroyed_surfaces: Vec<SurfaceId>,
    live_configs: HashSet<ConfigId>,
    live_contexts: HashSet<ContextId>,
    fail_initialize: bool,
    fail_profiles: bool,
    fail_entrypoints: HashSet<Profile>,
    fail_surface_formats: HashSet<u32>,
    fail_create_config: bool,
    fail_create_context: usize,
    fail_query_filters: bool,
    last_context_targets: Vec<SurfaceId>,
}

pub struct FakeDriver {
    state: Mutex<FakeState>,
}

impl FakeDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeDriver {
            state: Mutex::new(FakeState {
                next_id: 0x100,
                ..Default::default()
            }),
        })
    }

    /// A driver exposing VLD for every H.264 and MPEG-2 profile plus video
    /// processing, with YUV420 and YUV422 render targets.
    pub fn desktop() -> Arc<Self> {
        let fake = Self::new();
        for profile in [
            Profile::MPEG2_SIMPLE,
            Profile::MPEG2_MAIN,
            Profile::H264_CONSTRAINED_BASELINE,
            Profile::H264_MAIN,
            Profile::H264_HIGH,
        ] {
            fake.add_profile(profile, &[Entrypoint::VLD]);
        }
        fake.add_profile(Profile::NONE, &[Entrypoint::VIDEO_PROC]);
        fake
    }

    pub fn add_profile(&self, profile: Profile, entrypoints: &[Entrypoint]) {
        let mut state = self.state.lock();
        state.entrypoints.insert(profile, entrypoints.to_vec());
        state
            .rt_formats
            .insert(profile, RtFormat::YUV420.union(RtFormat::YUV422));
    }

    pub fn set_rt_formats(&self, profile: Profile, mask: RtFormat) {
        self.state.lock().rt_formats.insert(profile, mask);
    }

    pub fn add_filter(
        &self,
        filter: FilterType,
        caps: std::result::Result<Vec<RawFilterCap>, Status>,
    ) {
        self.state.lock().filters.push((filter, caps));
    }

    pub fn fail_initialize(&self) {
        self.state.lock().fail_initialize = true;
    }

    pub fn fail_profiles(&self) {
        self.state.lock().fail_profiles = true;
    }

    pub fn fail_entrypoints(&self, profile: Profile) {
        self.state.lock().fail_entrypoints.insert(profile);
    }

    pub fn fail_surfaces(&self, format: RtFormat) {
        self.state.lock().fail_surface_formats.insert(format.0);
    }

    pub fn fail_create_config(&self) {
        self.state.lock().fail_create_config = true;
    }

    /// Fail the next `count` context creations.
    pub fn fail_create_context(&self, count: usize) {
        self.state.lock().fail_create_context = count;
    }

    pub fn fail_query_filters(&self) {
        self.state.lock().fail_query_filters = true;
    }

    pub fn calls(&self, name: &str) -> usize {
        self.state.lock().calls.get(name).copied().unwrap_or(0)
    }

    pub fn live_surfaces(&self) -> usize {
        self.state.lock().live_surfaces.len()
    }

    pub fn is_live(&self, surface: SurfaceId) -> bool {
        self.state.lock().live_surfaces.contains(&surface)
    }

    pub fn destroy_count(&self, surface: SurfaceId) -> usize {
        self.state
            .lock()
            .destroyed_surfaces
            .iter()
            .filter(|s| **s == surface)
            .count()
    }

    pub fn live_configs(&self) -> usize {
        self.state.lock().live_configs.len()
    }

    pub fn live_contexts(&self) -> usize {
        self.state.lock().live_contexts.len()
    }

    pub fn last_context_targets(&self) -> Vec<SurfaceId> {
        self.state.lock().last_context_targets.clone()
    }

    fn record(state: &mut FakeState, name: &'static str) {
        *state.calls.entry(name).or_insert(0) += 1;
    }

    fn next_id(state: &mut FakeState) -> u32 {
        state.next_id += 1;
        state.next_id
    }
}

impl Driver for FakeDriver {
    fn initialize(&self) -> std::result::Result<(i32, i32), Status> {
        let mut state = self.state.lock();
        Self::record(&mut state, "initialize");
        if state.fail_initialize {
            return Err(Status::INVALID_DISPLAY);
        }
        Ok((1, 20))
    }

    fn terminate(&self) {
        Self::record(&mut self.state.lock(), "terminate");
    }

    fn query_config_profiles(&self) -> std::result::Result<Vec<Profile>, Status> {
        let mut state = self.state.lock();
        Self::record(&mut state, "query_config_profiles");
        if state.fail_profiles {
            return Err(Status::OPERATION_FAILED);
        }
        Ok(state.entrypoints.keys().copied().collect())
    }

    fn query_config_entrypoints(
        &self,
        profile: Profile,
    ) -> std::result::Result<Vec<Entrypoint>, Status> {
        let mut state = self.state.lock();
        Self::record(&mut state, "query_config_entrypoints");
        if state.fail_entrypoints.contains(&profile) {
            return Err(Status::UNSUPPORTED_PROFILE);
        }
        state
            .entrypoints
            .get(&profile)
            .cloned()
            .ok_or(Status::UNSUPPORTED_PROFILE)
    }

    fn rt_formats(
        &self,
        profile: Profile,
        entrypoint: Entrypoint,
    ) -> std::result::Result<RtFormat, Status> {
        let mut state = self.state.lock();
        Self::record(&mut state, "rt_formats");
        let supported = state
            .entrypoints
            .get(&profile)
            .is_some_and(|e| e.contains(&entrypoint));
        if !supported {
            return Err(Status::UNSUPPORTED_ENTRYPOINT);
        }
        Ok(state.rt_formats.get(&profile).copied().unwrap_or_default())
    }

    fn create_config(
        &self,
        _profile: Profile,
        _entrypoint: Entrypoint,
        _rt_format: RtFormat,
    ) -> std::result::Result<ConfigId, Status> {
        let mut state = self.state.lock();
        Self::record(&mut state, "create_config");
        if state.fail_create_config {
            return Err(Status::INVALID_CONFIG);
        }
        let id = ConfigId(Self::next_id(&mut state));
        state.live_configs.insert(id);
        Ok(id)
    }

    fn destroy_config(&self, config: ConfigId) -> std::result::Result<(), Status> {
        let mut state = self.state.lock();
        Self::record(&mut state, "destroy_config");
        if state.live_configs.remove(&config) {
            Ok(())
        } else {
            Err(Status::INVALID_CONFIG)
        }
    }

    fn create_surfaces(
        &self,
        format: RtFormat,
        _width: u32,
        _height: u32,
        count: usize,
    ) -> std::result::Result<Vec<SurfaceId>, Status> {
        let mut state = self.state.lock();
        Self::record(&mut state, "create_surfaces");
        if state.fail_surface_formats.contains(&format.0) {
            return Err(Status::UNSUPPORTED_RT_FORMAT);
        }
        let ids: Vec<SurfaceId> = (0..count)
            .map(|_| SurfaceId(Self::next_id(&mut state)))
            .collect();
        state.live_surfaces.extend(ids.iter().copied());
        Ok(ids)
    }

    fn destroy_surfaces(&self, surfaces: &[SurfaceId]) -> std::result::Result<(), Status> {
        let mut state = self.state.lock();
        Self::record(&mut state, "destroy_surfaces");
        for surface in surfaces {
            assert!(
                state.live_surfaces.remove(surface),
                "surface {surface:?} destroyed twice or never created"
            );
            state.destroyed_surfaces.push(*surface);
        }
        Ok(())
    }

    fn create_context(
        &self,
        config: ConfigId,
        _width: u32,
        _height: u32,
        _progressive: bool,
        render_targets: &[SurfaceId],
    ) -> std::result::Result<ContextId, Status> {
        let mut state = self.state.lock();
        Self::record(&mut state, "create_context");
        if state.fail_create_context > 0 {
            state.fail_create_context -= 1;
            return Err(Status::ALLOCATION_FAILED);
        }
        if !state.live_configs.contains(&config) {
            return Err(Status::INVALID_CONFIG);
        }
        if render_targets.iter().any(|s| !state.live_surfaces.contains(s)) {
            return Err(Status::INVALID_SURFACE);
        }
        state.last_context_targets = render_targets.to_vec();
        let id = ContextId(Self::next_id(&mut state));
        state.live_contexts.insert(id);
        Ok(id)
    }

    fn destroy_context(&self, context: ContextId) -> std::result::Result<(), Status> {
        let mut state = self.state.lock();
        Self::record(&mut state, "destroy_context");
        if state.live_contexts.remove(&context) {
            Ok(())
        } else {
            Err(Status::INVALID_CONTEXT)
        }
    }

    fn query_filters(&self, _context: ContextId) -> std::result::Result<Vec<FilterType>, Status> {
        let mut state = self.state.lock();
        Self::record(&mut state, "query_filters");
        if state.fail_query_filters {
            return Err(Status::OPERATION_FAILED);
        }
        Ok(state.filters.iter().map(|(f, _)| *f).collect())
    }

    fn query_filter_caps(
        &self,
        _context: ContextId,
        filter: FilterType,
        max_entries: usize,
    ) -> std::result::Result<Vec<RawFilterCap>, Status> {
        let mut state = self.state.lock();
        Self::record(&mut state, "query_filter_caps");
        let caps = state
            .filters
            .iter()
            .find(|(f, _)| *f == filter)
            .map(|(_, caps)| caps.clone())
            .unwrap_or(Err(Status::OPERATION_FAILED))?;
        Ok(caps.into_iter().take(max_entries).collect())
    }
}
