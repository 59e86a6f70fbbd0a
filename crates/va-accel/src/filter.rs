//! Post-processing filter capabilities.
//!
//! The driver reports capabilities per filter family. Noise reduction and
//! sharpening have a single implicit algorithm (the filter type itself) and
//! one parameter range; deinterlacing lists one entry per algorithm;
//! color balance lists one entry per adjustable attribute, each with a range.

use serde::Serialize;
use tracing::{debug, trace};

use crate::driver::{Driver, RawFilterCap};
use crate::types::ContextId;

/// `VAProcFilterType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FilterType(pub i32);

impl FilterType {
    pub const NONE: FilterType = FilterType(0);
    pub const NOISE_REDUCTION: FilterType = FilterType(1);
    pub const DEINTERLACING: FilterType = FilterType(2);
    pub const SHARPENING: FilterType = FilterType(3);
    pub const COLOR_BALANCE: FilterType = FilterType(4);

    pub fn name(self) -> &'static str {
        match self {
            Self::NONE => "none",
            Self::NOISE_REDUCTION => "noise-reduction",
            Self::DEINTERLACING => "deinterlacing",
            Self::SHARPENING => "sharpening",
            Self::COLOR_BALANCE => "color-balance",
            _ => "other",
        }
    }

    /// Every algorithm id this family can expose.
    pub fn candidate_algorithms(self) -> Vec<i32> {
        match self {
            Self::NOISE_REDUCTION | Self::SHARPENING => vec![self.0],
            Self::DEINTERLACING => (deinterlacing::BOB..deinterlacing::COUNT).collect(),
            Self::COLOR_BALANCE => (color_balance::HUE..color_balance::COUNT).collect(),
            _ => Vec::new(),
        }
    }

    /// Upper bound on the number of capability entries the family reports.
    pub fn max_entries(self) -> usize {
        match self {
            Self::NOISE_REDUCTION | Self::SHARPENING => 1,
            Self::DEINTERLACING => deinterlacing::COUNT as usize,
            Self::COLOR_BALANCE => color_balance::COUNT as usize,
            _ => 0,
        }
    }
}

/// `VAProcDeinterlacingType`
pub mod deinterlacing {
    pub const NONE: i32 = 0;
    pub const BOB: i32 = 1;
    pub const WEAVE: i32 = 2;
    pub const MOTION_ADAPTIVE: i32 = 3;
    pub const MOTION_COMPENSATED: i32 = 4;
    pub const COUNT: i32 = 5;
}

/// `VAProcColorBalanceType`
pub mod color_balance {
    pub const NONE: i32 = 0;
    pub const HUE: i32 = 1;
    pub const SATURATION: i32 = 2;
    pub const BRIGHTNESS: i32 = 3;
    pub const CONTRAST: i32 = 4;
    pub const AUTO_SATURATION: i32 = 5;
    pub const AUTO_BRIGHTNESS: i32 = 6;
    pub const AUTO_CONTRAST: i32 = 7;
    pub const COUNT: i32 = 8;
}

/// `VAProcFilterValueRange`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub step: f32,
}

impl ParamRange {
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilterCapability {
    pub algorithm: i32,
    pub range: Option<ParamRange>,
}

/// Negotiated capabilities of one filter family. An empty descriptor means
/// the filter is not available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterDescriptor {
    filter: FilterType,
    caps: Vec<FilterCapability>,
}

impl FilterDescriptor {
    pub fn empty(filter: FilterType) -> Self {
        FilterDescriptor {
            filter,
            caps: Vec::new(),
        }
    }

    /// Ask the driver what `filter` supports on a video-processing context.
    ///
    /// Driver failures and families with no entries produce an empty
    /// descriptor, never an error.
    pub fn query(driver: &dyn Driver, context: ContextId, filter: FilterType) -> Self {
        let max_entries = filter.max_entries();
        if max_entries == 0 {
            trace!(filter = filter.name(), "filter family not negotiated");
            return Self::empty(filter);
        }

        let raw = match driver.query_filter_caps(context, filter, max_entries) {
            Ok(raw) => raw,
            Err(status) => {
                debug!(filter = filter.name(), %status, "vaQueryVideoProcFilterCaps failed");
                return Self::empty(filter);
            }
        };

        Self::from_raw(filter, &raw)
    }

    fn from_raw(filter: FilterType, raw: &[RawFilterCap]) -> Self {
        let caps: Vec<FilterCapability> = match filter {
            FilterType::NOISE_REDUCTION | FilterType::SHARPENING => match raw {
                [RawFilterCap::Range(range)] => vec![FilterCapability {
                    algorithm: filter.0,
                    range: Some(*range),
                }],
                _ => Vec::new(),
            },
            FilterType::DEINTERLACING => raw
                .iter()
                .filter_map(|cap| match cap {
                    RawFilterCap::Deinterlacing(algorithm) => Some(FilterCapability {
                        algorithm: *algorithm,
                        range: None,
                    }),
                    _ => None,
                })
                .collect(),
            FilterType::COLOR_BALANCE => raw
                .iter()
                .filter_map(|cap| match cap {
                    RawFilterCap::ColorBalance(algorithm, range) => Some(FilterCapability {
                        algorithm: *algorithm,
                        range: Some(*range),
                    }),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        debug!(filter = filter.name(), entries = caps.len(), "filter capabilities");
        FilterDescriptor { filter, caps }
    }

    pub fn filter(&self) -> FilterType {
        self.filter
    }

    pub fn is_available(&self) -> bool {
        !self.caps.is_empty()
    }

    pub fn capabilities(&self) -> &[FilterCapability] {
        &self.caps
    }

    pub fn algorithms(&self) -> Vec<i32> {
        self.caps.iter().map(|c| c.algorithm).collect()
    }

    pub fn supports(&self, algorithm: i32) -> bool {
        self.caps.iter().any(|c| c.algorithm == algorithm)
    }

    pub fn range(&self, algorithm: i32) -> Option<ParamRange> {
        self.caps
            .iter()
            .find(|c| c.algorithm == algorithm)
            .and_then(|c| c.range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeDriver;
    use crate::types::Status;

    const RANGE: ParamRange = ParamRange {
        min: 0.0,
        max: 64.0,
        default: 8.0,
        step: 1.0,
    };

    #[test]
    fn test_single_algorithm_family() {
        let fake = FakeDriver::new();
        fake.add_filter(FilterType::SHARPENING, Ok(vec![RawFilterCap::Range(RANGE)]));
        let desc = FilterDescriptor::query(&*fake, ContextId(1), FilterType::SHARPENING);
        assert!(desc.is_available());
        assert_eq!(desc.algorithms(), vec![FilterType::SHARPENING.0]);
        assert_eq!(desc.range(FilterType::SHARPENING.0), Some(RANGE));
    }

    #[test]
    fn test_deinterlacing_lists_each_algorithm() {
        let fake = FakeDriver::new();
        fake.add_filter(
            FilterType::DEINTERLACING,
            Ok(vec![
                RawFilterCap::Deinterlacing(deinterlacing::BOB),
                RawFilterCap::Deinterlacing(deinterlacing::MOTION_ADAPTIVE),
            ]),
        );
        let desc = FilterDescriptor::query(&*fake, ContextId(1), FilterType::DEINTERLACING);
        assert_eq!(
            desc.algorithms(),
            vec![deinterlacing::BOB, deinterlacing::MOTION_ADAPTIVE]
        );
        assert!(desc.supports(deinterlacing::BOB));
        assert!(!desc.supports(deinterlacing::WEAVE));
        assert_eq!(desc.range(deinterlacing::BOB), None);
    }

    #[test]
    fn test_color_balance_keeps_ranges() {
        let fake = FakeDriver::new();
        let hue = ParamRange {
            min: -180.0,
            max: 180.0,
            default: 0.0,
            step: 1.0,
        };
        fake.add_filter(
            FilterType::COLOR_BALANCE,
            Ok(vec![
                RawFilterCap::ColorBalance(color_balance::HUE, hue),
                RawFilterCap::ColorBalance(color_balance::CONTRAST, RANGE),
            ]),
        );
        let desc = FilterDescriptor::query(&*fake, ContextId(1), FilterType::COLOR_BALANCE);
        assert_eq!(desc.range(color_balance::HUE), Some(hue));
        assert_eq!(desc.range(color_balance::CONTRAST), Some(RANGE));
        assert_eq!(desc.range(color_balance::SATURATION), None);
    }

    #[test]
    fn test_unavailable_filters_are_empty() {
        let fake = FakeDriver::new();
        fake.add_filter(FilterType::NOISE_REDUCTION, Ok(Vec::new()));
        fake.add_filter(FilterType::DEINTERLACING, Err(Status::OPERATION_FAILED));
        fake.add_filter(FilterType(9), Ok(vec![RawFilterCap::Range(RANGE)]));

        for filter in [FilterType::NOISE_REDUCTION, FilterType::DEINTERLACING, FilterType(9)] {
            let desc = FilterDescriptor::query(&*fake, ContextId(1), filter);
            assert!(!desc.is_available(), "{filter:?} should be unavailable");
        }
    }

    #[test]
    fn test_candidate_algorithms() {
        assert_eq!(FilterType::NOISE_REDUCTION.candidate_algorithms(), vec![1]);
        assert_eq!(FilterType::DEINTERLACING.candidate_algorithms(), vec![1, 2, 3, 4]);
        assert_eq!(FilterType::COLOR_BALANCE.candidate_algorithms().len(), 7);
        assert!(FilterType(9).candidate_algorithms().is_empty());
    }

    #[test]
    fn test_param_range_clamp() {
        assert!(RANGE.contains(8.0));
        assert!(!RANGE.contains(65.0));
        assert_eq!(RANGE.clamp(-3.0), 0.0);
    }
}
