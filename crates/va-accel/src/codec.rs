//! Codec families and their accelerator profile candidates.

use serde::Serialize;

use crate::types::Profile;

/// Compressed-video codec as identified by the decoder library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CodecId {
    Mpeg1Video,
    Mpeg2Video,
    Mpeg4,
    Wmv3,
    Vc1,
    H264,
}

impl CodecId {
    pub const ALL: [CodecId; 6] = [
        CodecId::Mpeg1Video,
        CodecId::Mpeg2Video,
        CodecId::Mpeg4,
        CodecId::Wmv3,
        CodecId::Vc1,
        CodecId::H264,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CodecId::Mpeg1Video => "mpeg1video",
            CodecId::Mpeg2Video => "mpeg2video",
            CodecId::Mpeg4 => "mpeg4",
            CodecId::Wmv3 => "wmv3",
            CodecId::Vc1 => "vc1",
            CodecId::H264 => "h264",
        }
    }

    pub fn from_name(name: &str) -> Option<CodecId> {
        Self::ALL.into_iter().find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

/// Profile code as reported by the decoder library for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DecoderProfile(pub i32);

impl DecoderProfile {
    /// The decoder could not determine the profile (typical for MPEG-1).
    pub const UNKNOWN: DecoderProfile = DecoderProfile(-99);

    pub const MPEG2_MAIN: DecoderProfile = DecoderProfile(4);
    pub const MPEG2_SIMPLE: DecoderProfile = DecoderProfile(5);

    pub const MPEG4_SIMPLE: DecoderProfile = DecoderProfile(0);
    pub const MPEG4_MAIN: DecoderProfile = DecoderProfile(3);
    pub const MPEG4_ADVANCED_SIMPLE: DecoderProfile = DecoderProfile(15);

    pub const VC1_SIMPLE: DecoderProfile = DecoderProfile(0);
    pub const VC1_MAIN: DecoderProfile = DecoderProfile(1);
    pub const VC1_ADVANCED: DecoderProfile = DecoderProfile(3);

    pub const H264_BASELINE: DecoderProfile = DecoderProfile(66);
    pub const H264_CONSTRAINED_BASELINE: DecoderProfile = DecoderProfile(66 | (1 << 9));
    pub const H264_MAIN: DecoderProfile = DecoderProfile(77);
    pub const H264_HIGH: DecoderProfile = DecoderProfile(100);
}

/// One accelerator profile paired with the decoder profile it serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfileCandidate {
    pub accel: Profile,
    pub decoder: DecoderProfile,
}

const fn candidate(accel: Profile, decoder: DecoderProfile) -> ProfileCandidate {
    ProfileCandidate { accel, decoder }
}

/// Static declaration of what a codec family may negotiate.
pub(crate) struct CodecEntry {
    pub codec: CodecId,
    /// Best first.
    pub candidates: &'static [ProfileCandidate],
    pub surfaces: usize,
}

/// 1 decode target, up to 2 references.
const MPEG2_SURFACES: usize = 3;
const MPEG4_SURFACES: usize = 3;
const VC1_SURFACES: usize = 3;
/// 1 decode target, up to 20 references.
const H264_SURFACES: usize = 21;

const MPEG2_CANDIDATES: &[ProfileCandidate] = &[
    candidate(Profile::MPEG2_MAIN, DecoderProfile::MPEG2_MAIN),
    candidate(Profile::MPEG2_SIMPLE, DecoderProfile::MPEG2_SIMPLE),
];

const MPEG4_CANDIDATES: &[ProfileCandidate] = &[
    candidate(Profile::MPEG4_MAIN, DecoderProfile::MPEG4_MAIN),
    candidate(Profile::MPEG4_ADVANCED_SIMPLE, DecoderProfile::MPEG4_ADVANCED_SIMPLE),
    candidate(Profile::MPEG4_SIMPLE, DecoderProfile::MPEG4_SIMPLE),
];

const WMV3_CANDIDATES: &[ProfileCandidate] = &[
    candidate(Profile::VC1_MAIN, DecoderProfile::VC1_MAIN),
    candidate(Profile::VC1_SIMPLE, DecoderProfile::VC1_SIMPLE),
    candidate(Profile::VC1_ADVANCED, DecoderProfile::VC1_ADVANCED),
];

const VC1_CANDIDATES: &[ProfileCandidate] = &[
    candidate(Profile::VC1_ADVANCED, DecoderProfile::VC1_ADVANCED),
    candidate(Profile::VC1_MAIN, DecoderProfile::VC1_MAIN),
    candidate(Profile::VC1_SIMPLE, DecoderProfile::VC1_SIMPLE),
];

const H264_CANDIDATES: &[ProfileCandidate] = &[
    candidate(Profile::H264_HIGH, DecoderProfile::H264_HIGH),
    candidate(Profile::H264_MAIN, DecoderProfile::H264_MAIN),
    candidate(Profile::H264_BASELINE, DecoderProfile::H264_BASELINE),
    candidate(
        Profile::H264_CONSTRAINED_BASELINE,
        DecoderProfile::H264_CONSTRAINED_BASELINE,
    ),
];

pub(crate) const CODEC_TABLE: &[CodecEntry] = &[
    CodecEntry {
        codec: CodecId::Mpeg1Video,
        candidates: MPEG2_CANDIDATES,
        surfaces: MPEG2_SURFACES,
    },
    CodecEntry {
        codec: CodecId::Mpeg2Video,
        candidates: MPEG2_CANDIDATES,
        surfaces: MPEG2_SURFACES,
    },
    CodecEntry {
        codec: CodecId::Mpeg4,
        candidates: MPEG4_CANDIDATES,
        surfaces: MPEG4_SURFACES,
    },
    CodecEntry {
        codec: CodecId::Wmv3,
        candidates: WMV3_CANDIDATES,
        surfaces: VC1_SURFACES,
    },
    CodecEntry {
        codec: CodecId::Vc1,
        candidates: VC1_CANDIDATES,
        surfaces: VC1_SURFACES,
    },
    CodecEntry {
        codec: CodecId::H264,
        candidates: H264_CANDIDATES,
        surfaces: H264_SURFACES,
    },
];

/// What the driver actually supports for one codec family.
///
/// Only built when at least one candidate survives, so a descriptor always
/// has a non-empty candidate list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodecDescriptor {
    codec: CodecId,
    candidates: Vec<ProfileCandidate>,
    surfaces: usize,
}

impl CodecDescriptor {
    /// Keep the candidates accepted by `supported`, in priority order.
    pub(crate) fn negotiate(
        entry: &CodecEntry,
        mut supported: impl FnMut(Profile) -> bool,
    ) -> Option<CodecDescriptor> {
        let candidates: Vec<ProfileCandidate> = entry
            .candidates
            .iter()
            .copied()
            .filter(|c| supported(c.accel))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        Some(CodecDescriptor {
            codec: entry.codec,
            candidates,
            surfaces: entry.surfaces,
        })
    }

    pub fn codec(&self) -> CodecId {
        self.codec
    }

    pub fn candidates(&self) -> &[ProfileCandidate] {
        &self.candidates
    }

    /// Number of surfaces the codec needs in flight.
    pub fn surfaces(&self) -> usize {
        self.surfaces
    }

    /// The best accelerator profile this driver supports for the codec.
    pub fn best_profile(&self) -> Profile {
        self.candidates[0].accel
    }

    /// Accelerator profile for the profile the decoder reported.
    ///
    /// An unknown decoder profile resolves to the best candidate.
    pub fn profile(&self, decoder: DecoderProfile) -> Option<Profile> {
        if decoder == DecoderProfile::UNKNOWN {
            return Some(self.best_profile());
        }
        self.candidates
            .iter()
            .find(|c| c.decoder == decoder)
            .map(|c| c.accel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(codec: CodecId) -> &'static CodecEntry {
        CODEC_TABLE.iter().find(|s| s.codec == codec).unwrap()
    }

    #[test]
    fn test_negotiate_preserves_priority() {
        let desc = CodecDescriptor::negotiate(entry(CodecId::H264), |p| {
            p == Profile::H264_CONSTRAINED_BASELINE || p == Profile::H264_HIGH
        })
        .unwrap();
        let accel: Vec<Profile> = desc.candidates().iter().map(|c| c.accel).collect();
        assert_eq!(accel, vec![Profile::H264_HIGH, Profile::H264_CONSTRAINED_BASELINE]);
        assert_eq!(desc.surfaces(), 21);
        assert_eq!(desc.best_profile(), Profile::H264_HIGH);
    }

    #[test]
    fn test_negotiate_without_survivors_is_none() {
        assert!(CodecDescriptor::negotiate(entry(CodecId::Vc1), |_| false).is_none());
    }

    #[test]
    fn test_profile_resolution() {
        let desc = CodecDescriptor::negotiate(entry(CodecId::H264), |p| p != Profile::H264_MAIN)
            .unwrap();
        assert_eq!(
            desc.profile(DecoderProfile::H264_CONSTRAINED_BASELINE),
            Some(Profile::H264_CONSTRAINED_BASELINE)
        );
        assert_eq!(desc.profile(DecoderProfile::H264_MAIN), None);
        assert_eq!(desc.profile(DecoderProfile::UNKNOWN), Some(Profile::H264_HIGH));
        assert_eq!(desc.profile(DecoderProfile(118)), None);
    }

    #[test]
    fn test_wmv3_and_vc1_order_differs() {
        let all = |_| true;
        let wmv3 = CodecDescriptor::negotiate(entry(CodecId::Wmv3), all).unwrap();
        let vc1 = CodecDescriptor::negotiate(entry(CodecId::Vc1), all).unwrap();
        assert_eq!(wmv3.best_profile(), Profile::VC1_MAIN);
        assert_eq!(vc1.best_profile(), Profile::VC1_ADVANCED);
    }

    #[test]
    fn test_codec_names_round_trip() {
        for codec in CodecId::ALL {
            assert_eq!(CodecId::from_name(codec.name()), Some(codec));
        }
        assert_eq!(CodecId::from_name("H264"), Some(CodecId::H264));
        assert_eq!(CodecId::from_name("hevc"), None);
    }
}
