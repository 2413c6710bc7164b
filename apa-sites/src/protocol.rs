use apa_core::project::Protocol;

/// Bases inspected upstream of a cleavage site for a PAS hexamer.
pub const UPSTREAM_WINDOW: i64 = 36;
/// Bases inspected downstream of a cleavage site for internal priming.
pub const DOWNSTREAM_WINDOW: i64 = 15;
/// Number of bases at the window edge that the A-content check looks at.
pub const A_CONTENT_SPAN: usize = 10;

/// An A-rich stretch test: a run of `run` A's at the window edge, or at least
/// `max_a` A's among the `A_CONTENT_SPAN` edge bases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ARichRule {
    pub run: usize,
    pub max_a: usize,
}

///
/// Per-protocol acceptance rules of the true site classifier.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Thresholds {
    /// Minimum soft clip at the 3' end, `None` when the clip is not checked.
    pub min_clip: Option<u32>,
    /// Rule applied to the start of the downstream window.
    pub downstream: ARichRule,
    /// Rule applied to the end of the upstream window, if any.
    pub upstream: Option<ARichRule>,
}

impl Thresholds {
    pub fn for_protocol(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Standard => Thresholds {
                min_clip: Some(6),
                downstream: ARichRule { run: 4, max_a: 5 },
                upstream: Some(ARichRule { run: 4, max_a: 5 }),
            },
            // upstream A-richness is not checked for this protocol
            Protocol::Inverted => Thresholds {
                min_clip: None,
                downstream: ARichRule { run: 5, max_a: 6 },
                upstream: None,
            },
        }
    }
}
