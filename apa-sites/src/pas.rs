//! Sequence context heuristics around a candidate cleavage site.
//!
//! All sequences are in transcription direction: the upstream window ends
//! just before the site and the downstream window starts just after it.

use crate::protocol::{A_CONTENT_SPAN, ARichRule};

/// Poly(A) signal hexamers, canonical AATAAA first.
pub const PAS_HEXAMERS: [&str; 12] = [
    "AATAAA", "ATTAAA", "AGTAAA", "TATAAA", "CATAAA", "GATAAA", "AATATA", "AATACA", "AATAGA",
    "ACTAAA", "AAGAAA", "AATGAA",
];

/// First PAS hexamer found in the upstream window.
pub fn find_pas(upstream: &str) -> Option<&'static str> {
    PAS_HEXAMERS
        .iter()
        .copied()
        .find(|hexamer| upstream.contains(hexamer))
}

fn count_a(bases: &[u8]) -> usize {
    bases.iter().filter(|&&b| b == b'A').count()
}

/// Downstream window looks like genomic A-stretch (internal priming).
pub fn downstream_a_rich(downstream: &str, rule: &ARichRule) -> bool {
    let bases = downstream.as_bytes();
    let head = &bases[..bases.len().min(A_CONTENT_SPAN)];
    downstream.starts_with(&"A".repeat(rule.run)) || count_a(head) >= rule.max_a
}

/// Upstream window ends in an A-stretch.
pub fn upstream_a_rich(upstream: &str, rule: &ARichRule) -> bool {
    let bases = upstream.as_bytes();
    let tail = &bases[bases.len().saturating_sub(A_CONTENT_SPAN)..];
    upstream.ends_with(&"A".repeat(rule.run)) || count_a(tail) >= rule.max_a
}
