//! Geometric relationship analysis between chop regions
//!
//! Pure interval comparison, independent of the viewport: overlapping pairs
//! get a quantified severity, near-touching pairs get an adjacency record
//! with the signed gap. The renderer uses these to paint warning bands and
//! connectors; nothing here is persisted.

use crate::types::Region;

// =============================================================================
// Configuration
// =============================================================================

/// Tunable thresholds for the analysis
///
/// The defaults mirror the hand-tuned values of the original tool; both are
/// exposed through `RenderSettings` rather than baked in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationshipConfig {
    /// Two regions closer than this (seconds) count as adjacent
    pub adjacency_tolerance_secs: f64,
    /// Overlap severity at or above this gets the stronger warning styling
    pub severe_overlap_threshold: f64,
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            adjacency_tolerance_secs: 0.05,
            severe_overlap_threshold: 0.5,
        }
    }
}

// =============================================================================
// Descriptors
// =============================================================================

/// Relationship classification for one partner region
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelationshipKind {
    /// Time ranges intersect; severity is `overlap / min(duration)` in (0, 1]
    Overlap { severity: f64 },
    /// Partner ends where this region starts (within tolerance);
    /// `gap = region.start - partner.end`, negative inside the tolerance
    AdjacentBefore { gap: f64 },
    /// Partner starts where this region ends (within tolerance);
    /// `gap = partner.start - region.end`
    AdjacentAfter { gap: f64 },
}

/// One analyzed pair, ephemeral per render pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Relationship {
    /// Id of the partner region
    pub partner: u64,
    pub kind: RelationshipKind,
}

impl Relationship {
    /// Whether this is an overlap at or above the severe threshold
    pub fn is_severe(&self, config: &RelationshipConfig) -> bool {
        matches!(self.kind, RelationshipKind::Overlap { severity }
            if severity >= config.severe_overlap_threshold)
    }
}

// =============================================================================
// Analysis
// =============================================================================

/// Overlap severity between two regions, if they overlap at all
///
/// Severity is the overlapped share of the shorter region, so a short chop
/// swallowed by a long one reads as severe from both sides (symmetric).
pub fn overlap_severity(a: &Region, b: &Region) -> Option<f64> {
    if a.start_time < b.end_time && a.end_time > b.start_time {
        let overlap = a.end_time.min(b.end_time) - a.start_time.max(b.start_time);
        let shorter = a.duration().min(b.duration());
        if shorter <= 0.0 {
            return None;
        }
        Some(overlap / shorter)
    } else {
        None
    }
}

/// Classify `region` against every other region in the set
///
/// Overlap takes precedence: a pair already reported as overlapping is never
/// also reported adjacent. Zero-duration partners are skipped.
pub fn analyze(region: &Region, all: &[Region], config: &RelationshipConfig) -> Vec<Relationship> {
    let mut found = Vec::new();

    for other in all {
        if other.id == region.id {
            continue;
        }
        if other.duration() <= 0.0 || region.duration() <= 0.0 {
            continue;
        }

        if let Some(severity) = overlap_severity(region, other) {
            found.push(Relationship {
                partner: other.id,
                kind: RelationshipKind::Overlap { severity },
            });
            continue;
        }

        let gap_after = other.start_time - region.end_time;
        if gap_after.abs() <= config.adjacency_tolerance_secs {
            found.push(Relationship {
                partner: other.id,
                kind: RelationshipKind::AdjacentAfter { gap: gap_after },
            });
            continue;
        }

        let gap_before = region.start_time - other.end_time;
        if gap_before.abs() <= config.adjacency_tolerance_secs {
            found.push(Relationship {
                partner: other.id,
                kind: RelationshipKind::AdjacentBefore { gap: gap_before },
            });
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(id: u64, start: f64, end: f64) -> Region {
        Region::new(id, start, end)
    }

    #[test]
    fn test_overlap_severity_worked_example() {
        // [1, 3) against [2, 4): 1s overlap over a 2s shorter region = 0.5
        let a = region(1, 1.0, 3.0);
        let b = region(2, 2.0, 4.0);
        let severity = overlap_severity(&a, &b).expect("Regions overlap");
        assert!((severity - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_overlap_severity_is_symmetric() {
        let a = region(1, 1.0, 3.0);
        let b = region(2, 2.0, 4.0);
        assert_eq!(overlap_severity(&a, &b), overlap_severity(&b, &a));
    }

    #[test]
    fn test_contained_region_is_fully_severe() {
        let short = region(1, 2.0, 2.5);
        let long = region(2, 0.0, 10.0);
        let severity = overlap_severity(&short, &long).unwrap();
        assert!((severity - 1.0).abs() < 1e-9, "Containment is maximal severity");
    }

    #[test]
    fn test_touching_regions_do_not_overlap() {
        let a = region(1, 1.0, 3.0);
        let b = region(2, 3.0, 4.0);
        assert!(overlap_severity(&a, &b).is_none());
    }

    #[test]
    fn test_adjacency_inside_tolerance() {
        let config = RelationshipConfig::default();
        let a = region(1, 1.0, 3.0);
        let b = region(2, 3.05, 4.0);
        let found = analyze(&a, &[a.clone(), b], &config);
        assert_eq!(found.len(), 1);
        match found[0].kind {
            RelationshipKind::AdjacentAfter { gap } => {
                assert!((gap - 0.05).abs() < 1e-9);
            }
            ref other => panic!("Expected AdjacentAfter, got {:?}", other),
        }
    }

    #[test]
    fn test_adjacency_outside_tolerance() {
        let config = RelationshipConfig::default();
        let a = region(1, 1.0, 3.0);
        let b = region(2, 3.051, 4.0);
        let found = analyze(&a, &[a.clone(), b], &config);
        assert!(found.is_empty(), "51ms gap is beyond the 50ms tolerance");
    }

    #[test]
    fn test_adjacent_before_symmetric_case() {
        let config = RelationshipConfig::default();
        let a = region(1, 3.02, 5.0);
        let b = region(2, 1.0, 3.0);
        let found = analyze(&a, &[a.clone(), b], &config);
        assert_eq!(found.len(), 1);
        match found[0].kind {
            RelationshipKind::AdjacentBefore { gap } => {
                assert!((gap - 0.02).abs() < 1e-9);
            }
            ref other => panic!("Expected AdjacentBefore, got {:?}", other),
        }
    }

    #[test]
    fn test_overlap_precludes_adjacency() {
        let config = RelationshipConfig::default();
        // End of a and start of b are 30ms apart AND the intervals intersect
        let a = region(1, 1.0, 3.0);
        let b = region(2, 2.97, 4.0);
        let found = analyze(&a, &[a.clone(), b], &config);
        assert_eq!(found.len(), 1);
        assert!(
            matches!(found[0].kind, RelationshipKind::Overlap { .. }),
            "Overlap wins over adjacency for the same pair"
        );
    }

    #[test]
    fn test_severe_threshold_is_configurable() {
        let a = region(1, 1.0, 3.0);
        let b = region(2, 2.0, 4.0);
        let relationship = Relationship {
            partner: 2,
            kind: RelationshipKind::Overlap {
                severity: overlap_severity(&a, &b).unwrap(),
            },
        };
        let default_config = RelationshipConfig::default();
        assert!(relationship.is_severe(&default_config), "0.5 meets the default threshold");

        let strict = RelationshipConfig {
            severe_overlap_threshold: 0.75,
            ..default_config
        };
        assert!(!relationship.is_severe(&strict));
    }

    #[test]
    fn test_zero_duration_partner_is_skipped() {
        let config = RelationshipConfig::default();
        let a = region(1, 1.0, 3.0);
        let degenerate = region(2, 2.0, 2.0);
        assert!(analyze(&a, &[a.clone(), degenerate], &config).is_empty());
    }
}
