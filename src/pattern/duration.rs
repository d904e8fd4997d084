// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Time assignment for compiled patterns.
//!
//! Walks a pattern tree depth-first and flattens it into a time-ordered
//! step list. A group of K siblings splits its slot into K equal parts,
//! recursively. Sustains extend the most recently emitted step; rests
//! occupy time without emitting a step.

use crate::error::{Error, Result};
use crate::pattern::{expand_pattern, PatternElement};

/// What a flattened step does when dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Trigger from the primary note pool (`x`)
    Trigger,
    /// Trigger from the random note pool (`R`)
    RandomTrigger,
}

/// One flattened, time-ordered step of a pattern cycle.
///
/// `offset` and `duration` share whatever unit was passed to
/// [`assign_durations`] (seconds for dispatch, ticks for live scheduling).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Step kind
    pub kind: StepKind,
    /// Start offset from the beginning of the pattern cycle
    pub offset: f64,
    /// Step duration, including any merged sustains
    pub duration: f64,
}

/// Intermediate slot produced by the pure recursive flattening pass
enum Slot {
    Emit(StepKind, f64),
    Extend(f64),
    Silence(f64),
}

/// Flatten one level of the tree into slots. Returns a fresh sequence per
/// call; the caller concatenates, so no accumulator is shared across
/// recursive calls.
fn flatten(elements: &[PatternElement], length: f64) -> Vec<Slot> {
    let mut slots = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            PatternElement::Note => slots.push(Slot::Emit(StepKind::Trigger, length)),
            PatternElement::RandomNote => slots.push(Slot::Emit(StepKind::RandomTrigger, length)),
            PatternElement::Rest => slots.push(Slot::Silence(length)),
            PatternElement::Sustain => slots.push(Slot::Extend(length)),
            PatternElement::Group(children) => {
                if !children.is_empty() {
                    slots.extend(flatten(children, length / children.len() as f64));
                }
            }
        }
    }
    slots
}

/// Assign durations to a compiled pattern tree.
///
/// Each top-level element occupies `unit`; nested groups subdivide evenly.
/// A sustain with no preceding emitted step contributes nothing (it is
/// dropped silently, matching the pattern language's definition of `_` as
/// "extend the previous step").
pub fn assign_durations(elements: &[PatternElement], unit: f64) -> Vec<Step> {
    let mut steps: Vec<Step> = Vec::new();
    let mut offset = 0.0;
    for slot in flatten(elements, unit) {
        match slot {
            Slot::Emit(kind, length) => {
                steps.push(Step {
                    kind,
                    offset,
                    duration: length,
                });
                offset += length;
            }
            Slot::Extend(length) => {
                if let Some(last) = steps.last_mut() {
                    last.duration += length;
                }
                offset += length;
            }
            Slot::Silence(length) => offset += length,
        }
    }
    steps
}

/// Total duration of one pattern cycle: the per-slot unit multiplied by the
/// number of top-level elements (nested groups count as one slot each).
/// This is the scheduling-grid length of the pattern, not the sum of
/// emitted step durations.
pub fn total_pattern_duration(pattern: &str, unit: f64) -> Result<f64> {
    let elements = expand_pattern(pattern)?;
    Ok(unit * elements.len() as f64)
}

/// Least common multiple by increment search from the larger operand.
/// Operands here are small musical counts, so the O(lcm/min) search is fine.
pub fn lcm(a: usize, b: usize) -> usize {
    let (smallest, largest) = if a < b { (a, b) } else { (b, a) };
    if smallest == 0 {
        return 0;
    }
    let mut candidate = largest;
    while candidate % smallest != 0 {
        candidate += largest;
    }
    candidate
}

/// Minimum duration needed to render a clip offline so that every
/// combination of pattern position and note-pool position plays exactly once
/// before the cycle repeats.
///
/// `R` steps count toward the primary pool cycle only when no dedicated
/// random pool is supplied, because in that case they pull from the same
/// cycling pool as `x`.
pub fn rendering_duration(
    pattern: &str,
    unit: f64,
    note_count: usize,
    has_random_pool: bool,
) -> Result<f64> {
    let regular = pattern.chars().filter(|&c| c == 'x').count();
    let random = pattern.chars().filter(|&c| c == 'R').count();
    let pattern_note_steps = if has_random_pool { regular } else { regular + random };
    if pattern_note_steps == 0 {
        return Err(Error::NoTriggerSteps(pattern.to_string()));
    }

    let note_count = note_count.max(1);
    let total = total_pattern_duration(pattern, unit)?;
    Ok(total / pattern_note_steps as f64 * lcm(note_count, pattern_note_steps) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps_for(pattern: &str, unit: f64) -> Vec<Step> {
        assign_durations(&expand_pattern(pattern).unwrap(), unit)
    }

    #[test]
    fn test_sustain_merges_into_previous_step() {
        let steps = steps_for("x_", 0.5);
        assert_eq!(steps.len(), 1);
        assert!((steps[0].duration - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_group_subdivides_evenly() {
        let steps = steps_for("x[xx]", 1.0);
        assert_eq!(steps.len(), 3);
        assert!((steps[0].duration - 1.0).abs() < 1e-9);
        assert!((steps[1].duration - 0.5).abs() < 1e-9);
        assert!((steps[2].duration - 0.5).abs() < 1e-9);
        assert!((steps[2].offset - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_nested_group_subdivides_recursively() {
        let steps = steps_for("x[x[xx]]", 1.0);
        assert_eq!(steps.len(), 4);
        assert!((steps[1].duration - 0.5).abs() < 1e-9);
        assert!((steps[2].duration - 0.25).abs() < 1e-9);
        assert!((steps[3].duration - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_rest_occupies_time_without_step() {
        let steps = steps_for("x-x", 1.0);
        assert_eq!(steps.len(), 2);
        assert!((steps[1].offset - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_leading_sustain_dropped_silently() {
        let steps = steps_for("_x", 1.0);
        assert_eq!(steps.len(), 1);
        assert!((steps[0].offset - 1.0).abs() < 1e-9);
        assert!((steps[0].duration - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sustain_extends_across_group_boundary() {
        // The last x inside the group is extended by the top-level _
        let steps = steps_for("[xx]_", 1.0);
        assert_eq!(steps.len(), 2);
        assert!((steps[1].duration - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_step_sum_matches_cycle_length_without_rests() {
        for pattern in ["x", "xx", "x_", "x[xx]", "x[x_]R", "x[x[xR]]__"] {
            let unit = 0.25;
            let steps = steps_for(pattern, unit);
            let sum: f64 = steps.iter().map(|s| s.duration).sum();
            let total = total_pattern_duration(pattern, unit).unwrap();
            assert!(
                (sum - total).abs() < 1e-9,
                "pattern {} summed {} expected {}",
                pattern,
                sum,
                total
            );
        }
    }

    #[test]
    fn test_total_duration_counts_top_level_slots() {
        // x[xx] has two top-level slots
        let total = total_pattern_duration("x[xx]", 0.5).unwrap();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_lcm() {
        assert_eq!(lcm(4, 6), 12);
        assert_eq!(lcm(5, 5), 5);
        assert_eq!(lcm(1, 7), 7);
        assert_eq!(lcm(3, 4), 12);
    }

    #[test]
    fn test_rendering_duration_exhausts_pool() {
        // 4 trigger steps, 2-note pool: one full cycle already covers all
        // combinations, lcm(2, 4) = 4.
        let secs = rendering_duration("xxxx", 0.5, 2, false).unwrap();
        assert!((secs - 2.0).abs() < 1e-9);

        // 3-note pool against 4 steps needs lcm(3, 4) = 12 steps.
        let secs = rendering_duration("xxxx", 0.5, 3, false).unwrap();
        assert!((secs - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_rendering_duration_scales_with_pattern_length() {
        // Doubling both the pool and the step count keeps one cycle
        // sufficient, so the result doubles with the pattern span.
        let base = rendering_duration("xx", 0.5, 2, false).unwrap();
        let scaled = rendering_duration("xxxx", 0.5, 4, false).unwrap();
        assert!((base - 1.0).abs() < 1e-9);
        assert!((scaled - 2.0 * base).abs() < 1e-9);
    }

    #[test]
    fn test_rendering_duration_random_pool_excludes_r_steps() {
        let with_pool = rendering_duration("xxRR", 0.5, 2, true).unwrap();
        let without_pool = rendering_duration("xxRR", 0.5, 2, false).unwrap();
        // With a random pool only the two x steps cycle the primary pool.
        assert!((with_pool - 2.0).abs() < 1e-9);
        assert!((without_pool - 2.0).abs() < 1e-9);

        // An uneven split distinguishes them: one x against a 3-note pool
        // needs three cycles, while x+RR all cycling needs just one.
        let with_pool = rendering_duration("xRR", 0.5, 3, true).unwrap();
        let without_pool = rendering_duration("xRR", 0.5, 3, false).unwrap();
        assert!((with_pool - 4.5).abs() < 1e-9);
        assert!((without_pool - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_rendering_duration_rejects_no_trigger_steps() {
        assert!(matches!(
            rendering_duration("--__", 0.5, 4, false).unwrap_err(),
            Error::NoTriggerSteps(_)
        ));
    }
}
