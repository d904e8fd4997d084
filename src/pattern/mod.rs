// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Pattern compiler for the `x - _ [ ] R` rhythm language.
//!
//! A pattern string encodes rhythmic trigger positions: `x` triggers a note
//! from the primary pool, `R` triggers from the random pool, `-` rests, `_`
//! sustains the previous step, and `[...]` subdivides its parent's time slot
//! evenly among its children (groups nest arbitrarily).
//!
//! Compilation is purely structural: it validates the alphabet and bracket
//! balance and produces a nested element tree. Time assignment happens in
//! [`duration`].

pub mod duration;

pub use duration::{
    assign_durations, lcm, rendering_duration, total_pattern_duration, Step, StepKind,
};

use crate::error::{Error, Result};

/// One element of a compiled pattern: a leaf character or a nested group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternElement {
    /// `x`: trigger a note from the primary pool
    Note,
    /// `R`: trigger a note from the random pool
    RandomNote,
    /// `-`: rest for one slot
    Rest,
    /// `_`: extend the previous step by one slot
    Sustain,
    /// `[...]`: ordered children subdividing this element's slot
    Group(Vec<PatternElement>),
}

impl PatternElement {
    /// Child elements of a group, or an empty slice for leaves
    pub fn children(&self) -> &[PatternElement] {
        match self {
            PatternElement::Group(children) => children,
            _ => &[],
        }
    }

    /// The pattern character for a leaf, `None` for groups
    pub fn leaf_char(&self) -> Option<char> {
        match self {
            PatternElement::Note => Some('x'),
            PatternElement::RandomNote => Some('R'),
            PatternElement::Rest => Some('-'),
            PatternElement::Sustain => Some('_'),
            PatternElement::Group(_) => None,
        }
    }
}

/// Check that a pattern string is non-empty and only uses the
/// `x - _ [ ] R` alphabet
pub fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern.is_empty() {
        return Err(Error::EmptyPattern);
    }
    if pattern.chars().any(|c| !matches!(c, 'x' | 'R' | '-' | '_' | '[' | ']')) {
        return Err(Error::InvalidPattern(pattern.to_string()));
    }
    Ok(())
}

/// Compile a pattern string into a nested element tree.
///
/// `"xxx[xx[xx]]"` becomes `[x, x, x, [x, x, [x, x]]]`. Brackets must be
/// balanced; any character outside the pattern alphabet is rejected.
pub fn expand_pattern(pattern: &str) -> Result<Vec<PatternElement>> {
    validate_pattern(pattern)?;

    // Stack of unfinished groups; the bottom entry is the top level.
    let mut stack: Vec<Vec<PatternElement>> = vec![Vec::new()];

    for c in pattern.chars() {
        match c {
            '[' => stack.push(Vec::new()),
            ']' => {
                let group = stack
                    .pop()
                    .ok_or_else(|| Error::UnbalancedPattern(pattern.to_string()))?;
                let parent = stack
                    .last_mut()
                    .ok_or_else(|| Error::UnbalancedPattern(pattern.to_string()))?;
                parent.push(PatternElement::Group(group));
            }
            'x' => stack.last_mut().unwrap().push(PatternElement::Note),
            'R' => stack.last_mut().unwrap().push(PatternElement::RandomNote),
            '-' => stack.last_mut().unwrap().push(PatternElement::Rest),
            '_' => stack.last_mut().unwrap().push(PatternElement::Sustain),
            _ => unreachable!("validated above"),
        }
    }

    if stack.len() != 1 {
        return Err(Error::UnbalancedPattern(pattern.to_string()));
    }
    Ok(stack.pop().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_single_leaf() {
        let tree = expand_pattern("x").unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0], PatternElement::Note);
    }

    #[test]
    fn test_expand_flat() {
        let tree = expand_pattern("xx").unwrap();
        assert_eq!(tree[1], PatternElement::Note);
    }

    #[test]
    fn test_expand_nested_group() {
        // x[-x] -> [x, [-, x]]
        let tree = expand_pattern("x[-x]").unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[1].children()[0], PatternElement::Rest);
        assert_eq!(tree[1].children()[1], PatternElement::Note);
    }

    #[test]
    fn test_expand_deep_nesting() {
        // x[-x[-x]] -> [x, [-, x, [-, x]]]
        let tree = expand_pattern("x[-x[-x]]").unwrap();
        assert_eq!(tree[1].children()[2].children()[1], PatternElement::Note);
    }

    #[test]
    fn test_expand_all_leaf_kinds() {
        let tree = expand_pattern("xR-_").unwrap();
        let chars: Vec<char> = tree.iter().filter_map(|e| e.leaf_char()).collect();
        assert_eq!(chars, vec!['x', 'R', '-', '_']);
    }

    #[test]
    fn test_invalid_character_rejected() {
        let err = expand_pattern("xyz").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern(_)));
        assert!(err.to_string().contains("xyz"));
    }

    #[test]
    fn test_unbalanced_open_rejected() {
        assert!(matches!(
            expand_pattern("x[xx").unwrap_err(),
            Error::UnbalancedPattern(_)
        ));
    }

    #[test]
    fn test_unbalanced_close_rejected() {
        assert!(matches!(
            expand_pattern("xx]").unwrap_err(),
            Error::UnbalancedPattern(_)
        ));
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(matches!(
            expand_pattern("").unwrap_err(),
            Error::EmptyPattern
        ));
    }
}
