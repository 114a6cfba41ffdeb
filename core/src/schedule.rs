//! The slice-shift schedule: the ordered list of re-slicing attempts made
//! when a block fails Reed-Solomon at the nominal slice point. Index 0 is
//! always the unshifted stream; the rest are (direction, percent) mixes
//! toward one of the neighboring samples, ordered for fast convergence on
//! typical off-center captures.

use crate::error::{Result, UatError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Mix toward the sample one position earlier.
    Before,
    /// Mix toward the sample one position later.
    After,
}

/// One entry of the schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliceStep {
    /// Slice the nominal sample alone.
    Center,
    /// Slice `sign(100 * current + percent * neighbor)`, percent 10..=90.
    Mixed(Direction, u8),
}

#[derive(Clone, Debug)]
pub struct ShiftSchedule {
    steps: Vec<SliceStep>,
}

/// Default mix order. Half-way mixes recover the common case of a slice
/// point that drifted a quarter bit; the outer percentages only matter for
/// captures near a full half-bit off, so they come last.
const DEFAULT_STEPS: [(Direction, u8); 10] = [
    (Direction::After, 50),
    (Direction::Before, 50),
    (Direction::After, 30),
    (Direction::Before, 30),
    (Direction::After, 70),
    (Direction::Before, 70),
    (Direction::After, 90),
    (Direction::Before, 90),
    (Direction::After, 10),
    (Direction::Before, 10),
];

impl ShiftSchedule {
    /// Build a schedule from mix entries; `Center` is always prepended as
    /// index 0.
    pub fn new(mixes: impl IntoIterator<Item = (Direction, u8)>) -> Result<Self> {
        let mut steps = vec![SliceStep::Center];
        for (direction, percent) in mixes {
            if !(10..=90).contains(&percent) {
                return Err(UatError::InvalidSchedule(format!(
                    "percent {percent} outside 10..=90"
                )));
            }
            steps.push(SliceStep::Mixed(direction, percent));
        }
        Ok(Self { steps })
    }

    /// Parse a comma-separated CLI override such as
    /// `after:50,before:50,after:30`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut mixes = Vec::new();
        for entry in text.split(',') {
            let (dir, pct) = entry
                .split_once(':')
                .ok_or_else(|| UatError::InvalidSchedule(format!("bad entry {entry:?}")))?;
            let direction = match dir {
                "before" | "b" => Direction::Before,
                "after" | "a" => Direction::After,
                other => {
                    return Err(UatError::InvalidSchedule(format!(
                        "bad direction {other:?}"
                    )))
                }
            };
            let percent: u8 = pct
                .parse()
                .map_err(|_| UatError::InvalidSchedule(format!("bad percent {pct:?}")))?;
            mixes.push((direction, percent));
        }
        Self::new(mixes)
    }

    pub fn steps(&self) -> &[SliceStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for ShiftSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_STEPS).expect("default schedule is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_starts_unshifted() {
        let schedule = ShiftSchedule::default();
        assert_eq!(schedule.steps()[0], SliceStep::Center);
        assert_eq!(schedule.len(), 11);
        assert_eq!(
            schedule.steps()[1],
            SliceStep::Mixed(Direction::After, 50)
        );
    }

    #[test]
    fn test_parse_override() {
        let schedule = ShiftSchedule::parse("after:40,b:20").unwrap();
        assert_eq!(
            schedule.steps(),
            &[
                SliceStep::Center,
                SliceStep::Mixed(Direction::After, 40),
                SliceStep::Mixed(Direction::Before, 20),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_bad_entries() {
        assert!(ShiftSchedule::parse("sideways:50").is_err());
        assert!(ShiftSchedule::parse("after:95").is_err());
        assert!(ShiftSchedule::parse("after").is_err());
        assert!(ShiftSchedule::parse("after:x").is_err());
    }
}
