//! Ordered ladders of display resolutions.

use crate::error::{CoreError, Result};
use crate::timeframe::Resolution;

/// Direction of a step along the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards longer bins (HTF).
    Coarser,
    /// Towards shorter bins (LTF).
    Finer,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Coarser => "coarser",
            Direction::Finer => "finer",
        }
    }
}

/// Strictly increasing sequence of resolutions.
///
/// Rungs are looked up by duration, so `60min` finds the `1h` rung.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyLadder {
    rungs: Vec<Resolution>,
}

impl FrequencyLadder {
    /// Builds a ladder, rejecting rungs that are not strictly increasing.
    pub fn new(rungs: Vec<Resolution>) -> Result<Self> {
        for pair in rungs.windows(2) {
            if pair[0].duration_seconds() >= pair[1].duration_seconds() {
                return Err(CoreError::UnorderedLadder(pair[1]));
            }
        }
        Ok(Self { rungs })
    }

    /// `1min, 5min, 15min, 1h, 4h, 1d, 1w, 1M, 1y`.
    pub fn standard() -> Self {
        Self {
            rungs: vec![
                Resolution::minutes(1),
                Resolution::minutes(5),
                Resolution::minutes(15),
                Resolution::hours(1),
                Resolution::hours(4),
                Resolution::days(1),
                Resolution::weeks(1),
                Resolution::months(1),
                Resolution::years(1),
            ],
        }
    }

    /// Parses a ladder from tags such as `["1min", "1h", "1d"]`.
    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Result<Self> {
        let rungs = tags
            .iter()
            .map(|tag| tag.as_ref().parse())
            .collect::<Result<Vec<Resolution>>>()?;
        Self::new(rungs)
    }

    /// Effective ladder for data recorded at `native`.
    ///
    /// A native resolution between two rungs is inserted at its rank; one
    /// finer than every rung becomes the new finest rung. The result starts
    /// at `native`, since data cannot be shown finer than it was recorded.
    pub fn for_native(&self, native: Resolution) -> Result<Self> {
        let mut ladder = self.clone();
        if ladder.index_of(&native).is_none() {
            match ladder.finest() {
                Some(finest) if native.duration_seconds() < finest.duration_seconds() => {
                    ladder.rungs.insert(0, native);
                }
                None => ladder.rungs.push(native),
                Some(_) => ladder.insert_custom(native)?,
            }
        }
        Ok(ladder.truncate_from(&native))
    }

    /// Canonical duration used for every ladder comparison.
    pub fn duration_seconds(resolution: &Resolution) -> i64 {
        resolution.duration_seconds()
    }

    /// Inserts a custom resolution between its two neighbours.
    ///
    /// A resolution whose duration already sits on the ladder is a no-op.
    /// One at or beyond either end has no unique rank and is rejected.
    pub fn insert_custom(&mut self, resolution: Resolution) -> Result<()> {
        if self.index_of(&resolution).is_some() {
            return Ok(());
        }
        let duration = resolution.duration_seconds();
        let slot = self.rungs.windows(2).position(|pair| {
            pair[0].duration_seconds() < duration && duration < pair[1].duration_seconds()
        });
        match slot {
            Some(index) => {
                log::debug!("inserting custom resolution {} at rung {}", resolution, index + 1);
                self.rungs.insert(index + 1, resolution);
                Ok(())
            }
            None => Err(CoreError::AmbiguousResolution(resolution)),
        }
    }

    /// Sub-ladder starting at `resolution`'s rank; the full ladder when
    /// `resolution` is finer than every rung.
    pub fn truncate_from(&self, resolution: &Resolution) -> Self {
        let duration = resolution.duration_seconds();
        Self {
            rungs: self
                .rungs
                .iter()
                .copied()
                .filter(|rung| rung.duration_seconds() >= duration)
                .collect(),
        }
    }

    /// The rung `steps` positions away from `resolution`.
    pub fn neighbor(
        &self,
        resolution: &Resolution,
        direction: Direction,
        steps: usize,
    ) -> Result<Resolution> {
        let index = self
            .index_of(resolution)
            .ok_or(CoreError::UnknownResolution(*resolution))?;
        let target = match direction {
            Direction::Coarser => index.checked_add(steps).filter(|&i| i < self.rungs.len()),
            Direction::Finer => index.checked_sub(steps),
        };
        target
            .map(|i| self.rungs[i])
            .ok_or(CoreError::LadderBoundary {
                from: *resolution,
                direction: direction.label(),
                steps,
            })
    }

    /// Position of the rung with the same duration as `resolution`.
    pub fn index_of(&self, resolution: &Resolution) -> Option<usize> {
        let duration = resolution.duration_seconds();
        self.rungs
            .iter()
            .position(|rung| rung.duration_seconds() == duration)
    }

    pub fn contains(&self, resolution: &Resolution) -> bool {
        self.index_of(resolution).is_some()
    }

    pub fn get(&self, index: usize) -> Option<Resolution> {
        self.rungs.get(index).copied()
    }

    pub fn finest(&self) -> Option<Resolution> {
        self.rungs.first().copied()
    }

    pub fn coarsest(&self) -> Option<Resolution> {
        self.rungs.last().copied()
    }

    pub fn len(&self) -> usize {
        self.rungs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rungs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resolution> {
        self.rungs.iter()
    }

    pub fn as_slice(&self) -> &[Resolution] {
        &self.rungs
    }
}

impl Default for FrequencyLadder {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(ladder: &FrequencyLadder) -> Vec<String> {
        ladder.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_standard_ladder_is_ordered() {
        let ladder = FrequencyLadder::standard();
        for (i, a) in ladder.iter().enumerate() {
            for (j, b) in ladder.iter().enumerate() {
                if a.duration_seconds() < b.duration_seconds() {
                    assert!(i < j, "{a} should rank below {b}");
                }
            }
        }
    }

    #[test]
    fn test_new_rejects_unordered() {
        let err = FrequencyLadder::from_tags(&["1h", "5min"]).unwrap_err();
        assert_eq!(err, CoreError::UnorderedLadder(Resolution::minutes(5)));
        assert!(FrequencyLadder::from_tags(&["1h", "60min"]).is_err());
    }

    #[test]
    fn test_insert_custom_between_rungs() {
        let mut ladder = FrequencyLadder::standard();
        ladder.insert_custom(Resolution::hours(2)).unwrap();
        assert_eq!(ladder.index_of(&Resolution::hours(2)), Some(4));
        assert_eq!(ladder.len(), 10);
    }

    #[test]
    fn test_insert_custom_equal_duration_is_noop() {
        let mut ladder = FrequencyLadder::standard();
        ladder.insert_custom(Resolution::minutes(60)).unwrap();
        assert_eq!(ladder, FrequencyLadder::standard());
    }

    #[test]
    fn test_insert_custom_outside_ladder_is_ambiguous() {
        let mut ladder = FrequencyLadder::standard();
        assert_eq!(
            ladder.insert_custom(Resolution::seconds(30)),
            Err(CoreError::AmbiguousResolution(Resolution::seconds(30)))
        );
        assert_eq!(
            ladder.insert_custom(Resolution::years(2)),
            Err(CoreError::AmbiguousResolution(Resolution::years(2)))
        );
    }

    #[test]
    fn test_truncate_from() {
        let ladder = FrequencyLadder::standard();
        assert_eq!(
            labels(&ladder.truncate_from(&Resolution::days(1))),
            ["1d", "1w", "1M", "1y"]
        );
        assert_eq!(ladder.truncate_from(&Resolution::seconds(1)), ladder);
    }

    #[test]
    fn test_for_native() {
        let ladder = FrequencyLadder::standard();
        assert_eq!(
            labels(&ladder.for_native(Resolution::hours(2)).unwrap()),
            ["2h", "4h", "1d", "1w", "1M", "1y"]
        );
        assert_eq!(
            ladder.for_native(Resolution::seconds(1)).unwrap().finest(),
            Some(Resolution::seconds(1))
        );
        assert!(ladder.for_native(Resolution::years(3)).is_err());
    }

    #[test]
    fn test_neighbor() {
        let ladder = FrequencyLadder::standard();
        let one_min = Resolution::minutes(1);
        assert_eq!(
            ladder.neighbor(&one_min, Direction::Coarser, 4).unwrap(),
            Resolution::hours(4)
        );
        assert_eq!(
            ladder.neighbor(&Resolution::days(1), Direction::Finer, 2).unwrap(),
            Resolution::hours(1)
        );
        assert!(matches!(
            ladder.neighbor(&one_min, Direction::Finer, 1),
            Err(CoreError::LadderBoundary { .. })
        ));
        assert!(matches!(
            ladder.neighbor(&one_min, Direction::Coarser, 9),
            Err(CoreError::LadderBoundary { .. })
        ));
        assert!(matches!(
            ladder.neighbor(&Resolution::hours(3), Direction::Coarser, 1),
            Err(CoreError::UnknownResolution(_))
        ));
    }
}
