//! Translation between logical sweep positions and the register fields of
//! the deserializer.
//!
//! The hardware splits each logical axis over two 3-bit fields that meet at
//! logical position 7. For the strobe axis these are the clock delay and the
//! data delay fields of `STROBE_SET`: position `p < 8` is clock delay `7 - p`,
//! position `p >= 8` is data delay `p - 7`, and position 7 is the point where
//! both are zero. The EQ axis works the same way with the two EQ stage
//! selectors, where selector 2 only takes over once selector 1 is at 7.
//!
//! Either delay field may be moved into its alternate bank by adding 8.

use crate::range::{PositionRange, SPLIT_POSITION};

/// Offset selecting the alternate delay bank.
pub const BASE_DELAY: u8 = 8;

/// Largest value of a single 3-bit field.
const FIELD_MAX: u8 = 7;

/// Which side of the field split a logical range falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeShape {
    /// Every position is below 8, only the first field moves.
    BelowSplit,
    /// Every position is 8 or above, only the second field moves.
    AboveSplit,
    /// The range crosses from the first field into the second.
    Straddling,
}

impl RangeShape {
    pub fn of(range: PositionRange) -> Self {
        match (range.end() < SPLIT_POSITION, range.begin() >= SPLIT_POSITION) {
            (true, _) => RangeShape::BelowSplit,
            (false, true) => RangeShape::AboveSplit,
            (false, false) => RangeShape::Straddling,
        }
    }
}

/// An inclusive range of raw register field values. Empty when `high < low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayFieldRange {
    pub low: u8,
    pub high: u8,
}

impl DelayFieldRange {
    pub const EMPTY: DelayFieldRange = DelayFieldRange { low: 1, high: 0 };

    pub const fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }

    pub fn is_empty(&self) -> bool {
        self.high < self.low
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.high - self.low) as usize + 1
        }
    }

    pub fn ascending(&self) -> impl Iterator<Item = u8> {
        self.low..=self.high
    }

    pub fn descending(&self) -> impl Iterator<Item = u8> {
        (self.low..=self.high).rev()
    }

    fn shifted(self, enabled: bool) -> Self {
        if enabled && !self.is_empty() {
            Self::new(self.low + BASE_DELAY, self.high + BASE_DELAY)
        } else {
            self
        }
    }
}

/// One strobe column as the hardware sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrobeStep {
    /// Logical strobe position, `0..=14`.
    pub position: usize,
    /// Clock delay field value, bank included.
    pub clock: u8,
    /// Data delay field value, bank included.
    pub data: u8,
}

/// The clock and data delay ranges realizing a strobe range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrobeFields {
    pub shape: RangeShape,
    /// Swept from `high` down to `low`.
    pub clock: DelayFieldRange,
    /// Swept from `low` up to `high`.
    pub data: DelayFieldRange,
    /// Resting clock value while the data field is swept.
    pub clock_base: u8,
    /// Resting data value while the clock field is swept.
    pub data_base: u8,
}

impl StrobeFields {
    /// Columns in sweep order: the clock half descending, then the data half
    /// ascending. This is also ascending logical order.
    pub fn columns(&self) -> Vec<StrobeStep> {
        let clock_half = self.clock.descending().map(|clock| StrobeStep {
            position: (FIELD_MAX - (clock - self.clock_base)) as usize,
            clock,
            data: self.data_base,
        });
        let data_half = self.data.ascending().map(|data| StrobeStep {
            position: (FIELD_MAX + (data - self.data_base)) as usize,
            clock: self.clock_base,
            data,
        });
        clock_half.chain(data_half).collect()
    }
}

/// One EQ row as the hardware sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqStep {
    /// Logical EQ position, `0..=14`.
    pub position: usize,
    pub selector1: u8,
    pub selector2: u8,
}

/// The two EQ selector ranges realizing an EQ range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqFields {
    pub shape: RangeShape,
    /// Swept with selector 2 held at 0.
    pub selector1: DelayFieldRange,
    /// Swept with selector 1 held at 7. Never contains 0.
    pub selector2: DelayFieldRange,
}

impl EqFields {
    /// Rows in sweep order: the selector 1 pass, then the selector 2 pass.
    pub fn rows(&self) -> Vec<EqStep> {
        let first_pass = self.selector1.ascending().map(|selector1| EqStep {
            position: selector1 as usize,
            selector1,
            selector2: 0,
        });
        let second_pass = self.selector2.ascending().map(|selector2| EqStep {
            position: (FIELD_MAX + selector2) as usize,
            selector1: FIELD_MAX,
            selector2,
        });
        first_pass.chain(second_pass).collect()
    }
}

/// Splits a strobe range into clock delay and data delay field ranges.
pub fn map_strobe(
    range: PositionRange,
    clock_base_delay: bool,
    data_base_delay: bool,
) -> StrobeFields {
    let (begin, end) = (range.begin(), range.end());
    let shape = RangeShape::of(range);
    let (clock, data) = match shape {
        RangeShape::BelowSplit => (
            DelayFieldRange::new(FIELD_MAX - end, FIELD_MAX - begin),
            DelayFieldRange::EMPTY,
        ),
        RangeShape::AboveSplit => (
            DelayFieldRange::EMPTY,
            DelayFieldRange::new(begin - FIELD_MAX, end - FIELD_MAX),
        ),
        // Position 7 is taken by the data half at delay 0, so the clock half
        // stops at 1.
        RangeShape::Straddling => (
            DelayFieldRange::new(1, FIELD_MAX - begin),
            DelayFieldRange::new(0, end - FIELD_MAX),
        ),
    };

    StrobeFields {
        shape,
        clock: clock.shifted(clock_base_delay),
        data: data.shifted(data_base_delay),
        clock_base: if clock_base_delay { BASE_DELAY } else { 0 },
        data_base: if data_base_delay { BASE_DELAY } else { 0 },
    }
}

/// Splits an EQ range into the two EQ stage selector ranges.
pub fn map_eq(range: PositionRange) -> EqFields {
    let (begin, end) = (range.begin(), range.end());
    let shape = RangeShape::of(range);
    let (selector1, selector2) = match shape {
        RangeShape::BelowSplit => (DelayFieldRange::new(begin, end), DelayFieldRange::EMPTY),
        RangeShape::AboveSplit => (
            DelayFieldRange::EMPTY,
            DelayFieldRange::new(begin - FIELD_MAX, end - FIELD_MAX),
        ),
        RangeShape::Straddling => (
            DelayFieldRange::new(begin, FIELD_MAX),
            DelayFieldRange::new(1, end - FIELD_MAX),
        ),
    };

    EqFields {
        shape,
        selector1,
        selector2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::MAX_POSITION;

    fn range(begin: u8, end: u8) -> PositionRange {
        PositionRange::new(begin, end).unwrap()
    }

    fn positions(columns: &[StrobeStep]) -> Vec<usize> {
        columns.iter().map(|c| c.position).collect()
    }

    #[test]
    fn full_strobe_range_straddles() {
        let fields = map_strobe(PositionRange::FULL, false, false);
        assert_eq!(fields.shape, RangeShape::Straddling);
        assert_eq!(fields.clock, DelayFieldRange::new(1, 7));
        assert_eq!(fields.data, DelayFieldRange::new(0, 7));

        let columns = fields.columns();
        assert_eq!(positions(&columns), (0..=14).collect::<Vec<_>>());
        assert_eq!(columns[0], StrobeStep { position: 0, clock: 7, data: 0 });
        assert_eq!(columns[6], StrobeStep { position: 6, clock: 1, data: 0 });
        assert_eq!(columns[7], StrobeStep { position: 7, clock: 0, data: 0 });
        assert_eq!(columns[14], StrobeStep { position: 14, clock: 0, data: 7 });
    }

    #[test]
    fn base_delays_shift_both_bounds_by_eight() {
        let plain = map_strobe(PositionRange::FULL, false, false);
        let shifted = map_strobe(PositionRange::FULL, true, true);
        assert_eq!(shifted.clock.low, plain.clock.low + 8);
        assert_eq!(shifted.clock.high, plain.clock.high + 8);
        assert_eq!(shifted.data.low, plain.data.low + 8);
        assert_eq!(shifted.data.high, plain.data.high + 8);

        let columns = shifted.columns();
        assert_eq!(positions(&columns), (0..=14).collect::<Vec<_>>());
        assert_eq!(columns[0], StrobeStep { position: 0, clock: 15, data: 8 });
        assert_eq!(columns[7], StrobeStep { position: 7, clock: 8, data: 8 });
        assert_eq!(columns[14], StrobeStep { position: 14, clock: 8, data: 15 });
    }

    #[test]
    fn upper_strobe_range_with_data_base_delay() {
        let fields = map_strobe(range(8, 14), false, true);
        assert_eq!(fields.shape, RangeShape::AboveSplit);
        assert_eq!(fields.data, DelayFieldRange::new(9, 15));
        assert!(fields.clock.is_empty());
        assert_eq!(positions(&fields.columns()), (8..=14).collect::<Vec<_>>());
    }

    #[test]
    fn lower_strobe_range_is_clock_only() {
        let fields = map_strobe(range(2, 5), false, false);
        assert_eq!(fields.shape, RangeShape::BelowSplit);
        assert_eq!(fields.clock, DelayFieldRange::new(2, 5));
        assert!(fields.data.is_empty());
        let columns = fields.columns();
        assert_eq!(positions(&columns), vec![2, 3, 4, 5]);
        assert_eq!(columns[0].clock, 5);
        assert_eq!(columns[3].clock, 2);
    }

    #[test]
    fn single_point_at_split_is_not_empty() {
        let seven = map_strobe(range(7, 7), false, false);
        assert_eq!(seven.clock, DelayFieldRange::new(0, 0));
        assert_eq!(seven.columns().len(), 1);

        let eight = map_strobe(range(8, 8), false, false);
        assert_eq!(eight.data, DelayFieldRange::new(1, 1));
        assert_eq!(eight.columns().len(), 1);

        let eq_seven = map_eq(range(7, 7));
        assert_eq!(eq_seven.rows(), vec![EqStep { position: 7, selector1: 7, selector2: 0 }]);

        let eq_eight = map_eq(range(8, 8));
        assert_eq!(eq_eight.rows(), vec![EqStep { position: 8, selector1: 7, selector2: 1 }]);
    }

    #[test]
    fn straddling_from_seven_leaves_clock_half_empty() {
        let fields = map_strobe(range(7, 10), false, false);
        assert_eq!(fields.shape, RangeShape::Straddling);
        assert!(fields.clock.is_empty());
        assert_eq!(positions(&fields.columns()), vec![7, 8, 9, 10]);
    }

    #[test]
    fn every_strobe_range_covers_each_position_once() {
        for begin in 0..=MAX_POSITION {
            for end in begin..=MAX_POSITION {
                for (clock_base, data_base) in [(false, false), (true, false), (false, true), (true, true)] {
                    let fields = map_strobe(range(begin, end), clock_base, data_base);
                    let expected: Vec<usize> = (begin as usize..=end as usize).collect();
                    assert_eq!(positions(&fields.columns()), expected, "{begin}..={end}");
                }
            }
        }
    }

    #[test]
    fn full_eq_range_has_fifteen_rows() {
        let fields = map_eq(PositionRange::FULL);
        assert_eq!(fields.selector1, DelayFieldRange::new(0, 7));
        assert_eq!(fields.selector2, DelayFieldRange::new(1, 7));
        let rows = fields.rows();
        assert_eq!(rows.len(), 15);
        assert_eq!(rows[7], EqStep { position: 7, selector1: 7, selector2: 0 });
        assert_eq!(rows[8], EqStep { position: 8, selector1: 7, selector2: 1 });
        assert_eq!(rows[14], EqStep { position: 14, selector1: 7, selector2: 7 });
    }

    #[test]
    fn every_eq_range_covers_each_position_once() {
        for begin in 0..=MAX_POSITION {
            for end in begin..=MAX_POSITION {
                let rows = map_eq(range(begin, end)).rows();
                let got: Vec<usize> = rows.iter().map(|r| r.position).collect();
                assert_eq!(got, (begin as usize..=end as usize).collect::<Vec<_>>());
                assert!(rows.iter().all(|r| r.selector2 == 0 || r.selector1 == 7));
            }
        }
    }

    #[test]
    fn empty_range_iterates_nothing() {
        assert_eq!(DelayFieldRange::EMPTY.ascending().count(), 0);
        assert_eq!(DelayFieldRange::EMPTY.descending().count(), 0);
        assert_eq!(DelayFieldRange::EMPTY.len(), 0);
        assert_eq!(DelayFieldRange::EMPTY.shifted(true), DelayFieldRange::EMPTY);
    }
}
