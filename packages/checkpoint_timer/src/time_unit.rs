use std::fmt;

/// Unit in which a report displays a pair of durations.
///
/// The unit is selected from the magnitude of the average duration: a coarser unit is used once
/// the average amounts to at least 10 of that unit.
///
/// | Average (nanoseconds)        | Unit |
/// |------------------------------|------|
/// | below 10 000                 | `ns` |
/// | 10 000 up to 10 000 000      | `us` |
/// | 10 000 000 up to 10^10       | `ms` |
/// | 10^10 and above              | `s`  |
///
/// The total is always scaled by the same divisor as the average, so both values printed next
/// to a unit are in that unit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum TimeUnit {
    /// Nanoseconds.
    Nanoseconds,

    /// Microseconds.
    Microseconds,

    /// Milliseconds.
    Milliseconds,

    /// Seconds.
    Seconds,
}

/// A coarser unit is selected once a value is at least this many of that unit.
const MIN_VALUE_IN_UNIT: u64 = 10;

impl TimeUnit {
    /// Selects the unit for displaying `average_nanos`.
    #[must_use]
    pub fn select(average_nanos: u64) -> Self {
        [Self::Seconds, Self::Milliseconds, Self::Microseconds]
            .into_iter()
            .find(|unit| average_nanos >= unit.nanos().saturating_mul(MIN_VALUE_IN_UNIT))
            .unwrap_or(Self::Nanoseconds)
    }

    /// The number of nanoseconds in one of this unit.
    #[must_use]
    pub const fn nanos(self) -> u64 {
        match self {
            Self::Nanoseconds => 1,
            Self::Microseconds => 1_000,
            Self::Milliseconds => 1_000_000,
            Self::Seconds => 1_000_000_000,
        }
    }

    /// Converts nanoseconds to whole units of `self`, discarding the remainder.
    #[must_use]
    #[expect(
        clippy::integer_division,
        reason = "we accept that we lose the remainder - the unit is chosen to keep it small"
    )]
    #[expect(
        clippy::arithmetic_side_effects,
        reason = "the divisor is a non-zero constant"
    )]
    pub const fn scale(self, nanos: u64) -> u64 {
        nanos / self.nanos()
    }

    /// Short ASCII symbol of the unit.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Nanoseconds => "ns",
            Self::Microseconds => "us",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// An average and a total duration scaled to a shared display unit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ScaledDurations {
    unit: TimeUnit,
    average: u64,
    total: u64,
}

impl ScaledDurations {
    /// Selects the unit from `average_nanos` and scales both values by it.
    #[must_use]
    pub fn new(average_nanos: u64, total_nanos: u64) -> Self {
        let unit = TimeUnit::select(average_nanos);

        Self {
            unit,
            average: unit.scale(average_nanos),
            total: unit.scale(total_nanos),
        }
    }

    /// The unit both values are expressed in.
    #[must_use]
    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// The average, in [`unit()`](Self::unit).
    #[must_use]
    pub fn average(&self) -> u64 {
        self.average
    }

    /// The total, in [`unit()`](Self::unit).
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }
}

impl fmt::Display for ScaledDurations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Time [Unit,Avg,Total] = [{}, {}, {}]",
            self.unit, self.average, self.total
        )
    }
}
