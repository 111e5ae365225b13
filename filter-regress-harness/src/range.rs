//! Value and range specifications for syscall numbers and arguments.

use crate::error::Error;
use crate::execution::Toolchain;
use crate::trace_categories;
use std::fmt::Display;
use std::ops::RangeInclusive;

/// Token used in argument fields to mark an argument that is not passed at all.
pub const ABSENT_TOKEN: &str = "N";

/// A closed numeric interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    /// Inclusive lower bound.
    pub low: u64,
    /// Inclusive upper bound.
    pub high: u64,
}

impl Range {
    /// Returns whether the range covers exactly one value.
    pub const fn is_single(&self) -> bool {
        self.low == self.high
    }

    /// Returns the number of values covered by the range.
    pub fn count(&self) -> u128 {
        u128::from(self.high - self.low) + 1
    }
}

/// Specification for one syscall or argument field of a bpf-sim record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueSpec {
    /// A single token, passed to the simulator verbatim.
    Literal(String),
    /// A `low-high` range; every value in it is simulated.
    Range(Range),
    /// The argument is omitted from the simulator invocation.
    Absent,
}

impl Display for ValueSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(token) => write!(f, "{token}"),
            Self::Range(range) if range.is_single() => write!(f, "{}", range.low),
            Self::Range(range) => write!(f, "{}-{}", range.low, range.high),
            Self::Absent => write!(f, "{ABSENT_TOKEN}"),
        }
    }
}

impl ValueSpec {
    /// Returns whether expanding this spec yields more than one value.
    pub const fn is_expanding(&self) -> bool {
        matches!(self, Self::Range(range) if !range.is_single())
    }

    /// Returns the number of values this spec expands to. Absent and literal
    /// specs count as one.
    pub fn cardinality(&self) -> u128 {
        match self {
            Self::Range(range) => range.count(),
            Self::Literal(_) | Self::Absent => 1,
        }
    }

    /// Returns an iterator over the concrete values of this spec, in ascending
    /// order. An absent spec yields a single `None`.
    pub fn values(&self) -> AxisValues {
        let inner = match self {
            Self::Literal(token) => AxisIter::Once(Some(Some(token.clone()))),
            Self::Range(range) => AxisIter::Span(range.low..=range.high),
            Self::Absent => AxisIter::Once(Some(None)),
        };

        AxisValues { inner }
    }
}

/// Iterator over the concrete values of a [`ValueSpec`].
#[derive(Clone, Debug)]
pub struct AxisValues {
    inner: AxisIter,
}

#[derive(Clone, Debug)]
enum AxisIter {
    Once(Option<Option<String>>),
    Span(RangeInclusive<u64>),
}

impl Iterator for AxisValues {
    type Item = Option<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            AxisIter::Once(value) => value.take(),
            AxisIter::Span(span) => span.next().map(|n| Some(n.to_string())),
        }
    }
}

/// Parses a `low-high` range or a single value.
///
/// Only two runs of decimal digits joined by a dash form a range; every other
/// token (including hex literals and symbolic names) is kept as a literal.
/// A range whose low bound exceeds its high bound is rejected.
pub fn parse_value_spec(spec: &str) -> Result<ValueSpec, Error> {
    match spec.split_once('-') {
        Some((low, high)) if is_decimal(low) && is_decimal(high) => {
            let low: u64 = low
                .parse()
                .map_err(|_| Error::InvalidRange(spec.to_owned()))?;
            let high: u64 = high
                .parse()
                .map_err(|_| Error::InvalidRange(spec.to_owned()))?;

            if low > high {
                return Err(Error::DescendingRange(spec.to_owned()));
            }

            Ok(ValueSpec::Range(Range { low, high }))
        }
        _ => Ok(ValueSpec::Literal(spec.to_owned())),
    }
}

/// Parses an argument field, recognizing the absent sentinel.
pub fn parse_arg_spec(spec: &str) -> Result<ValueSpec, Error> {
    if spec == ABSENT_TOKEN {
        Ok(ValueSpec::Absent)
    } else {
        parse_value_spec(spec)
    }
}

/// Result of resolving a syscall specification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The spec is numeric (or a range) and can be expanded directly.
    Resolved(ValueSpec),
    /// The resolver rejected the name; carries the outcome detail.
    Rejected(String),
}

/// Resolves a symbolic syscall name to its number through the resolver tool.
/// Numeric literals and ranges pass through untouched.
pub fn resolve_syscall<T: Toolchain + ?Sized>(
    spec: ValueSpec,
    tools: &T,
) -> Result<Resolution, Error> {
    let name = match &spec {
        ValueSpec::Literal(token) if token.parse::<i64>().is_err() => token.clone(),
        _ => return Ok(Resolution::Resolved(spec)),
    };

    let result = tools.resolve_syscall(&name)?;
    if result.exit_code != 0 {
        tracing::debug!(target: trace_categories::EXPAND, "resolver rejected '{name}' (rc={})", result.exit_code);
        return Ok(Resolution::Rejected(format!("resolver rc={}", result.exit_code)));
    }

    let resolved = result.stdout.trim();
    match resolved.parse::<i64>() {
        Ok(number) => {
            tracing::debug!(target: trace_categories::EXPAND, "resolved syscall '{name}' => {number}");
            Ok(Resolution::Resolved(ValueSpec::Literal(number.to_string())))
        }
        Err(_) => Ok(Resolution::Rejected(format!(
            "resolver returned '{resolved}'"
        ))),
    }
}

fn is_decimal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
