//! Position arithmetic for the dense, 0-based question order of a survey.
//!
//! Stores read the current positions inside their transaction, ask this
//! module which rows have to move, and apply the returned [`Shift`].

use thiserror::Error;

/// Every position in `first..=last` moves by `delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub first: i32,
    pub last: i32,
    pub delta: i32,
}

impl Shift {
    pub fn contains(&self, position: i32) -> bool {
        (self.first..=self.last).contains(&position)
    }

    pub fn apply(&self, position: i32) -> i32 {
        if self.contains(position) {
            position + self.delta
        } else {
            position
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("index {requested} is outside of 0..{count}")]
pub struct OutOfRange {
    pub requested: i32,
    pub count: i32,
}

/// Position for a question appended after the existing ones.
pub fn next_position<I>(positions: I) -> i32
where
    I: IntoIterator<Item = i32>,
{
    positions.into_iter().max().map_or(0, |max| max + 1)
}

/// Shift that closes the gap left by deleting the question at `removed`.
pub fn closing_gap(removed: i32) -> Shift {
    Shift {
        first: removed + 1,
        last: i32::MAX,
        delta: -1,
    }
}

/// Shift applied to the other questions when the one at `from` moves to `to`.
///
/// `Ok(None)` means nothing moves. The moved question itself is never inside
/// the returned range.
pub fn plan_move(from: i32, to: i32, count: i32) -> Result<Option<Shift>, OutOfRange> {
    if to < 0 || to >= count {
        return Err(OutOfRange {
            requested: to,
            count,
        });
    }
    let shift = match from.cmp(&to) {
        std::cmp::Ordering::Equal => return Ok(None),
        std::cmp::Ordering::Less => Shift {
            first: from + 1,
            last: to,
            delta: -1,
        },
        std::cmp::Ordering::Greater => Shift {
            first: to,
            last: from - 1,
            delta: 1,
        },
    };
    Ok(Some(shift))
}
