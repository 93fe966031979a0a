use thiserror::Error;

/// Most points a single hand can be worth. One hand can at most reach the
/// highest configurable match target.
pub const MAX_HAND_POINTS: u32 = 500;

/// One scored hand inside the current match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandRecord {
    /// Name of the side the hand was awarded to.
    pub winner: String,
    /// Points scored by that side, always at least one.
    pub points: u32,
}

/// Errors raised by ledger mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Hand points must lie between 1 and [`MAX_HAND_POINTS`].
    #[error("hand points must be between 1 and 500, got {0}")]
    InvalidPoints(u32),
    /// The referenced hand does not exist.
    #[error("no hand at index {index}, ledger holds {len}")]
    IndexOutOfRange {
        /// Index the caller asked for.
        index: usize,
        /// Number of hands currently recorded.
        len: usize,
    },
}

/// Ordered list of the hands scored in the match currently being played.
///
/// The ledger is the only mutable scoring surface: hands are appended as they
/// are played and can be corrected or removed by index afterwards. It knows
/// nothing about who is seated; attribution to a side happens in
/// [`totals`](HandLedger::totals) against the caller-provided pairing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandLedger {
    hands: Vec<HandRecord>,
}

impl HandLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from previously recorded hands.
    pub fn restore(hands: Vec<HandRecord>) -> Self {
        Self { hands }
    }

    /// Append a hand for `winner` worth `points`.
    pub fn add_hand(&mut self, winner: String, points: u32) -> Result<(), LedgerError> {
        if points == 0 || points > MAX_HAND_POINTS {
            return Err(LedgerError::InvalidPoints(points));
        }
        self.hands.push(HandRecord { winner, points });
        Ok(())
    }

    /// Replace the hand at `index` with a corrected winner and score.
    pub fn edit_hand(
        &mut self,
        index: usize,
        winner: String,
        points: u32,
    ) -> Result<(), LedgerError> {
        if points == 0 || points > MAX_HAND_POINTS {
            return Err(LedgerError::InvalidPoints(points));
        }
        let len = self.hands.len();
        let slot = self
            .hands
            .get_mut(index)
            .ok_or(LedgerError::IndexOutOfRange { index, len })?;
        *slot = HandRecord { winner, points };
        Ok(())
    }

    /// Remove the hand at `index`. Later hands shift down by one.
    pub fn remove_hand(&mut self, index: usize) -> Result<HandRecord, LedgerError> {
        if index >= self.hands.len() {
            return Err(LedgerError::IndexOutOfRange {
                index,
                len: self.hands.len(),
            });
        }
        Ok(self.hands.remove(index))
    }

    /// Drop every recorded hand, typically after a match resolves.
    pub fn clear(&mut self) {
        self.hands.clear();
    }

    /// Recorded hands, oldest first.
    pub fn hands(&self) -> &[HandRecord] {
        &self.hands
    }

    /// Number of hands recorded so far.
    pub fn len(&self) -> usize {
        self.hands.len()
    }

    /// Whether no hand has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }

    /// Sum the scores per side of the given pairing.
    ///
    /// Attribution is binary: every hand whose winner matches `side_a` counts
    /// for the first total, everything else counts for the second. Callers
    /// guarantee at insertion time that winners name one of the two seated
    /// sides. Sums saturate at `u32::MAX` rather than wrapping.
    pub fn totals(&self, side_a: &str) -> (u32, u32) {
        self.hands.iter().fold((0, 0), |(a, b), hand| {
            if hand.winner == side_a {
                (a.saturating_add(hand.points), b)
            } else {
                (a, b.saturating_add(hand.points))
            }
        })
    }
}
