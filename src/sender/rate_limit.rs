use std::time::Duration;

/// Bit budget for the current second of a send session. Seconds are counted from the session
///  start, a new second begins whenever `floor(elapsed)` changes.
#[derive(Debug)]
pub struct SecondBudget {
    max_bits_per_second: f64,
    current_second: u64,
    bits_this_second: u64,
}

impl SecondBudget {
    pub fn new(max_bits_per_second: f64) -> SecondBudget {
        SecondBudget {
            max_bits_per_second,
            current_second: 0,
            bits_this_second: 0,
        }
    }

    /// Moves to the second `elapsed` falls into, clearing the budget if that is a new second.
    ///  Returns `true` if it was.
    pub fn advance_to(&mut self, elapsed: Duration) -> bool {
        let second = elapsed.as_secs();
        if second == self.current_second {
            return false;
        }
        self.current_second = second;
        self.bits_this_second = 0;
        true
    }

    /// The admission check: a frame may go out only if the budget remaining *after* it is still
    ///  strictly above what was already sent this second.
    pub fn admits(&self, frame_bits: u64) -> bool {
        (self.max_bits_per_second - frame_bits as f64) > self.bits_this_second as f64
    }

    pub fn record(&mut self, bits: u64) {
        self.bits_this_second += bits;
    }

    pub fn bits_this_second(&self) -> u64 {
        self.bits_this_second
    }
}
