use crate::error::{Error, Result};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const ID_LENGTH: usize = 5;

/// Hands out short random photo ids drawn from `[A-Za-z0-9]`.
///
/// Candidates are checked against a caller-supplied predicate and redrawn
/// until one is free. With 62^5 possible ids the loop is unbounded unless
/// [`IdAllocator::with_max_attempts`] is set.
pub struct IdAllocator<R = StdRng> {
    rng: R,
    max_attempts: Option<usize>,
}

impl IdAllocator<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for IdAllocator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> IdAllocator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn candidate(&mut self) -> String {
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(ID_LENGTH)
            .map(char::from)
            .collect()
    }

    /// `is_taken` answers "does any existing photo already use this id?".
    pub fn allocate<F>(&mut self, mut is_taken: F) -> Result<String>
    where
        F: FnMut(&str) -> Result<bool>,
    {
        let mut attempts = 0;
        loop {
            if let Some(max) = self.max_attempts {
                if attempts >= max {
                    return Err(Error::AllocationExhausted { attempts });
                }
            }
            attempts += 1;

            let id = self.candidate();
            if !is_taken(&id)? {
                return Ok(id);
            }
            tracing::warn!("Photo id {} already taken, drawing another", id);
        }
    }
}
