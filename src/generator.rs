use rand::{rngs::OsRng, Rng, RngCore};

use crate::{error::GenerationExhausted, models};

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Shortest code the generator will produce. Six base-62 characters is
/// roughly 35 bits of entropy.
pub const MIN_CODE_LENGTH: usize = 6;
pub const DEFAULT_CODE_LENGTH: usize = 7;
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Draws random alphanumeric short codes that are not already taken.
///
/// Pure: it never touches storage. The caller passes in the current store
/// and is responsible for inserting the result under the same lock.
#[derive(Debug, Clone, Copy)]
pub struct CodeGenerator {
    length: usize,
    max_attempts: usize,
}

impl CodeGenerator {
    /// `length` is raised to [`MIN_CODE_LENGTH`] if smaller.
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(MIN_CODE_LENGTH),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Draw a code from the OS random source that is not in `existing`.
    pub fn generate(&self, existing: &models::LinkStore) -> Result<String, GenerationExhausted> {
        self.generate_with(&mut OsRng, |code| existing.contains(code))
    }

    /// Draw with an explicit random source; `is_taken` reports collisions.
    /// Reserved route names count as taken.
    pub fn generate_with<R, F>(
        &self,
        rng: &mut R,
        is_taken: F,
    ) -> Result<String, GenerationExhausted>
    where
        R: RngCore,
        F: Fn(&str) -> bool,
    {
        for attempt in 1..=self.max_attempts {
            let code = random_code(rng, self.length);
            if !is_taken(&code) && !models::is_reserved(&code) {
                return Ok(code);
            }
            tracing::debug!("Generated short code collided (attempt {})", attempt);
        }

        tracing::warn!(
            "Gave up generating a short code after {} attempts",
            self.max_attempts
        );
        Err(GenerationExhausted {
            attempts: self.max_attempts,
        })
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_LENGTH)
    }
}

/// Generate a random alphanumeric string of the given length.
fn random_code<R: RngCore>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LinkEntry, LinkStore};
    use rand::rngs::mock::StepRng;

    #[test]
    fn codes_have_configured_length_and_alphabet() {
        let generator = CodeGenerator::new(9);
        let code = generator.generate(&LinkStore::new()).unwrap();
        assert_eq!(code.len(), 9);
        assert!(code.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn length_is_clamped_to_minimum() {
        assert_eq!(CodeGenerator::new(2).length(), MIN_CODE_LENGTH);
        assert_eq!(CodeGenerator::default().length(), DEFAULT_CODE_LENGTH);
    }

    #[test]
    fn never_returns_an_existing_code() {
        let generator = CodeGenerator::new(MIN_CODE_LENGTH);
        let mut store = LinkStore::new();

        for _ in 0..500 {
            let code = generator.generate(&store).unwrap();
            assert!(!store.contains(&code));
            store.insert(
                code,
                LinkEntry {
                    url: "https://example.com".into(),
                    created_at: None,
                },
            );
        }
        assert_eq!(store.len(), 500);
    }

    #[test]
    fn constant_source_exhausts_after_bounded_attempts() {
        let generator = CodeGenerator {
            length: 7,
            max_attempts: 4,
        };
        let mut rng = StepRng::new(0, 0);

        let first = generator.generate_with(&mut rng, |_| false).unwrap();
        assert_eq!(first, "aaaaaaa");

        let calls = std::cell::Cell::new(0);
        let err = generator
            .generate_with(&mut rng, |code| {
                calls.set(calls.get() + 1);
                code == first
            })
            .unwrap_err();
        assert_eq!(err, GenerationExhausted { attempts: 4 });
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn skips_taken_codes_until_free() {
        let generator = CodeGenerator::new(MIN_CODE_LENGTH);
        let taken = std::cell::RefCell::new(Vec::new());

        // Reject the first two draws; the third must be accepted.
        let code = generator
            .generate_with(&mut OsRng, |code| {
                let mut taken = taken.borrow_mut();
                taken.push(code.to_owned());
                taken.len() <= 2
            })
            .unwrap();

        let taken = taken.into_inner();
        assert_eq!(taken.len(), 3);
        assert_eq!(taken[2], code);
    }
}
