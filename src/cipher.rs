//! The Mango Cipher: a fixed mapping from fruit words to digits

/// Every word the cipher knows, paired with its digit
pub const MANGO_CIPHER: [(&str, u8); 10] = [
    ("mango", 0),
    ("apple", 1),
    ("banana", 2),
    ("orange", 3),
    ("grape", 4),
    ("peach", 5),
    ("cherry", 6),
    ("lemon", 7),
    ("berry", 8),
    ("melon", 9),
];

/// Read-only view over the cipher table.
///
/// The table is a compile-time constant, so a `CipherTable` is free to copy
/// and safe to share between any number of concurrent requests.
#[derive(Debug, Clone, Copy)]
pub struct CipherTable {
    entries: &'static [(&'static str, u8)],
}

impl Default for CipherTable {
    fn default() -> Self {
        Self {
            entries: &MANGO_CIPHER,
        }
    }
}

impl CipherTable {
    /// Create a view over the built-in table
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an already-normalised word
    pub fn lookup(&self, word: &str) -> Option<u8> {
        self.entries
            .iter()
            .find(|(known, _)| *known == word)
            .map(|(_, digit)| *digit)
    }

    /// Lowercase `word` and look it up.
    ///
    /// Returns the normalised word alongside the result so callers can echo
    /// exactly what was searched for.
    pub fn decode(&self, word: &str) -> (String, Option<u8>) {
        let normalised = word.to_lowercase();
        let digit = self.lookup(&normalised);
        (normalised, digit)
    }

    /// All known words in table order
    pub fn words(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(word, _)| *word)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
