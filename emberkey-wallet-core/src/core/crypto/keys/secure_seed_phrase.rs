use zeroize::Zeroizing;

/// Mnemonic held in zeroizing memory
pub struct SecureSeedPhrase {
    phrase: Zeroizing<String>,
}

impl SecureSeedPhrase {
    /// Create a new secure seed phrase, collapsing whitespace
    pub fn new(phrase: &str) -> Self {
        let normalized = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
        Self {
            phrase: Zeroizing::new(normalized),
        }
    }

    /// Get the seed phrase as a &str
    pub fn as_str(&self) -> &str {
        &self.phrase
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.phrase.split(' ')
    }

    pub fn word_count(&self) -> usize {
        self.words().count()
    }
}

impl std::fmt::Debug for SecureSeedPhrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureSeedPhrase({} words)", self.word_count())
    }
}
