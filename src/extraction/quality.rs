//! Quality gate deciding whether extracted text stops the cascade.

/// Default minimum number of characters for text to be considered usable.
pub const DEFAULT_MIN_CHARS: usize = 50;

/// Length-based acceptance policy.
///
/// Text passes when its trimmed length, counted in characters, reaches the
/// configured minimum. Content is not inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityGate {
    min_chars: usize,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CHARS)
    }
}

impl QualityGate {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    /// Whether `text` is good enough to stop escalating.
    pub fn accept(&self, text: &str) -> bool {
        text.trim().chars().count() >= self.min_chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        let gate = QualityGate::new(5);
        assert!(gate.accept("abcde"));
        assert!(!gate.accept("abcd"));
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let gate = QualityGate::new(5);
        assert!(!gate.accept("   abc   \n\n"));
        assert!(gate.accept("\n  a b c  \n"));
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let gate = QualityGate::new(4);
        assert!(!gate.accept("äöü"));
        assert!(gate.accept("äöüß"));
    }

    #[test]
    fn test_default_threshold() {
        let gate = QualityGate::default();
        assert_eq!(gate.min_chars(), 50);
        assert!(!gate.accept(""));
        assert!(gate.accept(&"x".repeat(50)));
    }
}
