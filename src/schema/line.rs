use serde::{Deserialize, Serialize};

/// Shared time unit for every delay in the engine.
pub type Millis = u64;

/// One unit of narrative text with its timing metadata.
///
/// `text` may embed inline markup (`<b>`, `<u>`, `<echo>` …). The animator
/// reveals tags atomically, so a surface never shows half a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub text: String,
    /// Wait before the first character appears.
    #[serde(default)]
    pub pre_delay: Millis,
    /// Wait between characters. Zero writes the whole line at once.
    #[serde(default)]
    pub char_delay: Millis,
    /// Survives a transient clear.
    #[serde(default)]
    pub persistent: bool,
    /// Formatting hint for renderers.
    #[serde(default)]
    pub newline: bool,
}

/// Ordered lines submitted together.
pub type Sequence = Vec<Line>;

impl Line {
    /// A line that appears immediately and in full.
    pub fn instant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pre_delay: 0,
            char_delay: 0,
            persistent: false,
            newline: false,
        }
    }

    /// A line typed out one character every `char_delay`.
    pub fn typed(text: impl Into<String>, char_delay: Millis) -> Self {
        Self {
            char_delay,
            ..Self::instant(text)
        }
    }

    pub fn after(mut self, pre_delay: Millis) -> Self {
        self.pre_delay = pre_delay;
        self
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_timing() {
        let line = Line::typed("Hello.", 50).after(1000).persistent();
        assert_eq!(line.char_delay, 50);
        assert_eq!(line.pre_delay, 1000);
        assert!(line.persistent);
    }

    #[test]
    fn ron_defaults_missing_fields() {
        let line: Line = ron::from_str(r#"(text: "<u>start</u> day", char_delay: 100)"#).unwrap();
        assert_eq!(line.text, "<u>start</u> day");
        assert_eq!(line.pre_delay, 0);
        assert_eq!(line.char_delay, 100);
        assert!(!line.persistent);
    }
}
