use std::fmt;

/// Text content of one decoded symbol.
///
/// Compared byte for byte: no trimming, no case folding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecodedPayload(String);

impl DecodedPayload {
    pub fn new(content: impl Into<String>) -> Self {
        Self(content.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DecodedPayload {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for DecodedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
