use crate::error::ConfigError;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Largest block a single read may request (1 GiB)
pub const MAX_BLOCK_SIZE: u64 = 1 << 30;

/// Matches: 512, 64K, 1M, 1mb, 1G
static BLOCK_SIZE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)([KMGT])?B?$").expect("Invalid block size regex")
});

/// Chunk size used per read, with a magnitude suffix (K/M/G/T, binary multiples)
///
/// The text form is kept as the user wrote it so progress lines echo it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSize {
    bytes: u64,
    text: String,
}

impl BlockSize {
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self {
            bytes: 1 << 20,
            text: "1M".to_string(),
        }
    }
}

impl FromStr for BlockSize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = |reason: &str| ConfigError::InvalidBlockSize {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let caps = BLOCK_SIZE_REGEX
            .captures(text)
            .ok_or_else(|| invalid("expected a number with an optional K, M, G or T suffix"))?;

        let count: u64 = caps[1].parse().map_err(|_| invalid("number is too large"))?;
        let shift = match caps.get(2).map(|m| m.as_str().to_ascii_uppercase()) {
            None => 0,
            Some(unit) => match unit.as_str() {
                "K" => 10,
                "M" => 20,
                "G" => 30,
                _ => 40,
            },
        };

        let bytes = count
            .checked_mul(1u64 << shift)
            .ok_or_else(|| invalid("number is too large"))?;

        if bytes == 0 {
            return Err(invalid("must be greater than zero"));
        }
        if bytes > MAX_BLOCK_SIZE {
            return Err(invalid("must not exceed 1G"));
        }

        Ok(Self {
            bytes,
            text: text.to_string(),
        })
    }
}

impl fmt::Display for BlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
