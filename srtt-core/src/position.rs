use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stimulus location, stored 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Position(usize);

impl Position {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }

    /// 1-based number, as shown to participants and written to the log.
    pub const fn number(self) -> usize {
        self.0 + 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Maps response symbols to positions: symbol `i` answers position `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyMap {
    symbols: Vec<char>,
}

impl KeyMap {
    /// Number row, `1` for the leftmost position and `0` for the tenth.
    pub const DIGITS: &'static str = "1234567890";
    /// Bottom letter row, used by the reduced eight-position variant.
    pub const BOTTOM_ROW: &'static str = "zxcvbnm,";

    pub fn new(symbols: &str) -> Result<Self, ConfigError> {
        let symbols: Vec<char> = symbols.chars().map(|c| c.to_ascii_lowercase()).collect();
        if symbols.is_empty() {
            return Err(ConfigError::EmptyKeyMap);
        }
        for (i, c) in symbols.iter().enumerate() {
            if symbols[..i].contains(c) {
                return Err(ConfigError::DuplicateKey(*c));
            }
        }
        Ok(Self { symbols })
    }

    pub fn digits() -> Self {
        Self {
            symbols: Self::DIGITS.chars().collect(),
        }
    }

    pub fn bottom_row() -> Self {
        Self {
            symbols: Self::BOTTOM_ROW.chars().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// `None` for symbols outside the table; those are not responses at all.
    pub fn lookup(&self, symbol: char) -> Option<Position> {
        let symbol = symbol.to_ascii_lowercase();
        self.symbols
            .iter()
            .position(|&c| c == symbol)
            .map(Position::new)
    }

    pub fn symbol_for(&self, position: Position) -> Option<char> {
        self.symbols.get(position.index()).copied()
    }

    /// Fails when there are fewer symbols than positions to answer.
    pub fn check_covers(&self, position_count: usize) -> Result<(), ConfigError> {
        if self.symbols.len() < position_count {
            return Err(ConfigError::KeyMapTooSmall {
                keys: self.symbols.len(),
                positions: position_count,
            });
        }
        Ok(())
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::digits()
    }
}

impl TryFrom<String> for KeyMap {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<KeyMap> for String {
    fn from(map: KeyMap) -> Self {
        map.symbols.into_iter().collect()
    }
}
