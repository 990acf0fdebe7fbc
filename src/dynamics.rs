//! # Dynamics
//!
//! Velocity buckets and their dynamic symbols.
//!
//! A velocity maps to the first symbol whose upper bound it does not exceed,
//! scanning bounds in ascending order. The default bounds are
//! ppp ≤ 16, pp ≤ 32, p ≤ 63, mp ≤ 79, mf ≤ 95, f ≤ 111, ff ≤ 126, fff ≤ 127.

use std::fmt;
use std::str::FromStr;

/// Dynamic symbols, softest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dynamic {
    Ppp,
    Pp,
    P,
    Mp,
    Mf,
    F,
    Ff,
    Fff,
}

impl Dynamic {
    pub const ALL: [Dynamic; 8] = [
        Dynamic::Ppp,
        Dynamic::Pp,
        Dynamic::P,
        Dynamic::Mp,
        Dynamic::Mf,
        Dynamic::F,
        Dynamic::Ff,
        Dynamic::Fff,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Dynamic::Ppp => "ppp",
            Dynamic::Pp => "pp",
            Dynamic::P => "p",
            Dynamic::Mp => "mp",
            Dynamic::Mf => "mf",
            Dynamic::F => "f",
            Dynamic::Ff => "ff",
            Dynamic::Fff => "fff",
        }
    }
}

impl fmt::Display for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Dynamic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dynamic::ALL
            .iter()
            .copied()
            .find(|d| d.symbol() == s.trim())
            .ok_or_else(|| format!("Unknown dynamic symbol: {}", s))
    }
}

/// Upper velocity bound per dynamic symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VelocityTable {
    /// Sorted by bound, ascending
    bounds: Vec<(u8, Dynamic)>,
}

impl Default for VelocityTable {
    fn default() -> Self {
        Self::new(vec![
            (Dynamic::Ppp, 16),
            (Dynamic::Pp, 32),
            (Dynamic::P, 63),
            (Dynamic::Mp, 79),
            (Dynamic::Mf, 95),
            (Dynamic::F, 111),
            (Dynamic::Ff, 126),
            (Dynamic::Fff, 127),
        ])
    }
}

impl VelocityTable {
    /// Build a table from (symbol, upper bound) pairs in any order.
    pub fn new(entries: Vec<(Dynamic, u8)>) -> Self {
        let mut bounds: Vec<(u8, Dynamic)> = entries.into_iter().map(|(d, b)| (b, d)).collect();
        bounds.sort_by_key(|(bound, _)| *bound);
        Self { bounds }
    }

    /// Symbol for a velocity, or `None` when it is above every bound.
    pub fn dynamic_for(&self, velocity: u8) -> Option<Dynamic> {
        self.bounds
            .iter()
            .find(|(bound, _)| velocity <= *bound)
            .map(|(_, dynamic)| *dynamic)
    }
}
