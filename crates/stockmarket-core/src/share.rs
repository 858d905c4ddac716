//! The four commodities traded on the board.
//!
//! Every share has a fixed initial price, a floor of one tenth of that price,
//! a ceiling of twice that price, and a base step that scales random price moves.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::player::Money;

/// A tradeable share.
///
/// Ordering follows the board layout (LEAD, ZINC, TIN, GOLD), so `BTreeMap<Share, _>`
/// iterates in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Share {
    Lead,
    Zinc,
    Tin,
    Gold,
}

impl Share {
    /// All shares in board order.
    pub const ALL: [Share; 4] = [Share::Lead, Share::Zinc, Share::Tin, Share::Gold];

    /// Ticker symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Lead => "LEAD",
            Self::Zinc => "ZINC",
            Self::Tin => "TIN",
            Self::Gold => "GOLD",
        }
    }

    /// Company name shown by the quote API.
    pub fn company_name(&self) -> &'static str {
        match self {
            Self::Lead => "Lead Mining Consolidated",
            Self::Zinc => "Zinc Smelters Ltd",
            Self::Tin => "Tin Holdings",
            Self::Gold => "Gold Fields",
        }
    }

    /// Price at the start of a game.
    pub fn initial_price(&self) -> Money {
        match self {
            Self::Lead => 10,
            Self::Zinc => 50,
            Self::Tin => 250,
            Self::Gold => 1250,
        }
    }

    /// Price floor (1/10 of the initial price).
    pub fn min_price(&self) -> Money {
        self.initial_price() / 10
    }

    /// Default price ceiling (twice the initial price).
    pub fn max_price(&self) -> Money {
        self.initial_price() * 2
    }

    /// Unit of a single random price step.
    pub fn base_step(&self) -> Money {
        match self {
            Self::Lead => 1,
            Self::Zinc => 5,
            Self::Tin => 25,
            Self::Gold => 125,
        }
    }

    /// Map the single-letter shorthand used by the terminal grammar (L, Z, T, G).
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'L' => Some(Self::Lead),
            'Z' => Some(Self::Zinc),
            'T' => Some(Self::Tin),
            'G' => Some(Self::Gold),
            _ => None,
        }
    }
}

impl fmt::Display for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Share {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Share::ALL
            .into_iter()
            .find(|share| share.symbol() == upper)
            .ok_or_else(|| CoreError::InvalidShare(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_price_bands() {
        assert_eq!(Share::Lead.min_price(), 1);
        assert_eq!(Share::Zinc.min_price(), 5);
        assert_eq!(Share::Tin.max_price(), 500);
        assert_eq!(Share::Gold.max_price(), 2500);
        for share in Share::ALL {
            assert_eq!(share.base_step(), share.min_price());
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("gold".parse::<Share>().unwrap(), Share::Gold);
        assert_eq!(" Tin ".parse::<Share>().unwrap(), Share::Tin);
        assert!("COPPER".parse::<Share>().is_err());
    }

    #[test]
    fn test_letter_shorthand() {
        assert_eq!(Share::from_letter('l'), Some(Share::Lead));
        assert_eq!(Share::from_letter('G'), Some(Share::Gold));
        assert_eq!(Share::from_letter('X'), None);
    }

    #[test]
    fn test_serializes_as_symbol_map_key() {
        let mut prices = BTreeMap::new();
        prices.insert(Share::Zinc, 50);
        prices.insert(Share::Lead, 10);
        let json = serde_json::to_string(&prices).unwrap();
        assert_eq!(json, r#"{"LEAD":10,"ZINC":50}"#);
    }
}
