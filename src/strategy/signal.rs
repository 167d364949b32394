//! Contrarian dashboard signal.
//!
//! Extreme fear is a buy, extreme greed is a sell, everything in between
//! is observe-only.

use serde::Serialize;
use std::fmt;

pub const EXTREME_FEAR: u8 = 20;
pub const EXTREME_GREED: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContrarianSignal {
    ContrarianBuy,
    ContrarianSell,
    Neutral,
}

impl ContrarianSignal {
    pub fn from_score(score: u8) -> Self {
        if score < EXTREME_FEAR {
            ContrarianSignal::ContrarianBuy
        } else if score > EXTREME_GREED {
            ContrarianSignal::ContrarianSell
        } else {
            ContrarianSignal::Neutral
        }
    }
}

impl fmt::Display for ContrarianSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContrarianSignal::ContrarianBuy => write!(f, "Contrarian BUY (Extreme Fear)"),
            ContrarianSignal::ContrarianSell => write!(f, "Contrarian SELL (Extreme Greed)"),
            ContrarianSignal::Neutral => write!(f, "Neutral / Observe"),
        }
    }
}
