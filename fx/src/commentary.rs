//! Templated market commentary.
//!
//! Deterministic stand-in for generated analysis. Output depends only on the
//! pair and the rate, so it is always available when the commentary model is
//! not.

use std::fmt;

use fxbrief_common::{Currency, CurrencyPair};
use rust_decimal::Decimal;

/// Qualitative strength of a currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
    Neutral,
}

impl Strength {
    pub fn label(&self) -> &'static str {
        match self {
            Strength::Strong => "strong",
            Strength::Moderate => "moderate",
            Strength::Weak => "weak",
            Strength::Neutral => "neutral",
        }
    }
}

/// Static description of a currency used by the template.
#[derive(Debug, Clone, Copy)]
pub struct CurrencyProfile {
    pub strength: Strength,
    pub drivers: [&'static str; 3],
}

/// Profile used for any code not in [`PROFILES`].
pub const DEFAULT_PROFILE: CurrencyProfile = CurrencyProfile {
    strength: Strength::Neutral,
    drivers: ["interest rates", "economic data", "geopolitical factors"],
};

/// Known currency profiles.
pub const PROFILES: &[(&str, CurrencyProfile)] = &[
    (
        "USD",
        CurrencyProfile {
            strength: Strength::Strong,
            drivers: ["Federal Reserve policy", "labor market data", "safe-haven demand"],
        },
    ),
    (
        "EUR",
        CurrencyProfile {
            strength: Strength::Moderate,
            drivers: ["ECB rate guidance", "eurozone growth", "energy prices"],
        },
    ),
    (
        "GBP",
        CurrencyProfile {
            strength: Strength::Moderate,
            drivers: ["Bank of England decisions", "UK inflation", "trade balance"],
        },
    ),
    (
        "JPY",
        CurrencyProfile {
            strength: Strength::Weak,
            drivers: ["Bank of Japan yield control", "carry trade flows", "import costs"],
        },
    ),
    (
        "CHF",
        CurrencyProfile {
            strength: Strength::Strong,
            drivers: ["SNB intervention", "safe-haven flows", "low inflation"],
        },
    ),
    (
        "CAD",
        CurrencyProfile {
            strength: Strength::Moderate,
            drivers: ["crude oil prices", "Bank of Canada policy", "US trade ties"],
        },
    ),
    (
        "AUD",
        CurrencyProfile {
            strength: Strength::Moderate,
            drivers: ["commodity exports", "RBA policy", "Chinese demand"],
        },
    ),
    (
        "CNY",
        CurrencyProfile {
            strength: Strength::Moderate,
            drivers: ["PBOC fixings", "export activity", "capital controls"],
        },
    ),
    (
        "INR",
        CurrencyProfile {
            strength: Strength::Weak,
            drivers: ["RBI intervention", "oil import bill", "foreign portfolio flows"],
        },
    ),
];

/// Look up the profile for a currency.
pub fn profile(currency: &Currency) -> &'static CurrencyProfile {
    PROFILES
        .iter()
        .find(|(code, _)| *code == currency.code())
        .map(|(_, profile)| profile)
        .unwrap_or(&DEFAULT_PROFILE)
}

/// Direction implied by the rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Strengthening,
    Weakening,
}

impl Trend {
    pub fn from_rate(rate: Decimal) -> Self {
        if rate > Decimal::ONE {
            Trend::Strengthening
        } else {
            Trend::Weakening
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Strengthening => write!(f, "strengthening"),
            Trend::Weakening => write!(f, "weakening"),
        }
    }
}

/// Near-term outlook for the base currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outlook {
    Bullish,
    Neutral,
}

impl Outlook {
    pub fn for_profiles(base: &CurrencyProfile, target: &CurrencyProfile) -> Self {
        if base.strength == Strength::Strong && target.strength != Strength::Strong {
            Outlook::Bullish
        } else {
            Outlook::Neutral
        }
    }
}

impl fmt::Display for Outlook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outlook::Bullish => write!(f, "bullish"),
            Outlook::Neutral => write!(f, "neutral"),
        }
    }
}

/// Compose templated commentary for a pair at a rate.
pub fn synthesize(pair: &CurrencyPair, rate: Decimal) -> String {
    let base = profile(&pair.base);
    let target = profile(&pair.target);
    let trend = Trend::from_rate(rate);
    let outlook = Outlook::for_profiles(base, target);

    format!(
        "The {base_code} is {trend} against the {target_code} at {rate}. \
         {base_code} ({base_strength}) continues to take direction from {b0} and {b1}, \
         while {target_code} ({target_strength}) is shaped by {t0} and {t1}. \
         Central bank messaging on both sides remains the key swing factor for the pair. \
         Technically, the {base_code}/{target_code} outlook is {outlook}, \
         with traders watching recent ranges for confirmation.",
        base_code = pair.base,
        target_code = pair.target,
        base_strength = base.strength.label(),
        target_strength = target.strength.label(),
        b0 = base.drivers[0],
        b1 = base.drivers[1],
        t0 = target.drivers[0],
        t1 = target.drivers[1],
    )
}
