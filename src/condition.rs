//! Maps NEA forecast vocabulary onto a fixed set of condition codes.
//!
//! Two input shapes are handled: the two-letter abbreviations used by the
//! newer feeds (`"TL"`, `"PC"`, ...) and the free-text descriptions used by the
//! older ones (`"Thundery Showers"`, `"Partly Cloudy (Night)"`, ...). Anything
//! unrecognised is handed back untouched so callers always have something to
//! display.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionCode {
    Sunny,
    Cloudy,
    #[serde(rename = "partlycloudy")]
    PartlyCloudy,
    Rainy,
    Pouring,
    Windy,
    WindyVariant,
    Lightning,
    LightningRainy,
    Snowy,
    SnowyRainy,
    Fog,
    Hail,
    Exceptional,
    ClearNight,
}

impl ConditionCode {
    pub const ALL: [ConditionCode; 15] = [
        ConditionCode::Sunny,
        ConditionCode::Cloudy,
        ConditionCode::PartlyCloudy,
        ConditionCode::Rainy,
        ConditionCode::Pouring,
        ConditionCode::Windy,
        ConditionCode::WindyVariant,
        ConditionCode::Lightning,
        ConditionCode::LightningRainy,
        ConditionCode::Snowy,
        ConditionCode::SnowyRainy,
        ConditionCode::Fog,
        ConditionCode::Hail,
        ConditionCode::Exceptional,
        ConditionCode::ClearNight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionCode::Sunny => "sunny",
            ConditionCode::Cloudy => "cloudy",
            ConditionCode::PartlyCloudy => "partlycloudy",
            ConditionCode::Rainy => "rainy",
            ConditionCode::Pouring => "pouring",
            ConditionCode::Windy => "windy",
            ConditionCode::WindyVariant => "windy-variant",
            ConditionCode::Lightning => "lightning",
            ConditionCode::LightningRainy => "lightning-rainy",
            ConditionCode::Snowy => "snowy",
            ConditionCode::SnowyRainy => "snowy-rainy",
            ConditionCode::Fog => "fog",
            ConditionCode::Hail => "hail",
            ConditionCode::Exceptional => "exceptional",
            ConditionCode::ClearNight => "clear-night",
        }
    }
}

impl fmt::Display for ConditionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConditionCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ConditionCode::ALL
            .into_iter()
            .find(|code| code.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// Result of normalising vendor text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Normalized {
    Code(ConditionCode),
    /// Vendor text nothing matched, returned exactly as received.
    Unrecognized(String),
}

impl Normalized {
    pub fn code(&self) -> Option<ConditionCode> {
        match self {
            Normalized::Code(code) => Some(*code),
            Normalized::Unrecognized(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Normalized::Code(code) => code.as_str(),
            Normalized::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for Normalized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// NEA abbreviation table.
const SHORT_CODES: &[(&str, ConditionCode)] = &[
    ("br", ConditionCode::Fog),            // Mist
    ("cl", ConditionCode::Cloudy),         // Cloudy
    ("dr", ConditionCode::Rainy),          // Drizzle
    ("fa", ConditionCode::Sunny),          // Fair (Day)
    ("fg", ConditionCode::Fog),            // Fog
    ("fn", ConditionCode::ClearNight),     // Fair (Night)
    ("fw", ConditionCode::Sunny),          // Fair & Warm
    ("hg", ConditionCode::Pouring),        // Heavy Thundery Showers with Gusty Winds
    ("hr", ConditionCode::Pouring),        // Heavy Rain
    ("hs", ConditionCode::Pouring),        // Heavy Showers
    ("ht", ConditionCode::Pouring),        // Heavy Thundery Showers
    ("hz", ConditionCode::Fog),            // Hazy
    ("lh", ConditionCode::Fog),            // Slightly Hazy
    ("lr", ConditionCode::Rainy),          // Light Rain
    ("ls", ConditionCode::Rainy),          // Light Showers
    ("oc", ConditionCode::Cloudy),         // Overcast
    ("pc", ConditionCode::Cloudy),         // Partly Cloudy (Day)
    ("pn", ConditionCode::Cloudy),         // Partly Cloudy (Night)
    ("ps", ConditionCode::Rainy),          // Passing Showers
    ("ra", ConditionCode::Rainy),          // Moderate Rain
    ("sh", ConditionCode::Rainy),          // Showers
    ("sk", ConditionCode::Rainy),          // Strong Winds, Showers
    ("sn", ConditionCode::Snowy),          // Snow
    ("sr", ConditionCode::Rainy),          // Strong Winds, Rain
    ("ss", ConditionCode::Snowy),          // Snow Showers
    ("su", ConditionCode::Sunny),          // Sunny
    ("sw", ConditionCode::Windy),          // Strong Winds
    ("tl", ConditionCode::LightningRainy), // Thundery Showers
    ("wc", ConditionCode::WindyVariant),   // Windy, Cloudy
    ("wd", ConditionCode::Windy),          // Windy
    ("wf", ConditionCode::Windy),          // Windy, Fair
    ("wr", ConditionCode::Rainy),          // Windy, Rain
    ("ws", ConditionCode::Rainy),          // Windy, Showers
];

// First match wins. Every term of a rule must appear in the lowercased text,
// so severe phrases have to sit above the generic words they contain.
const TEXT_RULES: &[(&[&str], ConditionCode)] = &[
    (&["heavy", "thunder"], ConditionCode::Pouring),
    (&["heavy", "rain"], ConditionCode::Pouring),
    (&["heavy", "shower"], ConditionCode::Pouring),
    (&["thunder"], ConditionCode::LightningRainy),
    (&["lightning"], ConditionCode::Lightning),
    (&["hail"], ConditionCode::Hail),
    (&["sleet"], ConditionCode::SnowyRainy),
    (&["snow", "rain"], ConditionCode::SnowyRainy),
    (&["snow"], ConditionCode::Snowy),
    (&["rain"], ConditionCode::Rainy),
    // Rain outranks wind: "Windy, Showers" is rainy, not windy-variant.
    (&["shower"], ConditionCode::Rainy),
    (&["drizzle"], ConditionCode::Rainy),
    (&["wind", "cloud"], ConditionCode::WindyVariant),
    (&["wind"], ConditionCode::Windy),
    (&["mist"], ConditionCode::Fog),
    (&["fog"], ConditionCode::Fog),
    (&["haz"], ConditionCode::Fog),
    (&["partly cloudy"], ConditionCode::PartlyCloudy),
    (&["cloud"], ConditionCode::Cloudy),
    (&["overcast"], ConditionCode::Cloudy),
    (&["fair", "night"], ConditionCode::ClearNight),
    (&["clear", "night"], ConditionCode::ClearNight),
    (&["fair"], ConditionCode::Sunny),
    (&["sunny"], ConditionCode::Sunny),
    (&["clear"], ConditionCode::Sunny),
];

fn is_short_code(text: &str) -> bool {
    text.len() == 2 && text.chars().all(|c| c.is_ascii_alphabetic())
}

/// Looks up a two-letter NEA abbreviation.
pub fn from_short_code(code: &str) -> Option<ConditionCode> {
    let code = code.trim();
    SHORT_CODES
        .iter()
        .find(|(short, _)| short.eq_ignore_ascii_case(code))
        .map(|(_, condition)| *condition)
}

/// Classifies a free-text description.
pub fn from_text(text: &str) -> Option<ConditionCode> {
    let text = text.to_lowercase();
    TEXT_RULES
        .iter()
        .find(|(terms, _)| terms.iter().all(|term| text.contains(term)))
        .map(|(_, condition)| *condition)
}

/// Normalises a short code or free-text description.
pub fn normalize(input: &str) -> Normalized {
    let trimmed = input.trim();
    if let Ok(code) = trimmed.parse::<ConditionCode>() {
        return Normalized::Code(code);
    }

    let found = if is_short_code(trimmed) {
        from_short_code(trimmed)
    } else {
        from_text(trimmed)
    };

    match found {
        Some(code) => Normalized::Code(code),
        None => {
            debug!(input, "unrecognised vendor condition, passing through");
            Normalized::Unrecognized(input.to_string())
        }
    }
}
