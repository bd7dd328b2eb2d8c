use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    En,
    #[default]
    Ru,
    Kg,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::Ru, Language::Kg];

    /// Falls back to Russian, the site default, for anything unrecognised.
    pub fn from_optional_str(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or_default()
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "en" | "en-us" | "en-gb" | "english" => Some(Self::En),
            "ru" | "ru-ru" | "russian" | "русский" => Some(Self::Ru),
            "kg" | "ky" | "ky-kg" | "kyrgyz" | "кыргызча" => Some(Self::Kg),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ru => "ru",
            Self::Kg => "kg",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Ru => "Русский",
            Self::Kg => "Кыргызча",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleCategory {
    #[default]
    Sedan,
    Minivan,
    Suv,
    Premium,
    Sprinter,
}

impl VehicleCategory {
    pub const ALL: [VehicleCategory; 5] = [
        VehicleCategory::Sedan,
        VehicleCategory::Minivan,
        VehicleCategory::Suv,
        VehicleCategory::Premium,
        VehicleCategory::Sprinter,
    ];

    pub fn capacity(self) -> u8 {
        match self {
            Self::Sedan => 4,
            Self::Minivan => 7,
            Self::Suv => 4,
            Self::Premium => 4,
            Self::Sprinter => 18,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Sedan => "sedan",
            Self::Minivan => "minivan",
            Self::Suv => "suv",
            Self::Premium => "premium",
            Self::Sprinter => "sprinter",
        }
    }

    /// Dictionary key of the display title, e.g. `vehicles.sedan_title`.
    pub fn title_key(self) -> String {
        format!("vehicles.{}_title", self.as_code())
    }

    /// Clamps a requested passenger count into `[1, capacity]`.
    pub fn clamp_passengers(self, requested: i64) -> u8 {
        requested.clamp(1, i64::from(self.capacity())) as u8
    }
}

impl FromStr for VehicleCategory {
    type Err = crate::wizard::FieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "sedan" => Ok(Self::Sedan),
            "minivan" => Ok(Self::Minivan),
            "suv" => Ok(Self::Suv),
            "premium" => Ok(Self::Premium),
            "sprinter" => Ok(Self::Sprinter),
            _ => Err(crate::wizard::FieldError::UnknownCategory(value.to_string())),
        }
    }
}

impl fmt::Display for VehicleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Partial JSON drafts fill the gaps from `Default`, so missing fields surface
/// as validation errors rather than parse failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BookingDraft {
    pub from: String,
    pub to: String,
    pub date: String,
    pub time: String,
    #[serde(deserialize_with = "lenient_passenger_count")]
    pub passenger_count: u8,
    pub vehicle_category: VehicleCategory,
    pub full_name: String,
    pub phone: String,
    pub notes: String,
}

impl Default for BookingDraft {
    fn default() -> Self {
        Self {
            from: String::new(),
            to: String::new(),
            date: String::new(),
            time: String::new(),
            passenger_count: 1,
            vehicle_category: VehicleCategory::Sedan,
            full_name: String::new(),
            phone: String::new(),
            notes: String::new(),
        }
    }
}

/// Accepts any integer or numeric string. Values outside `u8` saturate so the
/// wizard can still clamp them into the category's bounds.
fn lenient_passenger_count<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCount {
        Number(i64),
        Text(String),
    }

    let requested = match RawCount::deserialize(deserializer)? {
        RawCount::Number(value) => value,
        RawCount::Text(text) => text.trim().parse::<i64>().map_err(|_| {
            serde::de::Error::custom(format!(
                "passenger count must be a whole number, got `{text}`"
            ))
        })?,
    };
    Ok(requested.clamp(0, i64::from(u8::MAX)) as u8)
}

impl BookingDraft {
    pub fn seeded(seed: RouteSeed) -> Self {
        Self {
            from: seed.from,
            to: seed.to,
            ..Self::default()
        }
    }

    pub fn notes(&self) -> Option<&str> {
        let trimmed = self.notes.trim();
        (!trimmed.is_empty()).then_some(self.notes.as_str())
    }
}

/// Origin and destination carried over from a route selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSeed {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Journey,
    Vehicle,
    Personal,
}

impl WizardStep {
    pub const ALL: [WizardStep; 3] = [WizardStep::Journey, WizardStep::Vehicle, WizardStep::Personal];

    pub fn number(self) -> u8 {
        match self {
            Self::Journey => 1,
            Self::Vehicle => 2,
            Self::Personal => 3,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::Journey),
            2 => Some(Self::Vehicle),
            3 => Some(Self::Personal),
            _ => None,
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        self.number().checked_sub(1).and_then(Self::from_number)
    }

    pub fn is_final(self) -> bool {
        self == Self::Personal
    }

    pub fn title_key(self) -> &'static str {
        match self {
            Self::Journey => "booking.journey_details",
            Self::Vehicle => "booking.vehicle_passengers",
            Self::Personal => "booking.personal_info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub success: bool,
    pub message: String,
}

impl SubmissionResult {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Immutable snapshot of a draft at the moment it is handed to a notifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSubmission {
    pub reference: Uuid,
    pub draft: BookingDraft,
    pub submitted_at: DateTime<Utc>,
    pub language: Language,
}

impl BookingSubmission {
    pub fn capture(draft: BookingDraft, language: Language) -> Self {
        Self::capture_at(draft, language, Utc::now())
    }

    pub fn capture_at(draft: BookingDraft, language: Language, submitted_at: DateTime<Utc>) -> Self {
        Self {
            reference: Uuid::new_v4(),
            draft,
            submitted_at,
            language,
        }
    }

    pub fn short_reference(&self) -> String {
        self.reference.simple().to_string()[..8].to_uppercase()
    }
}
