use std::fmt;

use serde::{Deserialize, Serialize};

/// The lookup key of a discount request.
///
/// All five fields are expected to be non-empty; [`DiscountService`](crate::DiscountService)
/// rejects empty ones before evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountRequest {
    pub country: String,
    pub state: String,
    pub city: String,
    pub loyalty_tier: String,
    pub loyalty_period: String,
}

impl DiscountRequest {
    #[must_use]
    pub fn new(
        country: impl Into<String>,
        state: impl Into<String>,
        city: impl Into<String>,
        loyalty_tier: impl Into<String>,
        loyalty_period: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into(),
            state: state.into(),
            city: city.into(),
            loyalty_tier: loyalty_tier.into(),
            loyalty_period: loyalty_period.into(),
        }
    }

    /// Read one field by name.
    #[must_use]
    pub fn get(&self, field: RequestField) -> &str {
        match field {
            RequestField::Country => &self.country,
            RequestField::State => &self.state,
            RequestField::City => &self.city,
            RequestField::LoyaltyTier => &self.loyalty_tier,
            RequestField::LoyaltyPeriod => &self.loyalty_period,
        }
    }
}

/// The output record populated by firing rules. Fields stay `None` until a
/// rule writes them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiscountResponse {
    #[serde(rename = "conversionRateUSD")]
    pub conversion_rate_usd: Option<String>,
    #[serde(rename = "discountPercentage")]
    pub discount_percentage: Option<String>,
}

impl DiscountResponse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite one field. Later writes win.
    pub fn set(&mut self, field: ResponseField, value: &str) {
        let slot = match field {
            ResponseField::ConversionRateUsd => &mut self.conversion_rate_usd,
            ResponseField::DiscountPercentage => &mut self.discount_percentage,
        };
        *slot = Some(value.to_owned());
    }

    #[must_use]
    pub fn get(&self, field: ResponseField) -> Option<&str> {
        match field {
            ResponseField::ConversionRateUsd => self.conversion_rate_usd.as_deref(),
            ResponseField::DiscountPercentage => self.discount_percentage.as_deref(),
        }
    }
}

/// Request fields a condition column can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestField {
    Country,
    State,
    City,
    LoyaltyTier,
    LoyaltyPeriod,
}

impl RequestField {
    pub const ALL: [RequestField; 5] = [
        RequestField::Country,
        RequestField::State,
        RequestField::City,
        RequestField::LoyaltyTier,
        RequestField::LoyaltyPeriod,
    ];

    /// The name used in sheet templates and on the wire.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            RequestField::Country => "country",
            RequestField::State => "state",
            RequestField::City => "city",
            RequestField::LoyaltyTier => "loyaltyTier",
            RequestField::LoyaltyPeriod => "loyaltyPeriod",
        }
    }

    /// Case-insensitive lookup by template name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }
}

/// Response fields an action column can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseField {
    ConversionRateUsd,
    DiscountPercentage,
}

impl ResponseField {
    pub const ALL: [ResponseField; 2] = [
        ResponseField::ConversionRateUsd,
        ResponseField::DiscountPercentage,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ResponseField::ConversionRateUsd => "conversionRateUSD",
            ResponseField::DiscountPercentage => "discountPercentage",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for RequestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for ResponseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
