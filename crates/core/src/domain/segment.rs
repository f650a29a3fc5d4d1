use serde::{Deserialize, Serialize};

pub const UNKNOWN_SEGMENT: &str = "Unknown";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    RegularBuyer,
    AtRiskCustomer,
    HighValueCustomer,
    OccasionalShopper,
}

impl Segment {
    pub const ALL: [Segment; 4] = [
        Segment::RegularBuyer,
        Segment::AtRiskCustomer,
        Segment::HighValueCustomer,
        Segment::OccasionalShopper,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Segment::RegularBuyer => "Regular Buyer",
            Segment::AtRiskCustomer => "At-Risk Customer",
            Segment::HighValueCustomer => "High-Value Customer",
            Segment::OccasionalShopper => "Occasional Shopper",
        }
    }
}

impl std::str::FromStr for Segment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "regularbuyer" => Ok(Self::RegularBuyer),
            "atriskcustomer" => Ok(Self::AtRiskCustomer),
            "highvaluecustomer" => Ok(Self::HighValueCustomer),
            "occasionalshopper" => Ok(Self::OccasionalShopper),
            _ => Err(format!("unknown segment label `{}`", value.trim())),
        }
    }
}

/// Recency, frequency and monetary summary for one customer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RfmFeatures {
    /// Days since the last purchase.
    pub recency: f64,
    /// Number of purchases.
    pub frequency: f64,
    /// Total spend.
    pub monetary: f64,
}

impl RfmFeatures {
    pub fn as_array(&self) -> [f64; 3] {
        [self.recency, self.frequency, self.monetary]
    }
}
