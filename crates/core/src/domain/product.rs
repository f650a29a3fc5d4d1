use std::fmt;

use serde::{Deserialize, Serialize};

/// Short product code as it appears in the retail transaction export.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockCode(pub String);

/// Key used to index the similarity matrix. Holds either a product description
/// or a stock code depending on [`IdentityKey`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductIdentity(pub String);

impl ProductIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub description: String,
    pub stock_code: StockCode,
}

impl ProductRecord {
    pub fn new(description: impl Into<String>, stock_code: impl Into<String>) -> Self {
        Self { description: description.into(), stock_code: StockCode(stock_code.into()) }
    }
}

/// Which product field the similarity matrix rows and columns are labelled with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKey {
    #[default]
    Description,
    StockCode,
}

impl std::str::FromStr for IdentityKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "description" => Ok(Self::Description),
            "stock_code" | "stockcode" => Ok(Self::StockCode),
            other => Err(format!(
                "unsupported identity key `{other}` (expected description|stock_code)"
            )),
        }
    }
}
