//! The fixed expense category set.

use serde::{Deserialize, Serialize};

use crate::error::OutlayError;

/// Category of an expense.
///
/// The record store constrains the `category` column to exactly these
/// four values, serialized with their capitalized names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Groceries, restaurants, and other food spending.
    Food,
    /// Transport, trips, and accommodation.
    Travel,
    /// Goods and retail purchases.
    Shopping,
    /// Anything that fits none of the above.
    Other,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Self; 4] = [Self::Food, Self::Travel, Self::Shopping, Self::Other];

    /// Returns the wire/display name of the category.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Travel => "Travel",
            Self::Shopping => "Shopping",
            Self::Other => "Other",
        }
    }
}

impl core::fmt::Display for Category {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Category {
    type Err = OutlayError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Food" => Ok(Self::Food),
            "Travel" => Ok(Self::Travel),
            "Shopping" => Ok(Self::Shopping),
            "Other" => Ok(Self::Other),
            other => Err(OutlayError::UnknownCategory(other.to_owned())),
        }
    }
}
