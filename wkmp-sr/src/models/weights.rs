//! Ranking weight vector

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{SearchError, SearchResult};

/// One adjustable component of the [`WeightVector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeightComponent {
    Quality,
    Availability,
    Musical,
    Metadata,
    String,
}

impl WeightComponent {
    pub const ALL: [WeightComponent; 5] = [
        WeightComponent::Quality,
        WeightComponent::Availability,
        WeightComponent::Musical,
        WeightComponent::Metadata,
        WeightComponent::String,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Availability => "availability",
            Self::Musical => "musical",
            Self::Metadata => "metadata",
            Self::String => "string",
        }
    }
}

impl FromStr for WeightComponent {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SearchError::InvalidWeight {
                component: s.to_string(),
                value: f64::NAN,
            })
    }
}

/// Per-dimension multipliers applied to the sub-scores
///
/// Owned and persisted by the caller; the engine keeps the active copy and
/// rescores every record whenever it changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightVector {
    pub quality: f64,
    pub availability: f64,
    pub musical: f64,
    pub metadata: f64,
    pub string: f64,
}

impl Default for WeightVector {
    fn default() -> Self {
        Self {
            quality: 1.0,
            availability: 0.5,
            musical: 0.5,
            metadata: 0.75,
            string: 1.0,
        }
    }
}

impl WeightVector {
    pub fn get(&self, component: WeightComponent) -> f64 {
        match component {
            WeightComponent::Quality => self.quality,
            WeightComponent::Availability => self.availability,
            WeightComponent::Musical => self.musical,
            WeightComponent::Metadata => self.metadata,
            WeightComponent::String => self.string,
        }
    }

    /// Update one component. Negative or non-finite values are rejected and
    /// leave the vector unchanged.
    pub fn set(&mut self, component: WeightComponent, value: f64) -> SearchResult<()> {
        check_weight(component, value)?;
        let slot = match component {
            WeightComponent::Quality => &mut self.quality,
            WeightComponent::Availability => &mut self.availability,
            WeightComponent::Musical => &mut self.musical,
            WeightComponent::Metadata => &mut self.metadata,
            WeightComponent::String => &mut self.string,
        };
        *slot = value;
        Ok(())
    }

    pub fn validate(&self) -> SearchResult<()> {
        for component in WeightComponent::ALL {
            check_weight(component, self.get(component))?;
        }
        Ok(())
    }
}

fn check_weight(component: WeightComponent, value: f64) -> SearchResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SearchError::InvalidWeight {
            component: component.as_str().to_string(),
            value,
        })
    }
}
