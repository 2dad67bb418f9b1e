//! Option Greeks
//!
//! First and second order sensitivities for single contracts and spread positions.

use serde::{Deserialize, Serialize};

/// Option Greeks (sensitivities)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    /// Delta: dV/dS (sensitivity to spot)
    pub delta: f64,
    /// Gamma: d²V/dS² (sensitivity of delta to spot)
    pub gamma: f64,
    /// Theta: dV/dt per calendar day
    pub theta: f64,
    /// Vega: dV/dσ per 1 vol point
    pub vega: f64,
}

impl Greeks {
    pub fn new(delta: f64, gamma: f64, theta: f64, vega: f64) -> Self {
        Self {
            delta,
            gamma,
            theta,
            vega,
        }
    }

    /// Neutral sentinel returned when inputs cannot be priced
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_finite(&self) -> bool {
        self.delta.is_finite()
            && self.gamma.is_finite()
            && self.theta.is_finite()
            && self.vega.is_finite()
    }

    /// Scale Greeks by a factor (e.g., position sign or contract count)
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            delta: self.delta * factor,
            gamma: self.gamma * factor,
            theta: self.theta * factor,
            vega: self.vega * factor,
        }
    }

    /// Add two Greeks (for positions)
    pub fn add(&self, other: &Greeks) -> Self {
        Self {
            delta: self.delta + other.delta,
            gamma: self.gamma + other.gamma,
            theta: self.theta + other.theta,
            vega: self.vega + other.vega,
        }
    }

    /// Round every field to `decimals` places for presentation
    pub fn rounded(&self, decimals: i32) -> Self {
        let factor = 10f64.powi(decimals);
        let round = |v: f64| (v * factor).round() / factor;
        Self {
            delta: round(self.delta),
            gamma: round(self.gamma),
            theta: round(self.theta),
            vega: round(self.vega),
        }
    }
}

/// Side of a leg within a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short
    pub fn sign(&self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }
}

/// Net Greeks of a multi-leg position: sum of leg Greeks weighted by side.
pub fn aggregate_greeks(legs: &[(Greeks, PositionSide)]) -> Greeks {
    legs.iter()
        .fold(Greeks::zero(), |acc, (g, side)| acc.add(&g.scale(side.sign())))
}
