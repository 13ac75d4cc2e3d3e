//! Sprint pricing and deliverable composition.
//!
//! Turns a list of deliverable selections into points, hours and a fixed price.
//! Everything here is pure computation over in-memory values; callers persist
//! the results into `sprint_drafts`/`sprint_deliverables`.
//!
//! The conversion from points to hours and price is a [`PricingPolicy`], loaded
//! from the `[pricing]` table of `config.toml` so the studio can version it without
//! a code change. Hours are computed with marginal tiers (like tax brackets), which
//! keeps [`PricingPolicy::hours_from_points`] monotonically non-decreasing for any
//! policy with non-negative rates.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// Complexity score that counts as "standard" (multiplier 1.0).
pub const STANDARD_COMPLEXITY: f64 = 2.5;

/// One marginal tier of the points-to-hours conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTier {
    /// Upper bound (inclusive) of this tier in points; `None` means unbounded.
    #[serde(default)]
    pub up_to_points: Option<f64>,
    /// Hours charged for each point falling inside this tier
    pub hours_per_point: f64,
}

/// Versioned pricing policy shared by every endpoint that shows a price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingPolicy {
    /// Policy version, echoed in quotes
    pub version: String,
    /// Flat fee charged once per sprint, whatever its size
    pub point_base_fee: f64,
    /// Dollars per estimated hour
    pub hourly_rate: f64,
    /// Marginal points-to-hours tiers, in ascending order of `up_to_points`
    pub tiers: Vec<PricingTier>,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            version: "2025.1".to_string(),
            point_base_fee: 1500.0,
            hourly_rate: 150.0,
            tiers: vec![
                PricingTier {
                    up_to_points: Some(10.0),
                    hours_per_point: 4.0,
                },
                PricingTier {
                    up_to_points: Some(30.0),
                    hours_per_point: 3.5,
                },
                PricingTier {
                    up_to_points: None,
                    hours_per_point: 3.0,
                },
            ],
        }
    }
}

/// A single deliverable selection fed into the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    /// Base points from the catalog
    pub base_points: f64,
    /// Quantity, already clamped to at least 1
    pub quantity: i32,
    /// Complexity multiplier, 1.0 for standard complexity
    pub complexity_multiplier: f64,
}

impl Selection {
    /// Builds a selection from raw inputs, applying the same normalisation rules
    /// everywhere: missing or invalid points become 0, quantity is clamped to ≥ 1
    /// and the complexity score is converted with [`complexity_multiplier`].
    #[must_use]
    pub fn new(base_points: Option<f64>, quantity: Option<i64>, complexity_score: Option<f64>) -> Self {
        Self {
            base_points: sanitize_points(base_points),
            quantity: normalize_quantity(quantity),
            complexity_multiplier: complexity_multiplier(complexity_score),
        }
    }
}

/// Per-line result for display next to each deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineTotals {
    /// `base_points * quantity`
    pub points: f64,
    /// `points * complexity_multiplier`
    pub weighted_points: f64,
    /// Hours for this line on its own
    pub hours: f64,
}

/// Aggregate result for a whole sprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Exact `Σ base_points * quantity`, unrounded
    pub points: f64,
    /// `Σ points * multiplier`; this is what hours and price are derived from
    pub weighted_points: f64,
    /// `hours_from_points(weighted_points)`
    pub hours: f64,
    /// `price_from_points(weighted_points)`
    pub price: f64,
    /// Number of selections
    pub deliverable_count: usize,
}

/// Package-level overrides applied on top of the computed totals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PackageTerms {
    /// Exact price; wins over everything else
    pub flat_fee: Option<f64>,
    /// Exact hours
    pub flat_hours: Option<f64>,
    /// Percentage off the subtotal, only used without a flat fee
    pub discount_percentage: Option<f64>,
}

/// Priced view of a package.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Policy version used to compute the quote
    pub policy_version: String,
    /// Sum-of-parts totals before package overrides
    pub totals: Totals,
    /// Price before package overrides
    pub subtotal: f64,
    /// Price the client pays
    pub price: f64,
    /// Hours after the `flat_hours` override
    pub hours: f64,
    /// `max(0, subtotal - price)`
    pub savings: f64,
}

/// Converts a complexity score into a multiplier; 2.5 is standard (1.0).
///
/// Missing, negative or non-finite scores count as standard.
#[must_use]
pub fn complexity_multiplier(complexity_score: Option<f64>) -> f64 {
    match complexity_score {
        Some(score) if score.is_finite() && score >= 0.0 => score / STANDARD_COMPLEXITY,
        _ => 1.0,
    }
}

/// Clamps a requested quantity to `1..=i32::MAX`; a missing quantity is 1.
#[must_use]
pub fn normalize_quantity(quantity: Option<i64>) -> i32 {
    let clamped = quantity.unwrap_or(1).clamp(1, i64::from(i32::MAX));
    i32::try_from(clamped).unwrap_or(i32::MAX)
}

fn sanitize_points(points: Option<f64>) -> f64 {
    match points {
        Some(p) if p.is_finite() && p > 0.0 => p,
        _ => 0.0,
    }
}

/// Rounds a dollar or hour amount to cents for storage.
#[must_use]
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl PricingPolicy {
    /// Checks that the policy can only produce finite, non-negative prices.
    ///
    /// # Errors
    /// Returns `Error::Config` for negative or non-finite fees, rates or tier bounds,
    /// and for tier bounds that are not strictly ascending.
    pub fn validate(&self) -> Result<()> {
        let bad = |message: String| Err(Error::Config { message });

        if !self.point_base_fee.is_finite() || self.point_base_fee < 0.0 {
            return bad(format!("point_base_fee must be >= 0, got {}", self.point_base_fee));
        }
        if !self.hourly_rate.is_finite() || self.hourly_rate < 0.0 {
            return bad(format!("hourly_rate must be >= 0, got {}", self.hourly_rate));
        }

        let mut previous_cap = 0.0;
        for (i, tier) in self.tiers.iter().enumerate() {
            if !tier.hours_per_point.is_finite() || tier.hours_per_point < 0.0 {
                return bad(format!("tier {i}: hours_per_point must be >= 0"));
            }
            match tier.up_to_points {
                Some(cap) if !cap.is_finite() || cap <= previous_cap => {
                    return bad(format!("tier {i}: up_to_points must ascend, got {cap}"));
                }
                Some(cap) => previous_cap = cap,
                None if i + 1 != self.tiers.len() => {
                    return bad(format!("tier {i}: only the last tier may be unbounded"));
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Converts points to estimated hours using the marginal tiers.
    ///
    /// Points beyond the last bounded tier are charged at the last tier's rate.
    #[must_use]
    pub fn hours_from_points(&self, points: f64) -> f64 {
        let points = sanitize_points(Some(points));
        let mut hours = 0.0;
        let mut lower = 0.0;

        for tier in &self.tiers {
            let upper = tier.up_to_points.unwrap_or(f64::INFINITY);
            let span = points.min(upper) - lower;
            if span <= 0.0 {
                return hours;
            }
            hours += span * tier.hours_per_point.max(0.0);
            lower = upper;
        }

        match self.tiers.last() {
            Some(last) if points > lower => hours + (points - lower) * last.hours_per_point.max(0.0),
            _ => hours,
        }
    }

    /// Converts aggregate points to a fixed price: the base fee plus hours at the hourly rate.
    #[must_use]
    pub fn price_from_points(&self, points: f64) -> f64 {
        self.point_base_fee + self.hours_from_points(points) * self.hourly_rate
    }

    /// Computes the display totals for one selection.
    #[must_use]
    pub fn line(&self, selection: &Selection) -> LineTotals {
        let points = selection.base_points * f64::from(selection.quantity);
        let weighted_points = points * selection.complexity_multiplier;
        LineTotals {
            points,
            weighted_points,
            hours: self.hours_from_points(weighted_points),
        }
    }

    /// Aggregates a list of selections into sprint totals.
    ///
    /// Hours and price come from the aggregate weighted points, so the base fee is
    /// charged once and tiers apply to the sprint as a whole.
    #[must_use]
    pub fn totals(&self, selections: &[Selection]) -> Totals {
        let (points, weighted_points) =
            selections
                .iter()
                .map(|s| self.line(s))
                .fold((0.0, 0.0), |(p, w), line| {
                    (p + line.points, w + line.weighted_points)
                });

        Totals {
            points,
            weighted_points,
            hours: self.hours_from_points(weighted_points),
            price: self.price_from_points(weighted_points),
            deliverable_count: selections.len(),
        }
    }

    /// Prices a package: the flat fee wins outright, otherwise the discount is applied
    /// to the computed subtotal. Savings never go negative.
    #[must_use]
    pub fn quote(&self, selections: &[Selection], terms: PackageTerms) -> Quote {
        let totals = self.totals(selections);
        let subtotal = totals.price;

        let price = match (valid_amount(terms.flat_fee), terms.discount_percentage) {
            (Some(flat_fee), _) => flat_fee,
            (None, Some(discount)) if discount.is_finite() => {
                subtotal * (1.0 - discount.clamp(0.0, 100.0) / 100.0)
            }
            _ => subtotal,
        };
        let hours = valid_amount(terms.flat_hours).unwrap_or(totals.hours);

        Quote {
            policy_version: self.version.clone(),
            totals,
            subtotal,
            price,
            hours,
            savings: (subtotal - price).max(0.0),
        }
    }
}

fn valid_amount(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}
