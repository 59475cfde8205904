//! Lead scoring and savings arithmetic.
//!
//! Everything here is pure: no I/O, no clock, no randomness.

use serde::Serialize;

/// Share of the grid-usage fee a LEG member saves.
pub const GRID_FEE_REDUCTION: f64 = 0.40;
/// Annual consumption of the H4 reference household in kWh.
pub const H4_ANNUAL_KWH: f64 = 4500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Hot,
    Warm,
    Medium,
    Cold,
}

impl Tier {
    pub fn from_score(score: i64) -> Self {
        match score {
            s if s >= 80 => Tier::Hot,
            s if s >= 60 => Tier::Warm,
            s if s >= 40 => Tier::Medium,
            _ => Tier::Cold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub population_pts: i64,
    pub solar_pts: i64,
    pub leghub_pts: i64,
    pub smart_meter_pts: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VnbScore {
    pub score: i64,
    pub tier: Tier,
    pub breakdown: ScoreBreakdown,
}

fn population_points(population: f64) -> i64 {
    match population {
        p if p > 50_000.0 => 30,
        p if p > 20_000.0 => 25,
        p if p > 10_000.0 => 20,
        p if p > 5_000.0 => 15,
        _ => 10,
    }
}

/// A quarter point per percent, capped at 25.
fn percent_points(pct: f64) -> i64 {
    ((pct * 0.25).round() as i64).clamp(0, 25)
}

/// Score a grid operator as an expansion target (0 to 100).
pub fn score_vnb(
    population: f64,
    solar_potential_pct: f64,
    has_leghub: bool,
    smart_meter_rollout_pct: f64,
) -> VnbScore {
    let breakdown = ScoreBreakdown {
        population_pts: population_points(population),
        solar_pts: percent_points(solar_potential_pct),
        leghub_pts: if has_leghub { 20 } else { 0 },
        smart_meter_pts: percent_points(smart_meter_rollout_pct),
    };
    let score = breakdown.population_pts
        + breakdown.solar_pts
        + breakdown.leghub_pts
        + breakdown.smart_meter_pts;

    VnbScore {
        score,
        tier: Tier::from_score(score),
        breakdown,
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Annual CHF a reference household saves in a LEG, given the grid-usage
/// fee in Rappen per kWh. Rounded to two decimals.
pub fn annual_savings_chf(grid_fee_rp_kwh: f64) -> f64 {
    round_to(grid_fee_rp_kwh * GRID_FEE_REDUCTION * H4_ANNUAL_KWH / 100.0, 2)
}

/// Municipality indicators feeding the energy-transition score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransitionIndicators {
    pub solar_potential_pct: f64,
    pub ev_share_pct: f64,
    pub renewable_heating_pct: f64,
    pub electricity_consumption_mwh: f64,
    pub renewable_production_mwh: f64,
}

/// Weighted energy-transition score (0 to 100), one decimal.
///
/// Solar 30, EV share 20 (saturating at 30 %), renewable heating 25,
/// production/consumption ratio 25 (saturating at 1).
pub fn energy_transition_score(ind: &TransitionIndicators) -> f64 {
    let solar = ind.solar_potential_pct / 100.0;
    let ev = ind.ev_share_pct.min(30.0) / 30.0;
    let heating = ind.renewable_heating_pct / 100.0;
    let production_ratio = if ind.electricity_consumption_mwh > 0.0 {
        (ind.renewable_production_mwh / ind.electricity_consumption_mwh).min(1.0)
    } else {
        0.0
    };

    round_to(
        solar * 30.0 + ev * 20.0 + heating * 25.0 + production_ratio * 25.0,
        1,
    )
}

/// Percentage of confirmed members, 0 for an empty community.
pub fn formation_progress(confirmed: usize, total: usize) -> i64 {
    if total == 0 {
        return 0;
    }
    (confirmed as f64 / total as f64 * 100.0).round() as i64
}

/// Share of paid leads in percent with one decimal, 0 without leads.
pub fn conversion_rate(paid: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (paid as f64 / total as f64 * 1000.0).round() / 10.0
}
