//! Per-mode travel-time estimation over a computed route.

use crate::models::{RouteResult, TravelMode, TravelTimeResult};

#[derive(Debug, Clone)]
pub struct TravelTimeEstimator {
    modes: Vec<TravelMode>,
}

impl Default for TravelTimeEstimator {
    fn default() -> Self {
        Self::new(TravelMode::builtin())
    }
}

impl TravelTimeEstimator {
    pub fn new(modes: Vec<TravelMode>) -> Self {
        Self { modes }
    }

    pub fn modes(&self) -> &[TravelMode] {
        &self.modes
    }

    pub fn mode(&self, id: &str) -> Option<&TravelMode> {
        self.modes.iter().find(|mode| mode.id == id)
    }

    /// Days needed to cover `route` with `mode`; infinite when the mode cannot
    /// traverse a terrain present on the route.
    pub fn estimate(&self, route: &RouteResult, mode: &TravelMode) -> TravelTimeResult {
        let land_km = route.land_distance_km;
        let water_km = route.water_distance_km;

        if land_km > 0.0 && mode.land_speed_km_per_day <= 0.0 {
            return infeasible(mode, format!("{} cannot travel on land", mode.name));
        }
        if water_km > 0.0 && mode.water_speed_km_per_day <= 0.0 {
            let reason = if mode.requires_ferry_for_water {
                format!("{} cannot cross water (requires ferry)", mode.name)
            } else {
                format!("{} cannot cross water", mode.name)
            };
            return infeasible(mode, reason);
        }

        let land_days = if land_km > 0.0 {
            land_km / mode.land_speed_km_per_day
        } else {
            0.0
        };
        let water_days = if water_km > 0.0 {
            water_km / mode.water_speed_km_per_day
        } else {
            0.0
        };
        let total_days = land_days + water_days;

        TravelTimeResult {
            total_days,
            land_days,
            water_days,
            mode: mode.id.clone(),
            description: describe(total_days, land_days, water_days),
        }
    }

    /// Feasible estimates for every known mode, fastest first.
    pub fn estimate_all(&self, route: &RouteResult) -> Vec<TravelTimeResult> {
        let mut results: Vec<TravelTimeResult> = self
            .modes
            .iter()
            .map(|mode| self.estimate(route, mode))
            .filter(TravelTimeResult::is_feasible)
            .collect();
        // Stable sort keeps presentation order among equal totals.
        results.sort_by(|a, b| a.total_days.total_cmp(&b.total_days));
        results
    }
}

fn infeasible(mode: &TravelMode, description: String) -> TravelTimeResult {
    TravelTimeResult {
        total_days: f64::INFINITY,
        land_days: 0.0,
        water_days: 0.0,
        mode: mode.id.clone(),
        description,
    }
}

fn describe(total_days: f64, land_days: f64, water_days: f64) -> String {
    let mut description = format!("{} days total", total_days.ceil());
    if land_days > 0.0 && water_days > 0.0 {
        description.push_str(&format!(
            " ({} days on land, {} days on water)",
            land_days.ceil(),
            water_days.ceil()
        ));
    } else if land_days > 0.0 {
        description.push_str(" (all on land)");
    } else if water_days > 0.0 {
        description.push_str(" (all on water)");
    }
    description
}
