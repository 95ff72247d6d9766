//! Closed-form reverse-osmosis flowsheet with pressure-exchanger energy recovery.
//!
//! Feed seawater is split between the high-pressure pump (`P1`) and the
//! pressure exchanger (`PXR`), whose low-pressure side is topped up by the
//! booster pump (`P2`). The RO stage is a single lumped element: water flux
//! follows `A (P - pi_avg)`, salt flux follows `B c_avg`.
//!
//! Quantities are addressed by their flowsheet path, e.g. `fs.RO.A_comp` or
//! `fs.costing.LCOW`, so the sweep engine can treat the flowsheet as an
//! opaque [`Model`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rosweep_core::{
    Model, ModelError, ProblemFormat, ProblemWriter, SolveError, SolveOptions, SolveStatus,
    WriteOptions,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Quantity paths
// ============================================================================

pub const H2O_FLOW: &str = "fs.feed.properties[0].flow_mass_phase_comp[Liq,H2O]";
pub const NACL_LOADING: &str = "fs.feed.properties[0].flow_mass_phase_comp[Liq,NaCl]";
pub const A_COMP: &str = "fs.RO.A_comp";
pub const B_COMP: &str = "fs.RO.B_comp";
pub const RECOVERY: &str = "fs.RO.recovery_mass_phase_comp[0,Liq,H2O]";
pub const PUMP_EFFICIENCY: &str = "fs.P1.efficiency_pump";
pub const BOOSTER_EFFICIENCY: &str = "fs.P2.efficiency_pump";
pub const PX_EFFICIENCY: &str = "fs.PXR.efficiency_pressure_exchanger";
pub const MEMBRANE_COST: &str = "fs.costing.reverse_osmosis.membrane_cost";
pub const PX_COST: &str = "fs.costing.pressure_exchanger.cost";
pub const PUMP_COST: &str = "fs.costing.high_pressure_pump.cost";
pub const ELECTRICITY_COST: &str = "fs.costing.electricity_cost";
pub const UTILIZATION_FACTOR: &str = "fs.costing.utilization_factor";
pub const CAPITAL_RECOVERY_FACTOR: &str = "fs.costing.factor_capital_annualization";
pub const MEMBRANE_REPLACEMENT: &str = "fs.costing.factor_membrane_replacement";
pub const MAX_PRESSURE: &str = "fs.RO.max_pressure";
pub const MAX_PRODUCT_CONC: &str = "fs.product.max_conc_mass_phase_comp[Liq,NaCl]";

pub const FEED_PRESSURE: &str = "fs.P1.control_volume.properties_out[0].pressure";
pub const AREA: &str = "fs.RO.area";
pub const PRODUCT_CONC: &str = "fs.product.properties[0].conc_mass_phase_comp[Liq,NaCl]";
pub const PUMP_POWER: &str = "fs.costing.total_pump_work";
pub const EC: &str = "fs.costing.specific_energy_consumption";
pub const LCOW: &str = "fs.costing.LCOW";

/// Water density, kg/m^3
const RHO: f64 = 1000.0;
/// Atmospheric pressure, Pa
const P_ATM: f64 = 101_325.0;
/// Van 't Hoff coefficient for NaCl at 25 C, Pa per kg/m^3
const OSMOTIC_COEFF: f64 = 2.0 * 8.314_462 * 298.15 / 0.058_44;
const SECONDS_PER_YEAR: f64 = 3600.0 * 24.0 * 365.0;
const J_PER_KWH: f64 = 3.6e6;

/// Golden-section iterations for the pressure optimization
const OPTIMIZE_ITERATIONS: usize = 80;
/// Lowest feed pressure the optimizer considers, relative to brine osmotic pressure
const MIN_OVER_PRESSURE: f64 = 0.01;

// ============================================================================
// Model state
// ============================================================================

/// Solved operating point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Performance {
    /// Pa
    pub feed_pressure: f64,
    /// m^2
    pub area: f64,
    /// kg/m^3
    pub product_conc: f64,
    /// W
    pub pump_power: f64,
    /// kWh/m^3
    pub specific_energy_consumption: f64,
    /// $/m^3
    pub lcow: f64,
}

/// Reverse-osmosis surrogate flowsheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoSurrogate {
    /// kg/s
    pub h2o_flow: f64,
    /// kg/s
    pub nacl_flow: f64,
    /// Water permeability, m/(s Pa)
    pub a_comp: f64,
    /// Salt permeability, m/s
    pub b_comp: f64,
    pub recovery: f64,
    /// Feed pressure margin over brine osmotic pressure used by initialization
    pub over_pressure: f64,
    pub pump_efficiency: f64,
    pub booster_efficiency: f64,
    pub px_efficiency: f64,
    /// $/m^2
    pub membrane_cost: f64,
    /// $/(m^3/h) of brine flow
    pub px_cost: f64,
    /// $/W
    pub pump_cost: f64,
    /// $/kWh
    pub electricity_cost: f64,
    pub utilization_factor: f64,
    pub capital_recovery_factor: f64,
    /// Fraction of membrane capital replaced per year
    pub membrane_replacement: f64,
    /// Pa
    pub max_pressure: f64,
    /// kg/m^3
    pub max_product_conc: f64,

    pub performance: Performance,
    /// Set by [`initialize_system`], cleared by [`set_operating_conditions`]
    pub initialized: bool,
}

impl Default for RoSurrogate {
    fn default() -> Self {
        Self {
            h2o_flow: 0.965,
            nacl_flow: 0.035,
            a_comp: 4.2e-12,
            b_comp: 3.5e-8,
            recovery: 0.5,
            over_pressure: 0.3,
            pump_efficiency: 0.8,
            booster_efficiency: 0.8,
            px_efficiency: 0.95,
            membrane_cost: 30.0,
            px_cost: 535.0,
            pump_cost: 1.908,
            electricity_cost: 0.07,
            utilization_factor: 0.9,
            capital_recovery_factor: 0.1,
            membrane_replacement: 0.2,
            max_pressure: 8.5e6,
            max_product_conc: 0.5,
            performance: Performance::default(),
            initialized: false,
        }
    }
}

/// Feed-side state that does not depend on the feed pressure
struct FeedState {
    /// m^3/s
    permeate_flow: f64,
    /// m^3/s
    brine_flow: f64,
    /// kg/m^3
    feed_conc: f64,
    /// kg/m^3
    brine_conc: f64,
}

impl FeedState {
    fn brine_osmotic_pressure(&self) -> f64 {
        OSMOTIC_COEFF * self.brine_conc
    }

    fn average_osmotic_pressure(&self) -> f64 {
        OSMOTIC_COEFF * 0.5 * (self.feed_conc + self.brine_conc)
    }
}

impl RoSurrogate {
    fn feed_state(&self) -> FeedState {
        let feed_flow = (self.h2o_flow + self.nacl_flow) / RHO;
        let permeate_flow = self.recovery * self.h2o_flow / RHO;
        let brine_flow = feed_flow - permeate_flow;
        FeedState {
            permeate_flow,
            brine_flow,
            feed_conc: self.nacl_flow / feed_flow,
            brine_conc: self.nacl_flow / brine_flow,
        }
    }

    /// Evaluate the flowsheet at a feed pressure. `None` if the pressure cannot drive permeation.
    fn evaluate(&self, feed_pressure: f64) -> Option<Performance> {
        let feed = self.feed_state();
        if feed_pressure <= feed.brine_osmotic_pressure() {
            return None;
        }

        let water_flux = self.a_comp * (feed_pressure - feed.average_osmotic_pressure());
        let area = feed.permeate_flow / water_flux;
        let salt_flux = self.b_comp * 0.5 * (feed.feed_conc + feed.brine_conc);
        let product_conc = salt_flux * area / feed.permeate_flow;

        let gauge = feed_pressure - P_ATM;
        let pump_power = feed.permeate_flow * gauge / self.pump_efficiency
            + feed.brine_flow * gauge * (1.0 - self.px_efficiency) / self.booster_efficiency;
        let sec = pump_power / feed.permeate_flow / J_PER_KWH;

        let capital = self.membrane_cost * area
            + self.px_cost * feed.brine_flow * 3600.0
            + self.pump_cost * pump_power;
        let annual_production = feed.permeate_flow * SECONDS_PER_YEAR * self.utilization_factor;
        let annual_cost = capital * self.capital_recovery_factor
            + self.membrane_replacement * self.membrane_cost * area
            + self.electricity_cost * sec * annual_production;

        Some(Performance {
            feed_pressure,
            area,
            product_conc,
            pump_power,
            specific_energy_consumption: sec,
            lcow: annual_cost / annual_production,
        })
    }

    fn input_mut(&mut self, name: &str) -> Option<&mut f64> {
        let slot = match name {
            H2O_FLOW => &mut self.h2o_flow,
            NACL_LOADING => &mut self.nacl_flow,
            A_COMP => &mut self.a_comp,
            B_COMP => &mut self.b_comp,
            RECOVERY => &mut self.recovery,
            PUMP_EFFICIENCY => &mut self.pump_efficiency,
            BOOSTER_EFFICIENCY => &mut self.booster_efficiency,
            PX_EFFICIENCY => &mut self.px_efficiency,
            MEMBRANE_COST => &mut self.membrane_cost,
            PX_COST => &mut self.px_cost,
            PUMP_COST => &mut self.pump_cost,
            ELECTRICITY_COST => &mut self.electricity_cost,
            UTILIZATION_FACTOR => &mut self.utilization_factor,
            CAPITAL_RECOVERY_FACTOR => &mut self.capital_recovery_factor,
            MEMBRANE_REPLACEMENT => &mut self.membrane_replacement,
            MAX_PRESSURE => &mut self.max_pressure,
            MAX_PRODUCT_CONC => &mut self.max_product_conc,
            FEED_PRESSURE => &mut self.performance.feed_pressure,
            _ => return None,
        };
        Some(slot)
    }

    /// Every named quantity with its current value, inputs first
    pub fn quantities(&self) -> Vec<(&'static str, f64)> {
        let p = &self.performance;
        vec![
            (H2O_FLOW, self.h2o_flow),
            (NACL_LOADING, self.nacl_flow),
            (A_COMP, self.a_comp),
            (B_COMP, self.b_comp),
            (RECOVERY, self.recovery),
            (PUMP_EFFICIENCY, self.pump_efficiency),
            (BOOSTER_EFFICIENCY, self.booster_efficiency),
            (PX_EFFICIENCY, self.px_efficiency),
            (MEMBRANE_COST, self.membrane_cost),
            (PX_COST, self.px_cost),
            (PUMP_COST, self.pump_cost),
            (ELECTRICITY_COST, self.electricity_cost),
            (UTILIZATION_FACTOR, self.utilization_factor),
            (CAPITAL_RECOVERY_FACTOR, self.capital_recovery_factor),
            (MEMBRANE_REPLACEMENT, self.membrane_replacement),
            (MAX_PRESSURE, self.max_pressure),
            (MAX_PRODUCT_CONC, self.max_product_conc),
            (FEED_PRESSURE, p.feed_pressure),
            (AREA, p.area),
            (PRODUCT_CONC, p.product_conc),
            (PUMP_POWER, p.pump_power),
            (EC, p.specific_energy_consumption),
            (LCOW, p.lcow),
        ]
    }
}

fn check_value(name: &str, value: f64) -> Result<(), ModelError> {
    let reject = |reason: &str| {
        Err(ModelError::InvalidValue {
            name: name.to_string(),
            value,
            reason: reason.to_string(),
        })
    };
    if !value.is_finite() {
        return reject("must be finite");
    }
    match name {
        RECOVERY if value <= 0.0 || value >= 1.0 => reject("recovery must lie in (0, 1)"),
        PUMP_EFFICIENCY | BOOSTER_EFFICIENCY | PX_EFFICIENCY | UTILIZATION_FACTOR
            if value <= 0.0 || value > 1.0 =>
        {
            reject("must lie in (0, 1]")
        }
        H2O_FLOW | NACL_LOADING | A_COMP | B_COMP | MAX_PRESSURE if value <= 0.0 => {
            reject("must be positive")
        }
        _ if value < 0.0 => reject("must be non-negative"),
        _ => Ok(()),
    }
}

impl Model for RoSurrogate {
    fn set_value(&mut self, name: &str, value: f64) -> Result<(), ModelError> {
        check_value(name, value)?;
        let known = self.quantities().iter().any(|(n, _)| *n == name);
        match self.input_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None if known => Err(ModelError::Fixed(name.to_string())),
            None => Err(ModelError::UnknownQuantity(name.to_string())),
        }
    }

    fn value(&self, name: &str) -> Result<f64, ModelError> {
        self.quantities()
            .into_iter()
            .find_map(|(n, v)| (n == name).then_some(v))
            .ok_or_else(|| ModelError::UnknownQuantity(name.to_string()))
    }
}

// ============================================================================
// Study entry points
// ============================================================================

/// Build the flowsheet with its nominal design values
pub fn build() -> RoSurrogate {
    RoSurrogate::default()
}

/// Fix the water recovery and the initialization pressure margin
pub fn set_operating_conditions(
    model: &mut RoSurrogate,
    water_recovery: f64,
    over_pressure: f64,
) -> Result<(), ModelError> {
    model.set_value(RECOVERY, water_recovery)?;
    if !over_pressure.is_finite() || over_pressure <= 0.0 {
        return Err(ModelError::InvalidValue {
            name: "over_pressure".into(),
            value: over_pressure,
            reason: "must be positive".into(),
        });
    }
    model.over_pressure = over_pressure;
    model.initialized = false;
    Ok(())
}

/// Set the feed pressure from the brine osmotic pressure and evaluate once.
pub fn initialize_system(model: &mut RoSurrogate, _: &SolveOptions) -> Result<(), SolveError> {
    let pressure = model.feed_state().brine_osmotic_pressure() * (1.0 + model.over_pressure);
    let performance = model.evaluate(pressure).ok_or_else(|| {
        SolveError::Evaluation(format!("no permeation at initial pressure {pressure:.4e} Pa"))
    })?;
    model.performance = performance;
    model.initialized = true;
    tracing::debug!(feed_pressure = pressure, "initialized flowsheet");
    Ok(())
}

/// Simulate at the current feed pressure.
pub fn solve(model: &mut RoSurrogate, options: &SolveOptions) -> Result<SolveStatus, SolveError> {
    if !model.initialized {
        return Err(SolveError::NotConverged(
            "flowsheet solved before initialization".into(),
        ));
    }
    let status = match model.evaluate(model.performance.feed_pressure) {
        Some(performance) => {
            model.performance = performance;
            SolveStatus::Optimal
        }
        None => SolveStatus::Infeasible,
    };
    check_termination(status, options)
}

/// Choose the feed pressure minimizing LCOW within the pressure and product-quality limits.
pub fn optimize(model: &mut RoSurrogate, options: &SolveOptions) -> Result<SolveStatus, SolveError> {
    let feed = model.feed_state();
    // Product quality bounds the driving pressure from below: c_p = B c_avg / (A dP)
    let quality_pressure = feed.average_osmotic_pressure()
        + model.b_comp * 0.5 * (feed.feed_conc + feed.brine_conc)
            / (model.a_comp * model.max_product_conc);
    let lower = (feed.brine_osmotic_pressure() * (1.0 + MIN_OVER_PRESSURE)).max(quality_pressure);
    let upper = model.max_pressure;
    if lower >= upper {
        return check_termination(SolveStatus::Infeasible, options);
    }

    let lcow = |pressure: f64| model.evaluate(pressure).map_or(f64::INFINITY, |p| p.lcow);
    let iterations = options.max_iterations.unwrap_or(OPTIMIZE_ITERATIONS);
    let tolerance = options.tolerance.unwrap_or(0.0);
    let best = golden_section(lcow, lower, upper, iterations, tolerance);

    let status = match model.evaluate(best) {
        Some(performance) if performance.product_conc <= model.max_product_conc * (1.0 + 1e-9) => {
            model.performance = performance;
            SolveStatus::Optimal
        }
        Some(_) | None => SolveStatus::Infeasible,
    };
    check_termination(status, options)
}

fn check_termination(status: SolveStatus, options: &SolveOptions) -> Result<SolveStatus, SolveError> {
    if options.check_termination && !status.is_success() {
        return Err(SolveError::NotConverged(status.to_string()));
    }
    Ok(status)
}

/// Minimize a unimodal function on `[lower, upper]`
fn golden_section<F: Fn(f64) -> f64>(
    f: F,
    mut lower: f64,
    mut upper: f64,
    iterations: usize,
    tolerance: f64,
) -> f64 {
    let ratio = (5.0_f64.sqrt() - 1.0) / 2.0;
    let mut x1 = upper - ratio * (upper - lower);
    let mut x2 = lower + ratio * (upper - lower);
    let mut f1 = f(x1);
    let mut f2 = f(x2);

    for _ in 0..iterations {
        if upper - lower <= tolerance {
            break;
        }
        if f1 <= f2 {
            upper = x2;
            x2 = x1;
            f2 = f1;
            x1 = upper - ratio * (upper - lower);
            f1 = f(x1);
        } else {
            lower = x1;
            x1 = x2;
            f1 = f2;
            x2 = lower + ratio * (upper - lower);
            f2 = f(x2);
        }
    }
    0.5 * (lower + upper)
}

// ============================================================================
// Problem files
// ============================================================================

impl ProblemWriter for RoSurrogate {
    fn write_problem(
        &self,
        path: &Path,
        format: ProblemFormat,
        options: WriteOptions,
    ) -> std::io::Result<()> {
        let label = |index: usize, name: &str| {
            if options.symbolic_solver_labels {
                name.replace(['.', '[', ']', ','], "_")
            } else {
                format!("x{index}")
            }
        };
        let quantities = self.quantities();

        let mut out = BufWriter::new(File::create(path)?);
        match format {
            ProblemFormat::Nl => {
                writeln!(out, "# reverse osmosis flowsheet")?;
                for (i, (name, value)) in quantities.iter().enumerate() {
                    writeln!(out, "var {} := {value:e};  # {name}", label(i, name))?;
                }
                writeln!(out, "minimize obj: {};", label(quantities.len() - 1, LCOW))?;
            }
            ProblemFormat::Gms => {
                writeln!(out, "* reverse osmosis flowsheet")?;
                for (i, (name, value)) in quantities.iter().enumerate() {
                    writeln!(out, "Scalar {} /{value:e}/;  * {name}", label(i, name))?;
                }
            }
        }
        out.flush()
    }
}
