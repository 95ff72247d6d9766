//! YAML inputs: sweep parameter definitions and flowsheet default values.
//!
//! Parameters are a mapping from sweep name to definition, in sweep order:
//!
//! ```yaml
//! A_comp:
//!   type: LinearSample
//!   param: fs.RO.A_comp
//!   lower_limit: 1.0e-12
//!   upper_limit: 1.0e-11
//!   num_samples: 10
//! B_comp:
//!   type: NormalSample
//!   param: fs.RO.B_comp
//!   mean: 3.5e-8
//!   std: 0.5e-8
//! ```
//!
//! Grid kinds need `num_samples` as their grid size. On random kinds it sets
//! the sweep's row count, so every random entry that gives one must agree.
//!
//! Defaults are a mapping from quantity path to value, applied in file order.

use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail, eyre};
use rosweep_core::{Model, ParameterSpec, SamplingCategory, SamplingKind};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// One parameter entry as written in YAML
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct YamlParameter {
    #[serde(rename = "type")]
    pub kind: String,
    /// Quantity path on the model
    pub param: String,
    #[serde(default)]
    pub lower_limit: Option<f64>,
    #[serde(default)]
    pub upper_limit: Option<f64>,
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default)]
    pub std: Option<f64>,
    #[serde(default)]
    pub num_samples: Option<usize>,
}

/// Sweep parameters read from YAML
#[derive(Debug, Clone, PartialEq)]
pub struct SweepParams {
    pub parameters: Vec<ParameterSpec>,
    /// Row count given by the random entries, if any
    pub num_samples: Option<usize>,
}

impl YamlParameter {
    /// The parameter, plus its row count when the kind is random
    fn into_spec(self, name: String) -> Result<(ParameterSpec, Option<usize>)> {
        let missing = |field: &str| eyre!("parameter `{name}` ({}) needs `{field}`", self.kind);
        let (first, second) = if matches!(self.kind.as_str(), "NormalSample" | "normal") {
            (
                self.mean.ok_or_else(|| missing("mean"))?,
                self.std.ok_or_else(|| missing("std"))?,
            )
        } else {
            (
                self.lower_limit.ok_or_else(|| missing("lower_limit"))?,
                self.upper_limit.ok_or_else(|| missing("upper_limit"))?,
            )
        };
        let kind = SamplingKind::from_name(&self.kind, first, second, self.num_samples)
            .wrap_err_with(|| format!("parameter `{name}`"))?;
        let rows = match kind.category() {
            SamplingCategory::Fixed => None,
            SamplingCategory::Random | SamplingCategory::LatinHypercube => self.num_samples,
        };
        Ok((ParameterSpec::new(name, self.param, kind), rows))
    }
}

/// Mapping entries in document order
#[derive(Debug, Clone, PartialEq)]
struct Ordered<T>(Vec<(String, T)>);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Ordered<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
            type Value = Ordered<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(Ordered(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

/// Parse sweep parameters from a YAML document
pub fn sweep_params_from_str(yaml: &str) -> Result<SweepParams> {
    let Ordered(entries) = serde_saphyr::from_str::<Ordered<YamlParameter>>(yaml)
        .map_err(|e| eyre!("invalid parameter YAML: {e}"))?;

    let mut parameters = Vec::with_capacity(entries.len());
    let mut num_samples: Option<(String, usize)> = None;
    for (name, entry) in entries {
        let (spec, rows) = entry.into_spec(name)?;
        if let Some(rows) = rows {
            match &num_samples {
                Some((first, n)) if *n != rows => bail!(
                    "parameter `{}` draws {rows} samples but `{first}` draws {n}",
                    spec.name
                ),
                Some(_) => {}
                None => num_samples = Some((spec.name.clone(), rows)),
            }
        }
        parameters.push(spec);
    }

    Ok(SweepParams {
        parameters,
        num_samples: num_samples.map(|(_, n)| n),
    })
}

/// Read sweep parameters from a YAML file
pub fn get_sweep_params_from_yaml(path: &Path) -> Result<SweepParams> {
    let yaml = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading {}", path.display()))?;
    let params = sweep_params_from_str(&yaml).wrap_err_with(|| format!("in {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        parameters = params.parameters.len(),
        num_samples = ?params.num_samples,
        "loaded sweep parameters"
    );
    Ok(params)
}

/// Assign default values from a YAML document. Returns the number assigned.
pub fn defaults_from_str<M: Model>(model: &mut M, yaml: &str) -> Result<usize> {
    let Ordered(entries) = serde_saphyr::from_str::<Ordered<f64>>(yaml)
        .map_err(|e| eyre!("invalid defaults YAML: {e}"))?;
    for (name, value) in &entries {
        model
            .set_value(name, *value)
            .wrap_err_with(|| format!("setting default for `{name}`"))?;
    }
    Ok(entries.len())
}

/// Assign default values from a YAML file
pub fn set_defaults_from_yaml<M: Model>(model: &mut M, path: &Path) -> Result<()> {
    let yaml = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading {}", path.display()))?;
    let count = defaults_from_str(model, &yaml).wrap_err_with(|| format!("in {}", path.display()))?;
    tracing::info!(path = %path.display(), count, "applied model defaults");
    Ok(())
}
