//! Location classes described as data
//!
//! A `LocationSpec` covers the common case where every hook reads a single
//! agent attribute. Specs load from TOML:
//!
//! ```toml
//! [[locations]]
//! name = "School"
//! size = 4
//!
//! [[locations]]
//! name = "Classroom"
//! size = 2
//! split_by = "grade"
//! nest = "School"
//! filter = { attribute = "status", equals = "pupil" }
//! ```

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::core::error::{PopError, Result};
use crate::core::types::{Value, RESERVED_ATTRIBUTE};
use crate::location::policy::{LocationPolicy, PolicyRef};
use crate::location::Capacity;

/// Attribute test used as a class filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeFilter {
    pub attribute: String,
    #[serde(default)]
    pub equals: Option<Value>,
    #[serde(default)]
    pub any_of: Vec<Value>,
}

impl AttributeFilter {
    /// `equals` wins over `any_of`; with neither, any non-null value passes
    pub fn matches(&self, agent: &Agent) -> bool {
        let value = agent.value(&self.attribute);
        if let Some(expected) = &self.equals {
            return &value == expected;
        }
        if !self.any_of.is_empty() {
            return self.any_of.contains(&value);
        }
        !value.is_null()
    }
}

fn default_build() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSpec {
    pub name: String,
    #[serde(default)]
    pub size: Option<usize>,
    #[serde(default)]
    pub n_locations: Option<usize>,
    #[serde(default)]
    pub overcrowding: bool,
    #[serde(default)]
    pub filter: Option<AttributeFilter>,
    #[serde(default)]
    pub split_by: Option<String>,
    #[serde(default)]
    pub stick_by: Option<String>,
    #[serde(default)]
    pub subsplit_by: Option<String>,
    #[serde(default)]
    pub nest: Option<String>,
    #[serde(default)]
    pub melt: Vec<String>,
    #[serde(default)]
    pub multi_melt: bool,
    #[serde(default)]
    pub weight: Option<f64>,
    /// Build instances of this class directly; off for melt-only components
    #[serde(default = "default_build")]
    pub build: bool,
}

impl LocationSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            n_locations: None,
            overcrowding: false,
            filter: None,
            split_by: None,
            stick_by: None,
            subsplit_by: None,
            nest: None,
            melt: Vec::new(),
            multi_melt: false,
            weight: None,
            build: true,
        }
    }
}

/// `LocationPolicy` driven by a `LocationSpec`
#[derive(Clone)]
pub struct DeclarativeLocation {
    spec: LocationSpec,
    capacity: Capacity,
    melted: Vec<PolicyRef>,
}

impl DeclarativeLocation {
    /// Policy for a spec that melts nothing
    pub fn new(spec: LocationSpec) -> Result<Self> {
        if !spec.melt.is_empty() {
            return Err(PopError::config(format!(
                "location class `{}` melts other classes; build it with build_policies",
                spec.name
            )));
        }
        Self::with_melted(spec, Vec::new())
    }

    fn with_melted(spec: LocationSpec, melted: Vec<PolicyRef>) -> Result<Self> {
        if spec.name.is_empty() || spec.name == RESERVED_ATTRIBUTE {
            return Err(PopError::config(format!(
                "`{}` is not a usable location class name",
                spec.name
            )));
        }
        let capacity = Capacity::from_options(&spec.name, spec.size, spec.n_locations)?;
        capacity.validate(&spec.name)?;

        if spec.nest.as_deref() == Some(spec.name.as_str()) {
            return Err(PopError::config(format!(
                "location class `{}` cannot nest inside itself",
                spec.name
            )));
        }
        if let Some(w) = spec.weight {
            if !w.is_finite() || w < 0.0 {
                return Err(PopError::config(format!(
                    "location class `{}` has invalid weight {}",
                    spec.name, w
                )));
            }
        }

        Ok(Self {
            spec,
            capacity,
            melted,
        })
    }
}

impl LocationPolicy for DeclarativeLocation {
    fn type_name(&self) -> &str {
        &self.spec.name
    }

    fn capacity(&self) -> Capacity {
        self.capacity
    }

    fn overcrowding(&self) -> bool {
        self.spec.overcrowding
    }

    fn multi_melt(&self) -> bool {
        self.spec.multi_melt
    }

    fn filter(&self, agent: &Agent) -> bool {
        self.spec.filter.as_ref().map_or(true, |f| f.matches(agent))
    }

    fn split(&self, agent: &Agent) -> Vec<Value> {
        vec![self.spec.split_by.as_deref().map_or(Value::Null, |a| agent.value(a))]
    }

    fn stick_together(&self, agent: &Agent) -> Option<Value> {
        let value = agent.value(self.spec.stick_by.as_deref()?);
        (!value.is_null()).then_some(value)
    }

    fn subsplit(&self, agent: &Agent) -> Vec<Value> {
        vec![self.spec.subsplit_by.as_deref().map_or(Value::Null, |a| agent.value(a))]
    }

    fn nest(&self) -> Option<&str> {
        self.spec.nest.as_deref()
    }

    fn melt(&self) -> Vec<PolicyRef> {
        self.melted.clone()
    }

    fn weight(&self, _agent: &Agent) -> Option<f64> {
        self.spec.weight
    }
}

/// Turn specs into policies, resolving melt references by name
///
/// Returns the classes with `build = true`, in spec order. Melt components
/// must be declared in the same list and may not melt classes themselves.
pub fn build_policies(specs: &[LocationSpec]) -> Result<Vec<PolicyRef>> {
    let mut simple: AHashMap<&str, PolicyRef> = AHashMap::new();
    for spec in specs.iter().filter(|s| s.melt.is_empty()) {
        let policy: PolicyRef = Arc::new(DeclarativeLocation::new(spec.clone())?);
        if simple.insert(spec.name.as_str(), policy).is_some() {
            return Err(PopError::config(format!("location class `{}` declared twice", spec.name)));
        }
    }

    let mut melting: AHashSet<&str> = AHashSet::new();
    let mut built = Vec::new();
    for spec in specs {
        if spec.melt.is_empty() {
            if spec.build {
                if let Some(policy) = simple.get(spec.name.as_str()) {
                    built.push(Arc::clone(policy));
                }
            }
            continue;
        }

        if simple.contains_key(spec.name.as_str()) || !melting.insert(spec.name.as_str()) {
            return Err(PopError::config(format!("location class `{}` declared twice", spec.name)));
        }
        let mut melted = Vec::with_capacity(spec.melt.len());
        for name in &spec.melt {
            let component = simple.get(name.as_str()).ok_or_else(|| {
                PopError::config(format!(
                    "location class `{}` melts unknown or melting class `{}`",
                    spec.name, name
                ))
            })?;
            melted.push(Arc::clone(component));
        }
        let policy: PolicyRef = Arc::new(DeclarativeLocation::with_melted(spec.clone(), melted)?);
        if spec.build {
            built.push(policy);
        }
    }

    Ok(built)
}
