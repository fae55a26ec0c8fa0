//! Configuration snapshot types produced by `Device::read_all_config`/consumed
//! by `Device::write_all_config` (see the session helpers in [`crate::device`]).

use crate::payload::ConfigValue;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One named, typed parameter within a category.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConfigParameter {
    pub uid: u32,
    pub name: String,
    pub value: ConfigValue,
}

/// A named group of parameters, as reported by `REQUEST_CONFIGURATION_CATEGORY`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConfigCategory {
    pub name: String,
    pub parameters: Vec<ConfigParameter>,
}

/// The full nested configuration snapshot: one entry per category, in device
/// order. Always nested — there is no flat-list variant (see the design
/// decision superseding the reference implementation's runtime detection).
pub type ConfigSnapshot = Vec<ConfigCategory>;
