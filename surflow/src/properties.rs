//! Tunable properties.
//!
//! Estimation parameters are exposed by name with lower and upper bounds, so that front ends can
//! list and adjust them without knowing the concrete configuration type.

use crate::error::{FlowError, FlowResult};
use std::fmt;

/// Object with tunable properties.
pub trait Properties {
    /// Get available properties.
    fn props_mut(&mut self) -> Vec<(&str, PropertyMut)>;

    fn props(&mut self) -> Vec<(&str, Property)> {
        self.props_mut()
            .into_iter()
            .map(|(n, p)| (n, p.into()))
            .collect()
    }

    /// Parse and set a property by name.
    ///
    /// Names are matched case-insensitively. The parsed value is clamped to the property bounds.
    fn set_prop(&mut self, name: &str, value: &str) -> FlowResult<()> {
        let mut props = self.props_mut();

        let (_, prop) = props
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| FlowError::InvalidConfig(format!("unknown property `{}`", name)))?;

        prop.parse_set(value)
    }
}

/// Property with a lower and upper bound.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct BoundedProp<T> {
    pub val: T,
    pub min: T,
    pub max: T,
}

impl<'a, T: Copy> From<BoundedPropMut<'a, T>> for BoundedProp<T> {
    fn from(BoundedPropMut { val, min, max }: BoundedPropMut<'a, T>) -> Self {
        Self {
            val: *val,
            min,
            max,
        }
    }
}

/// Snapshot of a property value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum Property {
    Float(BoundedProp<f32>),
    Usize(BoundedProp<usize>),
}

impl<'a> From<PropertyMut<'a>> for Property {
    fn from(prop: PropertyMut<'a>) -> Self {
        match prop {
            PropertyMut::Float(p) => Self::Float(p.into()),
            PropertyMut::Usize(p) => Self::Usize(p.into()),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Float(p) => write!(f, "{} [{}; {}]", p.val, p.min, p.max),
            Self::Usize(p) => write!(f, "{} [{}; {}]", p.val, p.min, p.max),
        }
    }
}

/// Mutable reference to a bounded value.
pub struct BoundedPropMut<'a, T> {
    pub val: &'a mut T,
    pub min: T,
    pub max: T,
}

impl<'a, T: PartialOrd + Copy> BoundedPropMut<'a, T> {
    /// Set the value, clamped between the lower and upper bounds.
    pub fn set_clamped(&mut self, val: T) {
        *self.val = if val < self.min {
            self.min
        } else if val > self.max {
            self.max
        } else {
            val
        };
    }
}

/// Mutable property handle.
pub enum PropertyMut<'a> {
    Float(BoundedPropMut<'a, f32>),
    Usize(BoundedPropMut<'a, usize>),
}

impl<'a> PropertyMut<'a> {
    /// Create a floating point property.
    ///
    /// # Arguments
    ///
    /// * `val` - reference to the underlying float to be mutated.
    /// * `min` - lowest value for the property.
    /// * `max` - highest value for the property.
    pub fn float(val: &'a mut f32, min: f32, max: f32) -> Self {
        Self::Float(BoundedPropMut { val, min, max })
    }

    /// Create an integer property.
    ///
    /// # Arguments
    ///
    /// * `val` - reference to the underlying usize to be mutated.
    /// * `min` - lowest value for the property.
    /// * `max` - highest value for the property.
    pub fn usize(val: &'a mut usize, min: usize, max: usize) -> Self {
        Self::Usize(BoundedPropMut { val, min, max })
    }

    /// Parse a textual value and set it.
    pub fn parse_set(&mut self, value: &str) -> FlowResult<()> {
        let invalid = |e: &dyn fmt::Display| {
            FlowError::InvalidConfig(format!("cannot parse `{}`: {}", value, e))
        };

        match self {
            Self::Float(p) => {
                let v = value.trim().parse::<f32>().map_err(|e| invalid(&e))?;
                if !v.is_finite() {
                    return Err(invalid(&"value is not finite"));
                }
                p.set_clamped(v);
            }
            Self::Usize(p) => {
                let v = value.trim().parse::<usize>().map_err(|e| invalid(&e))?;
                p.set_clamped(v);
            }
        }

        Ok(())
    }
}
