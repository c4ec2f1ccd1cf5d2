use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::error::{require_positive, AirdropError, Result};

// Constant Cd values for subsonic bluff bodies; not Reynolds-dependent.
pub const BOX_DRAG_COEFFICIENT: f64 = 1.2;
pub const CYLINDER_DRAG_COEFFICIENT: f64 = 1.0;
pub const SPHERE_DRAG_COEFFICIENT: f64 = 0.47;

/// Aerodynamic description of an unpowered payload (SI units)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Payload {
    pub mass: f64,             // kg
    pub drag_coefficient: f64, // dimensionless
    pub reference_area: f64,   // m²
}

impl Default for Payload {
    fn default() -> Self {
        Self {
            mass: 1.0,
            drag_coefficient: 1.0,
            reference_area: 0.01,
        }
    }
}

impl Payload {
    pub fn new(mass: f64, drag_coefficient: f64, reference_area: f64) -> Result<Self> {
        let payload = Self {
            mass,
            drag_coefficient,
            reference_area,
        };
        payload.validate()?;
        Ok(payload)
    }

    /// Build a payload from a simple geometric shape
    pub fn from_shape(mass: f64, shape: PayloadShape) -> Result<Self> {
        require_positive("mass", mass)?;
        let (reference_area, drag_coefficient) = shape.aero_params()?;
        Self::new(mass, drag_coefficient, reference_area)
    }

    pub fn validate(&self) -> Result<()> {
        require_positive("mass", self.mass)?;
        require_positive("drag_coefficient", self.drag_coefficient)?;
        require_positive("reference_area", self.reference_area)?;
        Ok(())
    }

    /// Ballistic coefficient m / (Cd·A) in kg/m²
    pub fn ballistic_coefficient(&self) -> f64 {
        self.mass / (self.drag_coefficient * self.reference_area)
    }
}

/// Simple payload geometries with tabulated drag coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PayloadShape {
    /// Rectangular prism falling flat (face-on)
    Box { length: f64, width: f64, height: f64 },
    /// Circular cylinder, axis aligned with the flow
    Cylinder { radius: f64, height: f64 },
    Sphere { radius: f64 },
}

impl PayloadShape {
    /// Returns (reference_area m², drag_coefficient)
    pub fn aero_params(&self) -> Result<(f64, f64)> {
        match *self {
            PayloadShape::Box { length, width, height } => {
                require_positive("box length", length)?;
                require_positive("box width", width)?;
                require_positive("box height", height)?;
                // Horizontal cross-section when falling flat
                Ok((length * width, BOX_DRAG_COEFFICIENT))
            }
            PayloadShape::Cylinder { radius, height } => {
                require_positive("cylinder radius", radius)?;
                require_positive("cylinder height", height)?;
                Ok((PI * radius * radius, CYLINDER_DRAG_COEFFICIENT))
            }
            PayloadShape::Sphere { radius } => {
                require_positive("sphere radius", radius)?;
                Ok((PI * radius * radius, SPHERE_DRAG_COEFFICIENT))
            }
        }
    }
}

/// Shape name without dimensions, as typed by an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Box,
    Cylinder,
    Sphere,
}

impl FromStr for ShapeKind {
    type Err = AirdropError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "box" => Ok(ShapeKind::Box),
            "cylinder" => Ok(ShapeKind::Cylinder),
            "sphere" => Ok(ShapeKind::Sphere),
            _ => Err(AirdropError::UnknownPayloadShape(s.to_string())),
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ShapeKind::Box => "box",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Sphere => "sphere",
        };
        write!(f, "{name}")
    }
}

/// Payload entry of a config file.
///
/// Either explicit aerodynamics (`drag_coefficient`, `reference_area`) or a
/// `shape` whose drag coefficient and area come from the shape table. Fields
/// left out fall back to [`Payload::default`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PayloadSpec {
    pub mass: Option<f64>,
    pub drag_coefficient: Option<f64>,
    pub reference_area: Option<f64>,
    pub shape: Option<ShapeSpec>,
}

impl PayloadSpec {
    pub fn resolve(&self) -> Result<Payload> {
        let defaults = Payload::default();
        let mass = self.mass.unwrap_or(defaults.mass);
        match &self.shape {
            Some(shape) => {
                if self.drag_coefficient.is_some() || self.reference_area.is_some() {
                    return Err(AirdropError::invalid(
                        "payload",
                        "a shaped payload takes its drag coefficient and area from the shape",
                    ));
                }
                Payload::from_shape(mass, shape.to_shape()?)
            }
            None => Payload::new(
                mass,
                self.drag_coefficient.unwrap_or(defaults.drag_coefficient),
                self.reference_area.unwrap_or(defaults.reference_area),
            ),
        }
    }
}

/// Shape entry of a payload config, e.g. `{ "kind": "sphere", "radius": 0.1 }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShapeSpec {
    pub kind: String,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub radius: Option<f64>,
}

impl ShapeSpec {
    pub fn to_shape(&self) -> Result<PayloadShape> {
        let kind = self.kind.parse::<ShapeKind>()?;
        let required = |field: &'static str, value: Option<f64>| {
            value.ok_or_else(|| AirdropError::invalid(field, format!("required for a {kind} payload")))
        };
        let unused = |field: &'static str, value: Option<f64>| match value {
            Some(_) => Err(AirdropError::invalid(field, format!("not used by a {kind} payload"))),
            None => Ok(()),
        };

        match kind {
            ShapeKind::Box => {
                unused("radius", self.radius)?;
                Ok(PayloadShape::Box {
                    length: required("length", self.length)?,
                    width: required("width", self.width)?,
                    height: required("height", self.height)?,
                })
            }
            ShapeKind::Cylinder => {
                unused("length", self.length)?;
                unused("width", self.width)?;
                Ok(PayloadShape::Cylinder {
                    radius: required("radius", self.radius)?,
                    height: required("height", self.height)?,
                })
            }
            ShapeKind::Sphere => {
                unused("length", self.length)?;
                unused("width", self.width)?;
                unused("height", self.height)?;
                Ok(PayloadShape::Sphere {
                    radius: required("radius", self.radius)?,
                })
            }
        }
    }
}
