//! Addressable parameters.
//!
//! Estimable values are referred to by path, e.g. `process[recruitment].r0`,
//! `selectivity[maturity].a50`, `process[mortality].m(2)` (1-based element)
//! or `process[recruitment].recruitment_multipliers{1995}` (year element).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Mutable view of a parameter, tagged by its shape.
#[derive(Debug)]
pub enum Target<'a> {
    Scalar(&'a mut f64),
    Vector(&'a mut [f64]),
    /// One value per model year starting at `first_year`.
    ByYear { first_year: u32, values: &'a mut [f64] },
}

impl Target<'_> {
    fn index(&self, shape: Shape) -> Result<Option<usize>, String> {
        match (self, shape) {
            (_, Shape::Scalar) => Ok(None),
            (Target::Scalar(_), _) => Err("parameter is a scalar and cannot be indexed".to_string()),
            (Target::Vector(values), Shape::Element(i)) | (Target::ByYear { values, .. }, Shape::Element(i)) => {
                if i == 0 || i > values.len() {
                    Err(format!("index {i} is outside 1..={}", values.len()))
                } else {
                    Ok(Some(i - 1))
                }
            }
            (Target::ByYear { first_year, values }, Shape::Year(year)) => year
                .checked_sub(*first_year)
                .map(|i| i as usize)
                .filter(|&i| i < values.len())
                .map(Some)
                .ok_or_else(|| format!("year {year} is not covered by the parameter")),
            (Target::Vector(_), Shape::Year(_)) => {
                Err("parameter is not indexed by year".to_string())
            }
        }
    }

    /// Write `value`. A whole-parameter write to a vector sets every element.
    pub fn set(self, shape: Shape, value: f64) -> Result<(), String> {
        let index = self.index(shape)?;
        match (self, index) {
            (Target::Scalar(v), _) => *v = value,
            (Target::Vector(values), None) | (Target::ByYear { values, .. }, None) => values.fill(value),
            (Target::Vector(values), Some(i)) | (Target::ByYear { values, .. }, Some(i)) => values[i] = value,
        }
        Ok(())
    }

    /// Read the value. Reading a whole vector needs it to hold one element.
    pub fn get(&self, shape: Shape) -> Result<f64, String> {
        match (self, self.index(shape)?) {
            (Target::Scalar(v), _) => Ok(**v),
            (Target::Vector(values), Some(i)) | (Target::ByYear { values, .. }, Some(i)) => Ok(values[i]),
            (Target::Vector(values), None) | (Target::ByYear { values, .. }, None) => match values {
                [single] => Ok(*single),
                _ => Err("parameter holds several values; address one element".to_string()),
            },
        }
    }
}

/// Which part of a parameter a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    Scalar,
    /// 1-based vector element.
    Element(usize),
    Year(u32),
}

/// Object families holding addressable parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressableKind {
    Selectivity,
    Process,
    AgeLength,
    LengthWeight,
}

impl AddressableKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "selectivity" => Some(Self::Selectivity),
            "process" => Some(Self::Process),
            "age_length" => Some(Self::AgeLength),
            "length_weight" => Some(Self::LengthWeight),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Selectivity => "selectivity",
            Self::Process => "process",
            Self::AgeLength => "age_length",
            Self::LengthWeight => "length_weight",
        }
    }
}

/// A parsed parameter path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addressable {
    pub kind: AddressableKind,
    pub label: String,
    pub parameter: String,
    pub shape: Shape,
}

impl FromStr for Addressable {
    type Err = String;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("'{path}' is not of the form kind[label].parameter");
        let path = path.trim();

        let (kind, rest) = path.split_once('[').ok_or_else(invalid)?;
        let (label, rest) = rest.split_once(']').ok_or_else(invalid)?;
        let parameter = rest.strip_prefix('.').ok_or_else(invalid)?;
        let kind = AddressableKind::parse(kind)
            .ok_or_else(|| format!("'{kind}' is not an addressable object type"))?;
        if label.is_empty() {
            return Err(invalid());
        }

        let (parameter, shape) = if let Some((name, index)) = parameter.split_once('(') {
            let index = index
                .strip_suffix(')')
                .and_then(|i| i.parse::<usize>().ok())
                .ok_or_else(|| format!("'{path}' has an invalid element index"))?;
            (name, Shape::Element(index))
        } else if let Some((name, year)) = parameter.split_once('{') {
            let year = year
                .strip_suffix('}')
                .and_then(|y| y.parse::<u32>().ok())
                .ok_or_else(|| format!("'{path}' has an invalid year"))?;
            (name, Shape::Year(year))
        } else {
            (parameter, Shape::Scalar)
        };
        if parameter.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            kind,
            label: label.to_string(),
            parameter: parameter.to_string(),
            shape,
        })
    }
}

impl fmt::Display for Addressable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}].{}", self.kind.as_str(), self.label, self.parameter)?;
        match self.shape {
            Shape::Scalar => Ok(()),
            Shape::Element(i) => write!(f, "({i})"),
            Shape::Year(year) => write!(f, "{{{year}}}"),
        }
    }
}
