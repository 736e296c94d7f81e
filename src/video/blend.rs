//! Porter-Duff composition operators and the blend factors that implement
//! them on alpha-premultiplied colors.

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::*;

/// Specifies how the source and destination are combined when drawing onto a
/// canvas. The `R`-prefixed operators are the reversed variants, with source
/// and destination swapped.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComposeMethod {
    Over,
    In,
    Out,
    Atop,
    RoverOver,
    Rin,
    Rout,
    Ratop,
    Xor,
    Plus,
    Copy,
}

impl Default for ComposeMethod {
    fn default() -> Self {
        ComposeMethod::Over
    }
}

/// The value a blend factor is derived from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendValue {
    SourceColor,
    SourceAlpha,
    DestinationColor,
    DestinationAlpha,
}

/// A factor that source or destination colors are multiplied with before
/// they get summed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendFactor {
    Zero,
    One,
    Value(BlendValue),
    OneMinusValue(BlendValue),
}

/// Returns the `(source, destination)` blend factors of a composition
/// operator.
pub fn blend_factors(method: ComposeMethod) -> (BlendFactor, BlendFactor) {
    use self::BlendFactor::*;
    use self::BlendValue::*;

    match method {
        ComposeMethod::Over => (One, OneMinusValue(SourceAlpha)),
        ComposeMethod::In => (Value(DestinationAlpha), Zero),
        ComposeMethod::Out => (OneMinusValue(DestinationAlpha), Zero),
        ComposeMethod::Atop => (Value(DestinationAlpha), OneMinusValue(SourceAlpha)),
        ComposeMethod::RoverOver => (OneMinusValue(DestinationAlpha), One),
        ComposeMethod::Rin => (Zero, Value(SourceAlpha)),
        ComposeMethod::Rout => (Zero, OneMinusValue(SourceAlpha)),
        ComposeMethod::Ratop => (OneMinusValue(DestinationAlpha), Value(SourceAlpha)),
        ComposeMethod::Xor => (OneMinusValue(DestinationAlpha), OneMinusValue(SourceAlpha)),
        ComposeMethod::Plus => (One, One),
        ComposeMethod::Copy => (One, Zero),
    }
}

impl ComposeMethod {
    pub const ALL: [ComposeMethod; 11] = [
        ComposeMethod::Over,
        ComposeMethod::In,
        ComposeMethod::Out,
        ComposeMethod::Atop,
        ComposeMethod::RoverOver,
        ComposeMethod::Rin,
        ComposeMethod::Rout,
        ComposeMethod::Ratop,
        ComposeMethod::Xor,
        ComposeMethod::Plus,
        ComposeMethod::Copy,
    ];

    #[inline]
    pub fn factors(self) -> (BlendFactor, BlendFactor) {
        blend_factors(self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComposeMethod::Over => "over",
            ComposeMethod::In => "in",
            ComposeMethod::Out => "out",
            ComposeMethod::Atop => "atop",
            ComposeMethod::RoverOver => "rover",
            ComposeMethod::Rin => "rin",
            ComposeMethod::Rout => "rout",
            ComposeMethod::Ratop => "ratop",
            ComposeMethod::Xor => "xor",
            ComposeMethod::Plus => "plus",
            ComposeMethod::Copy => "copy",
        }
    }
}

impl fmt::Display for ComposeMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComposeMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ComposeMethod::ALL
            .iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .cloned()
            .ok_or_else(|| Error::ComposeMethodInvalid(s.to_owned()))
    }
}

/// Converts from the discriminant order `Over = 0` to `Copy = 10`.
impl TryFrom<u8> for ComposeMethod {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self> {
        ComposeMethod::ALL
            .get(v as usize)
            .cloned()
            .ok_or_else(|| Error::ComposeMethodInvalid(v.to_string()))
    }
}

impl BlendFactor {
    /// Evaluates the factor of one color component in premultiplied space.
    #[inline]
    pub fn eval(self, src: f32, src_alpha: f32, dst: f32, dst_alpha: f32) -> f32 {
        match self {
            BlendFactor::Zero => 0.0,
            BlendFactor::One => 1.0,
            BlendFactor::Value(v) => v.eval(src, src_alpha, dst, dst_alpha),
            BlendFactor::OneMinusValue(v) => 1.0 - v.eval(src, src_alpha, dst, dst_alpha),
        }
    }
}

impl BlendValue {
    #[inline]
    fn eval(self, src: f32, src_alpha: f32, dst: f32, dst_alpha: f32) -> f32 {
        match self {
            BlendValue::SourceColor => src,
            BlendValue::SourceAlpha => src_alpha,
            BlendValue::DestinationColor => dst,
            BlendValue::DestinationAlpha => dst_alpha,
        }
    }
}
