//! Typed node parameters.
//!
//! Every node exposes a flat table of named parameters. Each entry has a type
//! tag (integer, float, boolean), an optional range and a read-only flag.
//! Processor-specific parameters live in [`ParamCell`]s that the processor
//! shares with its node's control handle, so writes from the control thread
//! are visible to the audio thread without locking.
//!
//! ```
//! use arbor_core::{ParamCell, ParamValue, ParameterRange};
//!
//! let freq = ParamCell::float("frequency", ParameterRange::new(1.0, 20000.0, 440.0));
//! freq.set(ParamValue::Int(880)).unwrap();
//! assert_eq!(freq.get_f32(), 880.0);
//! assert!(freq.set(ParamValue::Bool(true)).is_err());
//! ```

use crate::error::ParameterError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Type tag for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    Integer,
    Float,
    Boolean,
}

impl ParamKind {
    pub fn name(&self) -> &'static str {
        match self {
            ParamKind::Integer => "integer",
            ParamKind::Float => "float",
            ParamKind::Boolean => "boolean",
        }
    }
}

/// Parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            Self::Int(_) => ParamKind::Integer,
            Self::Float(_) => ParamKind::Float,
            Self::Bool(_) => ParamKind::Boolean,
        }
    }

    /// Convert to f64 if numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            Self::Bool(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<f32> for ParamValue {
    fn from(f: f32) -> Self {
        Self::Float(f as f64)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for ParamValue {
    fn from(i: i32) -> Self {
        Self::Int(i as i64)
    }
}

impl From<usize> for ParamValue {
    fn from(i: usize) -> Self {
        Self::Int(i as i64)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Inclusive value range with a default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl ParameterRange {
    /// `default` is clamped into `min..=max`.
    pub fn new(min: f64, max: f64, default: f64) -> Self {
        debug_assert!(max >= min, "max must not be less than min");
        Self {
            min,
            max,
            default: default.clamp(min, max),
        }
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Description of one entry in a node's parameter table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    pub kind: ParamKind,
    pub range: Option<ParameterRange>,
    pub read_only: bool,
}

impl ParamInfo {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            range: None,
            read_only: false,
        }
    }

    pub fn with_range(mut self, range: ParameterRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Checks `value` against this entry's type and range.
    ///
    /// Integers are accepted for float parameters; every other mismatch is
    /// rejected. Non-finite floats are always out of range.
    pub fn check(&self, value: ParamValue) -> Result<ParamValue, ParameterError> {
        if self.read_only {
            return Err(ParameterError::ReadOnly(self.name.clone()));
        }

        let value = match (self.kind, value) {
            (ParamKind::Float, ParamValue::Int(i)) => ParamValue::Float(i as f64),
            (kind, v) if kind == v.kind() => v,
            (kind, v) => {
                return Err(ParameterError::TypeMismatch {
                    name: self.name.clone(),
                    expected: kind.name(),
                    found: v.kind().name(),
                })
            }
        };

        if let Some(number) = value.as_f64() {
            let (min, max) = self
                .range
                .map(|r| (r.min, r.max))
                .unwrap_or((f64::MIN, f64::MAX));
            if !number.is_finite() || number < min || number > max {
                return Err(ParameterError::OutOfRange {
                    name: self.name.clone(),
                    value: number,
                    min,
                    max,
                });
            }
        }

        Ok(value)
    }
}

/// Lock-free storage for one processor parameter.
///
/// The value is kept as raw bits in an `AtomicU64`; the cell's kind decides
/// how they are read back.
#[derive(Debug)]
pub struct ParamCell {
    info: ParamInfo,
    bits: AtomicU64,
}

impl ParamCell {
    pub fn new(info: ParamInfo, initial: ParamValue) -> Arc<Self> {
        Arc::new(Self {
            bits: AtomicU64::new(encode(initial)),
            info,
        })
    }

    pub fn float(name: &str, range: ParameterRange) -> Arc<Self> {
        let info = ParamInfo::new(name, ParamKind::Float).with_range(range);
        Self::new(info, ParamValue::Float(range.default))
    }

    pub fn integer(name: &str, range: ParameterRange) -> Arc<Self> {
        let info = ParamInfo::new(name, ParamKind::Integer).with_range(range);
        Self::new(info, ParamValue::Int(range.default as i64))
    }

    pub fn boolean(name: &str, default: bool) -> Arc<Self> {
        Self::new(
            ParamInfo::new(name, ParamKind::Boolean),
            ParamValue::Bool(default),
        )
    }

    #[inline]
    pub fn info(&self) -> &ParamInfo {
        &self.info
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn get(&self) -> ParamValue {
        let bits = self.bits.load(Ordering::Acquire);
        match self.info.kind {
            ParamKind::Integer => ParamValue::Int(bits as i64),
            ParamKind::Float => ParamValue::Float(f64::from_bits(bits)),
            ParamKind::Boolean => ParamValue::Bool(bits != 0),
        }
    }

    /// Validated write. On error the stored value is unchanged.
    pub fn set(&self, value: ParamValue) -> Result<(), ParameterError> {
        let value = self.info.check(value)?;
        self.bits.store(encode(value), Ordering::Release);
        Ok(())
    }

    /// Audio-thread read of a numeric parameter.
    #[inline]
    pub fn get_f32(&self) -> f32 {
        self.get().as_f64().unwrap_or(0.0) as f32
    }

    #[inline]
    pub fn get_bool(&self) -> bool {
        self.bits.load(Ordering::Acquire) != 0
    }
}

fn encode(value: ParamValue) -> u64 {
    match value {
        ParamValue::Int(i) => i as u64,
        ParamValue::Float(f) => f.to_bits(),
        ParamValue::Bool(b) => b as u64,
    }
}
