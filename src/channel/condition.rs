// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Symbolic comparisons used to gate Condition groups
//!
//! Comparisons are built explicitly with [`compare`] (or the `eq`/`ne`/...
//! shorthands). `==` on [`Channel`] stays channel identity and never builds a
//! condition.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use super::placeholder::{self, decode};
use super::{Channel, ChannelSet, ExtractChannels};
use crate::errors::{GraphError, GraphResult};

/// Comparison operator of a condition expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl ComparisonOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

impl std::fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "==" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            other => Err(format!("Unknown comparison operator: {}", other)),
        }
    }
}

/// One side of a comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Operand {
    Channel(Channel),
    Value(Value),
}

impl Operand {
    /// Read an operand from a raw value.
    ///
    /// A string that carries a placeholder must decode to a channel; it never
    /// falls back to a literal.
    pub fn from_value(value: Value) -> GraphResult<Self> {
        match value {
            Value::String(text) if text.contains(placeholder::OPEN) => {
                decode(&text).map(Self::Channel)
            }
            other => Ok(Self::Value(other)),
        }
    }

    pub fn as_channel(&self) -> Option<&Channel> {
        match self {
            Self::Channel(c) => Some(c),
            Self::Value(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for Operand {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(c) => write!(f, "{}", c),
            Self::Value(v) => write!(f, "{}", v),
        }
    }
}

impl From<Channel> for Operand {
    fn from(c: Channel) -> Self {
        Self::Channel(c)
    }
}

impl From<&Channel> for Operand {
    fn from(c: &Channel) -> Self {
        Self::Channel(c.clone())
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Self::Value(Value::String(s.to_string()))
    }
}

impl From<i32> for Operand {
    fn from(n: i32) -> Self {
        Self::Value(Value::from(n))
    }
}

impl From<i64> for Operand {
    fn from(n: i64) -> Self {
        Self::Value(Value::from(n))
    }
}

impl From<f64> for Operand {
    fn from(n: f64) -> Self {
        Self::Value(Value::from(n))
    }
}

impl From<bool> for Operand {
    fn from(b: bool) -> Self {
        Self::Value(Value::Bool(b))
    }
}

/// A condition expression: `left <op> right`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionOperator {
    pub left: Operand,
    #[serde(rename = "op")]
    pub operator: ComparisonOp,
    pub right: Operand,
}

impl ConditionOperator {
    /// Channels referenced by either operand
    pub fn channels(&self) -> Vec<&Channel> {
        [&self.left, &self.right]
            .into_iter()
            .filter_map(Operand::as_channel)
            .collect()
    }
}

impl std::fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)
    }
}

impl ExtractChannels for ConditionOperator {
    fn collect_channels(&self, set: &mut ChannelSet) -> GraphResult<()> {
        for operand in [&self.left, &self.right] {
            match operand {
                Operand::Channel(c) => {
                    set.insert(c.clone());
                }
                Operand::Value(v) => v.collect_channels(set)?,
            }
        }
        Ok(())
    }
}

/// Build a condition expression
///
/// Channel operands must be parameter channels; artifacts cannot be compared.
pub fn compare(
    operator: ComparisonOp,
    left: impl Into<Operand>,
    right: impl Into<Operand>,
) -> GraphResult<ConditionOperator> {
    let left = left.into();
    let right = right.into();

    for operand in [&left, &right] {
        if let Some(channel) = operand.as_channel() {
            if !channel.is_parameter() {
                return Err(GraphError::type_mismatch(format!(
                    "cannot compare artifact channel '{}' in a condition",
                    channel.full_name()
                )));
            }
        }
    }

    Ok(ConditionOperator {
        left,
        operator,
        right,
    })
}

pub fn eq(left: impl Into<Operand>, right: impl Into<Operand>) -> GraphResult<ConditionOperator> {
    compare(ComparisonOp::Eq, left, right)
}

pub fn ne(left: impl Into<Operand>, right: impl Into<Operand>) -> GraphResult<ConditionOperator> {
    compare(ComparisonOp::Ne, left, right)
}

pub fn lt(left: impl Into<Operand>, right: impl Into<Operand>) -> GraphResult<ConditionOperator> {
    compare(ComparisonOp::Lt, left, right)
}

pub fn le(left: impl Into<Operand>, right: impl Into<Operand>) -> GraphResult<ConditionOperator> {
    compare(ComparisonOp::Le, left, right)
}

pub fn gt(left: impl Into<Operand>, right: impl Into<Operand>) -> GraphResult<ConditionOperator> {
    compare(ComparisonOp::Gt, left, right)
}

pub fn ge(left: impl Into<Operand>, right: impl Into<Operand>) -> GraphResult<ConditionOperator> {
    compare(ComparisonOp::Ge, left, right)
}
