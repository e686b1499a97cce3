//! Collection folding
//!
//! Batched collections carry a mix of per-item property arrays and
//! shared scalar values. Folding compresses them into two tiers:
//! dense per-item records holding only the properties that genuinely
//! vary, plus one shared defaults map encoding everything else exactly
//! once. For large collections sharing most of their styling this is
//! a substantial size win on the wire.
//!
//! Folding is total: every key ends up either fully per-item or fully
//! defaulted. Partial arrays are a definition error and abort the
//! export rather than misrepresent the figure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FoldError, FoldResult};

/// One property value as supplied by the host for a collection.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    /// No value given; the key must have a default
    Missing,

    /// A bare scalar shared by every item
    Scalar(Value),

    /// One value per item (or a broadcastable length-0/1 array)
    Items(Vec<Value>),
}

impl PropValue {
    fn is_missing(&self) -> bool {
        matches!(self, PropValue::Missing)
            || matches!(self, PropValue::Scalar(Value::Null))
    }
}

/// Result of folding: `records.len()` per-item maps plus the shared
/// defaults, each default encoded exactly once.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Folded {
    pub records: Vec<BTreeMap<String, Value>>,
    pub defaults: BTreeMap<String, Value>,
}

/// Fold per-item property values into records plus shared defaults.
///
/// `N` is the maximum length across the supplied arrays. Per key:
/// a missing/null or empty value must have an entry in `defaults`;
/// a scalar becomes a used default; a length-1 array broadcasts as a
/// default when `N > 1` (a length-1 array when `N == 1` is genuine
/// per-item data); a length-`N` array is promoted to per-item; any
/// other length is a definition error.
pub fn fold(
    properties: &BTreeMap<String, PropValue>,
    defaults: &BTreeMap<String, Value>,
) -> FoldResult<Folded> {
    let n = properties
        .values()
        .filter_map(|v| match v {
            PropValue::Items(items) => Some(items.len()),
            _ => None,
        })
        .max()
        .unwrap_or(0);

    let mut out = Folded {
        records: vec![BTreeMap::new(); n],
        defaults: BTreeMap::new(),
    };

    let mut use_default = |key: &str, out: &mut Folded| -> FoldResult<()> {
        match defaults.get(key) {
            Some(value) => {
                out.defaults.insert(key.to_string(), value.clone());
                Ok(())
            }
            None => Err(FoldError::MissingDefault {
                key: key.to_string(),
            }),
        }
    };

    for (key, value) in properties {
        if value.is_missing() {
            use_default(key, &mut out)?;
            continue;
        }
        match value {
            PropValue::Missing => unreachable!("handled above"),
            PropValue::Scalar(v) => {
                out.defaults.insert(key.clone(), v.clone());
            }
            PropValue::Items(items) => match items.len() {
                0 => use_default(key, &mut out)?,
                len if len == n => {
                    for (record, item) in out.records.iter_mut().zip(items) {
                        record.insert(key.clone(), item.clone());
                    }
                }
                1 => {
                    out.defaults.insert(key.clone(), items[0].clone());
                }
                len => {
                    return Err(FoldError::LengthMismatch {
                        key: key.clone(),
                        len,
                        expected: n,
                    })
                }
            },
        }
    }

    Ok(out)
}
