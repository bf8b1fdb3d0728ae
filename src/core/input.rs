//! Request input types and the coercion rules applied to them.
//!
//! Packing and counting clients send loosely typed JSON: product codes may arrive as
//! numbers, quantities as numeric strings, and optional fields may be missing or
//! blank. These types keep the raw JSON values and expose the normalised view the
//! store and the reconciliation engine work with.

use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;

/// One product line as submitted by the packing step.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineInput {
    /// Product code
    #[serde(default)]
    pub codigo: Value,
    /// Product description
    #[serde(default)]
    pub descripcion: Value,
    /// Sub-lot label
    #[serde(default, alias = "lote_producto")]
    pub lote: Value,
    /// Packed quantity
    #[serde(default)]
    pub cantidad: Value,
    /// Package count
    #[serde(default)]
    pub paquetes: Value,
}

impl LineInput {
    /// Creates a line with a code and quantity and no optional fields.
    pub fn new(codigo: impl Into<String>, cantidad: f64) -> Self {
        Self {
            codigo: Value::String(codigo.into()),
            cantidad: Value::from(cantidad),
            ..Self::default()
        }
    }

    /// Sets the product description.
    #[must_use]
    pub fn with_description(mut self, descripcion: impl Into<String>) -> Self {
        self.descripcion = Value::String(descripcion.into());
        self
    }

    /// Sets the sub-lot label.
    #[must_use]
    pub fn with_sub_lot(mut self, lote: impl Into<String>) -> Self {
        self.lote = Value::String(lote.into());
        self
    }

    /// Sets the package count.
    #[must_use]
    pub fn with_packages(mut self, paquetes: f64) -> Self {
        self.paquetes = Value::from(paquetes);
        self
    }
}

/// A counted quantity keyed by product code (by-id validation).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeCount {
    /// Product code
    #[serde(default)]
    pub codigo: Value,
    /// `None` when the field was left out; an explicit `null` is kept
    #[serde(default, deserialize_with = "present")]
    pub cantidad: Option<Value>,
}

impl CodeCount {
    /// Creates a numeric count for a product code.
    pub fn new(codigo: impl Into<String>, cantidad: f64) -> Self {
        Self {
            codigo: Value::String(codigo.into()),
            cantidad: Some(Value::from(cantidad)),
        }
    }
}

/// A counted quantity keyed by line id or, failing that, product code
/// (by-code validation).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountEntry {
    /// Line id, preferred over the product code when present
    #[serde(default)]
    pub id: Value,
    /// Product code, used when no line id matches
    #[serde(default)]
    pub codigo: Value,
    /// Counted quantity; `None` when the field was left out
    #[serde(default, deserialize_with = "present")]
    pub cantidad: Option<Value>,
}

impl CountEntry {
    /// Creates a numeric count addressed by product code.
    pub fn by_code(codigo: impl Into<String>, cantidad: f64) -> Self {
        Self {
            id: Value::Null,
            codigo: Value::String(codigo.into()),
            cantidad: Some(Value::from(cantidad)),
        }
    }

    /// Creates a numeric count addressed by line id.
    pub fn by_line_id(id: i64, cantidad: f64) -> Self {
        Self {
            id: Value::from(id),
            codigo: Value::Null,
            cantidad: Some(Value::from(cantidad)),
        }
    }

    /// The line id, when one was sent as an integer or a numeric string.
    #[must_use]
    pub fn line_id(&self) -> Option<i64> {
        coerce_id(&self.id)
    }
}

// Distinguishes `"cantidad": null` from a missing field
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Reads the elements of a JSON array into `T`.
///
/// Returns `None` when `value` is not an array. Elements that are not objects, or
/// that do not fit `T`, come back as `None` so the caller decides whether to skip
/// them or reject the request.
#[must_use]
pub fn json_objects<T: DeserializeOwned>(value: &Value) -> Option<Vec<Option<T>>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .map(|item| item.as_object().and_then(|_| T::deserialize(item).ok()))
            .collect(),
    )
}

/// Normalises an integer id given as a JSON integer or a numeric string.
#[must_use]
pub fn coerce_id(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Normalises a text field: strings are trimmed, numbers are rendered, anything
/// else (and blank strings) is absent.
#[must_use]
pub fn coerce_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Normalises a quantity: JSON numbers and strings holding a finite number are
/// accepted, everything else (null, booleans, blank or non-numeric strings) is
/// absent.
#[must_use]
pub fn coerce_quantity(value: &Value) -> Option<f64> {
    let quantity = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    quantity.is_finite().then_some(quantity)
}
