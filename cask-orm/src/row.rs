//! # Row Mapping Support
//!
//! This module defines the backend-neutral `Row` returned by queries and the
//! traits that map rows into Rust values: `FromValue` for single column
//! values and `FromRow` for whole rows, with implementations covering
//! scalars, `Option`, and tuples.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Error;
use crate::value::Value;

/// One returned row: column names and values in select order.
///
/// Lookup by name ignores ASCII case, since backends disagree about the case
/// of unquoted identifiers they hand back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column append.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push(column.into());
        self.values.push(value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .map(|i| &self.values[i])
    }

    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A single column value decoded into a Rust type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, Error>;
}

macro_rules! impl_from_value {
    ($t:ty, $accessor:ident, $what:literal) => {
        impl FromValue for $t {
            fn from_value(value: &Value) -> Result<Self, Error> {
                value
                    .$accessor()
                    .ok_or_else(|| Error::Mapping(format!("{:?} is not {}", value, $what)))
            }
        }
    };
}

impl_from_value!(i64, as_i64, "an integer");
impl_from_value!(f64, as_f64, "a float");
impl_from_value!(bool, as_bool, "a boolean");
impl_from_value!(Uuid, as_uuid, "a uuid");
impl_from_value!(DateTime<Utc>, as_datetime, "a datetime");

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, Error> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| Error::Mapping(format!("{wide} overflows i32")))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Null => Err(Error::Mapping("null is not a string".to_string())),
            other => Ok(other.to_string()),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, Error> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

/// A whole row mapped into a Rust type.
///
/// Record types implement this by hand; scalars and tuples read by column
/// position, so `query_for_object::<(String, i64)>` works for ad-hoc
/// projections.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, Error>;
}

macro_rules! impl_scalar_from_row {
    ($($t:ty),+) => {
        $(
            impl FromRow for $t {
                fn from_row(row: &Row) -> Result<Self, Error> {
                    let value = row
                        .value_at(0)
                        .ok_or_else(|| Error::Mapping("row has no columns".to_string()))?;
                    <$t as FromValue>::from_value(value)
                }
            }
        )+
    };
}

impl_scalar_from_row!(i32, i64, f64, bool, String, Uuid, DateTime<Utc>);

impl<T: FromValue> FromRow for Option<T> {
    fn from_row(row: &Row) -> Result<Self, Error> {
        match row.value_at(0) {
            None => Ok(None),
            Some(value) => Option::<T>::from_value(value),
        }
    }
}

macro_rules! impl_from_row_tuple {
    ($( $t:ident => $idx:tt ),+) => {
        impl<$($t: FromValue),+> FromRow for ($($t,)+) {
            fn from_row(row: &Row) -> Result<Self, Error> {
                Ok((
                    $(
                        $t::from_value(row.value_at($idx).ok_or_else(|| {
                            Error::Mapping(format!("row has no column at index {}", $idx))
                        })?)?,
                    )+
                ))
            }
        }
    };
}

impl_from_row_tuple!(T1 => 0, T2 => 1);
impl_from_row_tuple!(T1 => 0, T2 => 1, T3 => 2);
impl_from_row_tuple!(T1 => 0, T2 => 1, T3 => 2, T4 => 3);
impl_from_row_tuple!(T1 => 0, T2 => 1, T3 => 2, T4 => 3, T5 => 4);
impl_from_row_tuple!(T1 => 0, T2 => 1, T3 => 2, T4 => 3, T5 => 4, T6 => 5);
impl_from_row_tuple!(T1 => 0, T2 => 1, T3 => 2, T4 => 3, T5 => 4, T6 => 5, T7 => 6);
impl_from_row_tuple!(T1 => 0, T2 => 1, T3 => 2, T4 => 3, T5 => 4, T6 => 5, T7 => 6, T8 => 7);
