use std::sync::Arc;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use either::Either;
use serde::{Serialize, Deserialize};

pub type Dict<K = Arc<str>, V = Value> = BTreeMap<K, V>;

/// Represents any valid metadata value.
#[derive(Debug, Serialize, Hash, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Num(Num),
    String(Arc<str>),
    Array(Arc<Vec<Value>>),
    Dict(Arc<Dict>),
}

impl Value {
    pub fn to_null(&self) -> Option<()> {
        match self {
            Value::Null => Some(()),
            _ => None
        }
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None
        }
    }

    pub fn to_num(&self) -> Option<Num> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None
        }
    }

    pub fn into_str(self) -> Result<Arc<str>, Value> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(self),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None
        }
    }

    pub fn into_vec(self) -> Result<Arc<Vec<Value>>, Value> {
        match self {
            Value::Array(v) => Ok(v),
            _ => Err(self)
        }
    }

    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v.as_slice()),
            _ => None
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(v) => Some(&**v),
            _ => None
        }
    }

    pub fn into_dict(self) -> Result<Arc<Dict>, Value> {
        match self {
            Value::Dict(v) => Ok(v),
            _ => Err(self)
        }
    }

    /// Looks up a `.`-separated key path through nested dictionaries.
    ///
    /// ```rust
    /// use quire::{dict, value::Value};
    ///
    /// let value = Value::from(dict!["a" => dict!["b" => 7u8]]);
    /// assert_eq!(value.lookup("a.b"), Some(&Value::from(7u8)));
    /// assert_eq!(value.lookup("a.c"), None);
    /// ```
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(self, |value, key| value.as_dict()?.get(key))
    }
}

macro_rules! impl_from_primitive {
    ($($T:ty),+ => $E:ident::$kind:ident) => {
        $(
            impl From<$T> for $E {
                fn from(value: $T) -> Self {
                    $E::$kind(value.into())
                }
            }
        )+
    };
}

impl_from_primitive!(bool => Value::Bool);
impl_from_primitive!(&str => Value::String);
impl_from_primitive!(std::borrow::Cow<'_, str> => Value::String);
impl_from_primitive!(String => Value::String);
impl_from_primitive!(Arc<str> => Value::String);
impl_from_primitive!(Arc<Vec<Value>> => Value::Array);
impl_from_primitive!(Arc<Dict> => Value::Dict);
impl_from_primitive!(u8, u16, u32, u64, u128, usize => Value::Num);
impl_from_primitive!(i8, i16, i32, i64, i128, isize => Value::Num);
impl_from_primitive!(f64 => Value::Num);

impl From<()> for Value  {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<A, B> From<Either<A, B>> for Value where Value: From<A>, Value: From<B> {
    fn from(value: Either<A, B>) -> Self {
        either::for_both!(value, v => v.into())
    }
}

impl<T> From<Option<T>> for Value where Value: From<T> {
    fn from(value: Option<T>) -> Self {
        value.map(Value::from).unwrap_or(Value::Null)
    }
}

impl<T> From<Vec<T>> for Value where Value: From<T> {
    fn from(value: Vec<T>) -> Self {
        value.into_iter()
            .map(Value::from)
            .collect()
    }
}

impl<K, V> From<Dict<K, V>> for Value where Arc<str>: From<K>, Value: From<V> {
    fn from(value: Dict<K, V>) -> Self {
        let dict = value.into_iter()
            .map(|(k, v)| (<Arc::<str>>::from(k), Value::from(v)))
            .collect::<Dict>();

        Value::Dict(Arc::new(dict))
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        let vec = iter.into_iter().collect::<Vec<Value>>();
        Value::Array(Arc::from(vec))
    }
}

/// A signed, unsigned, or floating point numeric value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Num {
    /// An 8-bit unsigned integer.
    U8(u8),
    /// A 16-bit unsigned integer.
    U16(u16),
    /// A 32-bit unsigned integer.
    U32(u32),
    /// A 64-bit unsigned integer.
    U64(u64),
    /// A 128-bit unsigned integer.
    U128(u128),
    /// An unsigned integer of platform width.
    USize(usize),
    /// An 8-bit signed integer.
    I8(i8),
    /// A 16-bit signed integer.
    I16(i16),
    /// A 32-bit signed integer.
    I32(i32),
    /// A 64-bit signed integer.
    I64(i64),
    /// A 128-bit signed integer.
    I128(i128),
    /// A signed integer of platform width.
    ISize(isize),
    /// A 64-bit float.
    F64(f64),
}

impl Num {
    /// The exact integer value of `self`: `Ok` if non-negative, `Err` if
    /// negative. `None` for floats that aren't finite integers.
    pub fn integer(self) -> Option<Result<u128, i128>> {
        Some(match self {
            Num::U8(v) => Ok(v as u128),
            Num::U16(v) => Ok(v as u128),
            Num::U32(v) => Ok(v as u128),
            Num::U64(v) => Ok(v as u128),
            Num::U128(v) => Ok(v),
            Num::USize(v) => Ok(v as u128),
            Num::I8(v) => i128::from(v).try_into().map_err(|_| v as i128),
            Num::I16(v) => i128::from(v).try_into().map_err(|_| v as i128),
            Num::I32(v) => i128::from(v).try_into().map_err(|_| v as i128),
            Num::I64(v) => i128::from(v).try_into().map_err(|_| v as i128),
            Num::I128(v) => v.try_into().map_err(|_| v),
            Num::ISize(v) => (v as i128).try_into().map_err(|_| v as i128),
            Num::F64(v) if v.is_finite() && v.fract() == 0.0 => {
                if v >= 0.0 && v < u128::MAX as f64 {
                    Ok(v as u128)
                } else if v < 0.0 && v >= i128::MIN as f64 {
                    Err(v as i128)
                } else {
                    return None;
                }
            }
            Num::F64(_) => return None,
        })
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Num::F64(v) => v,
            _ => match self.integer() {
                Some(Ok(v)) => v as f64,
                Some(Err(v)) => v as f64,
                None => f64::NAN,
            }
        }
    }
}

impl PartialEq for Num {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Num { }

impl std::hash::Hash for Num {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self.integer() {
            Some(Ok(v)) => v.hash(state),
            Some(Err(v)) => v.hash(state),
            None => self.to_f64().to_bits().hash(state),
        }
    }
}

impl PartialOrd for Num {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Num {
    /// ```rust
    /// use quire::value::Num;
    ///
    /// assert!(Num::from(-1i8) < Num::from(0u8));
    /// assert!(Num::from(-0i8) == Num::from(0u8));
    /// assert!(Num::from(10i32) == Num::from(10u64));
    /// assert!(Num::from(-2i8) > Num::from(-3i8));
    /// assert!(Num::from(5u32) > Num::from(-1i64));
    /// assert!(Num::from(2.0f64) == Num::from(2u8));
    /// assert!(Num::from(2.5f64) > Num::from(2u8));
    /// assert!(Num::from(-0.5f64) < Num::from(0u8));
    /// ```
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.integer(), other.integer()) {
            (Some(Ok(a)), Some(Ok(b))) => a.cmp(&b),
            (Some(Ok(_)), Some(Err(_))) => Ordering::Greater,
            (Some(Err(_)), Some(Ok(_))) => Ordering::Less,
            (Some(Err(a)), Some(Err(b))) => a.cmp(&b),
            _ => self.to_f64().total_cmp(&other.to_f64()),
        }
    }
}

macro_rules! impl_from_for_num_value {
    ($($T:ty: $V:ident),* $(,)?) => ($(
        impl From<$T> for Num {
            fn from(value: $T) -> Num {
                Num::$V(value)
            }
        }
    )*)
}

impl_from_for_num_value! {
    u8: U8, u16: U16, u32: U32, u64: U64, u128: U128, usize: USize,
    i8: I8, i16: I16, i32: I32, i64: I64, i128: I128, isize: ISize,
    f64: F64,
}

macro_rules! impl_try_from_value {
    ($($T:ty),+ => | $v:ident | $e:expr) => {
        $(
            impl TryFrom<$crate::value::Value> for $T {
                type Error = Value;

                fn try_from($v: $crate::value::Value) -> Result<Self, Self::Error> {
                    (|| $e)()
                }
            }
        )+
    };
}

impl_try_from_value!(() => |v| v.to_null().ok_or(v));
impl_try_from_value!(bool => |v| v.to_bool().ok_or(v));
impl_try_from_value!(Arc<str> => |v| v.into_str());
impl_try_from_value!(String => |v| v.into_str().map(|s| s.to_string()));
impl_try_from_value!(Arc<Dict> => |v| v.into_dict());
impl_try_from_value!(Num => |v| v.to_num().ok_or(v));
impl_try_from_value!(f64 => |v| v.to_num().map(Num::to_f64).ok_or(v));

impl_try_from_value!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize => |v| {
    let exact = v.to_num().and_then(Num::integer);
    match exact {
        Some(Ok(n)) => n.try_into().ok(),
        Some(Err(n)) => n.try_into().ok(),
        None => None,
    }.ok_or(v)
});

impl<T: TryFrom<Value, Error = Value>> TryFrom<Value> for Vec<T> {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let arc = value.into_vec()?;
        match Arc::try_unwrap(arc) {
            Ok(vec) => vec.into_iter().map(|v| v.try_into()).collect(),
            Err(arc) => arc.iter().cloned().map(|v| v.try_into()).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_nested_json() {
        let value: Value = serde_json::from_str(r#"{"a": [1, -2, 3.5], "b": {"c": null}}"#).unwrap();
        let a = value.lookup("a").and_then(|v| v.as_slice()).unwrap();
        assert_eq!(a[0], Value::from(1u8));
        assert_eq!(a[1], Value::from(-2i8));
        assert_eq!(a[2], Value::from(3.5f64));
        assert_eq!(value.lookup("b.c"), Some(&Value::Null));
    }

    #[test]
    fn integer_conversions_respect_sign() {
        assert_eq!(i32::try_from(Value::from(-5i64)).ok(), Some(-5));
        assert_eq!(u8::try_from(Value::from(-5i64)).ok(), None);
        assert_eq!(u8::try_from(Value::from(4.0f64)).ok(), Some(4));
        assert_eq!(u8::try_from(Value::from(4.5f64)).ok(), None);
    }
}
