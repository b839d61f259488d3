use std::sync::Arc;

use crate::error::{ErrorDetail, Result};
use crate::value::Source;

pub trait Format: Sized {
    /// The data format's error type.
    type Error: serde::de::Error + ErrorDetail + 'static;

    /// The file extensions conventionally used for the format.
    const EXTENSIONS: &'static [&'static str];

    /// Parses `string` as the data format `Self` as a `T` or returns an error
    /// if the `string` is an invalid `T`. Usually called indirectly through
    /// [`Format::read()`] or [`Format::from_slice()`].
    fn from_str<T: serde::de::DeserializeOwned>(string: &str) -> Result<T, Self::Error>;

    fn read<I: Source, T: serde::de::DeserializeOwned>(input: I) -> Result<T> {
        let input = input.try_read::<Arc<str>>()?;
        Ok(Self::from_str(&input)?)
    }

    fn from_slice<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        let string = std::str::from_utf8(bytes)?;
        Ok(Self::from_str(string)?)
    }
}

macro_rules! impl_format {
    ($name:ident [$($ext:literal),+] : $func:expr, $E:ty) => (
        #[derive(Debug, Default, Copy, Clone)]
        pub struct $name;

        impl Format for $name {
            type Error = $E;

            const EXTENSIONS: &'static [&'static str] = &[$($ext),+];

            fn from_str<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, $E> {
                $func(s)
            }
        }
    );
}

impl_format!(Toml ["toml"]: toml::from_str, toml::de::Error);
impl_format!(Json ["json"]: serde_json::from_str, serde_json::error::Error);
impl_format!(Yaml ["yaml", "yml"]: serde_yaml::from_str, serde_yaml::Error);
