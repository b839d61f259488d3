use std::fs;
use std::any::Any;
use std::path::Path;
use std::fmt::Debug;

use either::Either;

use crate::error::{Result, Chainable};
use crate::fstree::Entry;
use crate::value::Value;

pub trait Source: Debug {
    type Value: Into<Value> + 'static;

    fn read(self) -> Result<Self::Value>;

    fn try_read<T: TryFrom<Value> + 'static>(self) -> Result<T> where Self: Sized {
        let value = self.read()?;
        let value = match (Box::new(value) as Box<dyn Any>).downcast::<T>() {
            Ok(exact) => return Ok(*exact),
            Err(boxed) => *boxed.downcast::<Self::Value>()
                .map_err(|_| error!("source value changed type while reading"))?,
        };

        value.into()
            .try_into()
            .map_err(|_| error! {
                "invalid input value type",
                "expected" => std::any::type_name::<T>(),
                "actual type" => std::any::type_name::<Self::Value>(),
            })
    }

    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Decodes `bytes` as UTF-8 if possible, leaving them raw otherwise.
pub fn text_or_bytes(bytes: Vec<u8>) -> Either<String, Vec<u8>> {
    String::from_utf8(bytes)
        .map(Either::Left)
        .unwrap_or_else(|e| Either::Right(e.into_bytes()))
}

impl Source for Value {
    type Value = Self;

    fn read(self) -> Result<Self::Value> {
        Ok(self)
    }
}

impl Source for String {
    type Value = String;

    fn read(self) -> Result<Self> {
        Ok(self)
    }
}

impl Source for &[u8] {
    type Value = Either<String, Vec<u8>>;

    fn read(self) -> Result<Self::Value> {
        Ok(text_or_bytes(self.to_vec()))
    }
}

impl Source for &Path {
    type Value = Either<String, Vec<u8>>;

    fn read(self) -> Result<Self::Value> {
        let bytes = fs::read(self).chain(error! {
            "failed to read file",
            "file path" => self.display()
        })?;

        Ok(text_or_bytes(bytes))
    }

    fn path(&self) -> Option<&Path> {
        Some(self)
    }
}

impl Source for &Entry {
    type Value = <&'static Path as Source>::Value;

    fn read(self) -> Result<Self::Value> {
        self.path.as_ref().read()
    }

    fn path(&self) -> Option<&Path> {
        Some(&*self.path)
    }
}
