use std::{fs, io};
use std::path::{Path, PathBuf};
use std::fmt::Debug;

use crate::error::{Result, Chainable};
use crate::value::Value;

pub trait Sink: Debug {
    fn write<V: Into<Value> + 'static>(&self, value: V) -> Result<()> {
        self.write_value(value.into())
    }

    fn write_value(&self, value: Value) -> Result<()>;

    /// Writes `bytes` verbatim.
    fn write_bytes(&self, bytes: &[u8]) -> Result<()>;
}

fn encode_value(to: &mut dyn io::Write, value: &Value) -> Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::Bool(b) => Ok(to.write_all(&[*b as u8])?),
        Value::String(s) => Ok(to.write_all(s.as_bytes())?),
        Value::Array(array) => array.iter().try_for_each(|v| encode_value(to, v)),
        Value::Num(n) => match n.integer() {
            Some(Ok(v)) => match u8::try_from(v) {
                Ok(byte) => Ok(to.write_all(&[byte])?),
                Err(_) => Ok(to.write_all(&v.to_le_bytes())?),
            },
            Some(Err(v)) => Ok(to.write_all(&v.to_le_bytes())?),
            None => Ok(to.write_all(&n.to_f64().to_le_bytes())?),
        },
        Value::Dict(dict) => {
            serde_json::to_writer_pretty(&mut *to, &**dict)?;
            Ok(())
        }
    }
}

impl Sink for fs::File {
    fn write_value(&self, value: Value) -> Result<()> {
        let mut file = io::BufWriter::new(self);
        encode_value(&mut file, &value)?;
        Ok(io::Write::flush(&mut file)?)
    }

    fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        let mut file: &fs::File = self;
        Ok(io::Write::write_all(&mut file, bytes)?)
    }
}

impl Sink for &Path {
    fn write_value(&self, value: Value) -> Result<()> {
        create_file(self)?.write_value(value)
    }

    fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        create_file(self)?.write_bytes(bytes)
    }
}

impl Sink for PathBuf {
    fn write_value(&self, value: Value) -> Result<()> {
        self.as_path().write_value(value)
    }

    fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.as_path().write_bytes(bytes)
    }
}

fn create_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).chain(error! {
            "failed to create parent directory",
            "directory" => parent.display()
        })?;
    }

    fs::File::create(path).chain(error! {
        "failed to open/create file for writing",
        "file path" => path.display()
    })
}
