use std::{fmt, io};
use std::panic::Location;
use std::convert::Infallible;
use std::error::Error as StdError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub struct Error {
    detail: Vec<Box<dyn ErrorDetail>>,
    prev: Option<Box<Error>>,
    _location: &'static Location<'static>,
}

pub trait ErrorDetail: fmt::Display + fmt::Debug + Send + Sync {
    fn context(&self) -> Vec<(Option<String>, String)> { vec![] }

    fn fault(&self) -> Option<&Fault> { None }
}

/// The point in document processing at which a fatal error occurred.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Graph,
    Render,
}

/// Structured failures that callers may want to match on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// A name or path is absent from a store or graph.
    NotFound { name: String },
    /// Two parsers (or text processors) were registered under one id.
    DuplicateParserId(String),
    /// A tree already holds a leaf where a node or item was to be grafted.
    DuplicatePath(String),
    /// No registered parser declares the extension.
    UnresolvedParser(String),
    /// `path` was reached again while it was still being resolved. `stack`
    /// is the chain of includes that led back to it, ending in `path`.
    CyclicDependency { path: String, stack: Vec<String> },
    /// An external program failed to run or exited unsuccessfully.
    ExternalProcess { program: String, status: Option<i32>, stderr: String },
    /// A text element started like an include directive but wasn't one.
    IllFormedInclude(String),
}

impl Error {
    #[track_caller]
    pub fn from_std<E>(error: E) -> Self
        where E: StdError + Send + Sync + 'static
    {
        Error::from(Box::new(error) as Box<dyn StdError + Send + Sync>)
    }

    pub fn from_detail(detail: &dyn ErrorDetail) -> Self {
        Error::from(MakeshiftError::from(detail))
    }

    pub fn chain(self, mut other: Error) -> Self {
        #[inline]
        fn _chain(error: Error, behind: &mut Error) {
            if let Some(prev) = behind.prev.as_mut() {
                _chain(error, prev);
            } else {
                behind.prev = Some(Box::new(error));
            }
        }

        _chain(self, &mut other);
        other
    }

    /// The first [`Fault`] found in `self` or any error behind it.
    pub fn fault(&self) -> Option<&Fault> {
        self.detail.iter()
            .find_map(|detail| detail.fault())
            .or_else(|| self.prev.as_ref().and_then(|prev| prev.fault()))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.fault(), Some(Fault::NotFound { .. }))
    }
}

impl ErrorDetail for &(dyn StdError + Send + Sync) {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let mut ctxt = vec![];
        let mut error = self.source();
        while let Some(e) = error {
            ctxt.push((None, e.to_string()));
            error = e.source();
        }

        ctxt
    }
}

impl ErrorDetail for Box<dyn StdError + Send + Sync> {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let error: &(dyn StdError + Send + Sync) = &**self;
        error.context()
    }
}

impl<E: StdError + Send + Sync> ErrorDetail for Box<E> {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let error: &(dyn StdError + Send + Sync) = &**self;
        error.context()
    }
}

macro_rules! impl_error_detail_with_std_error {
    ($T:ty) => {
        impl $crate::error::ErrorDetail for $T {
            fn context(&self) -> Vec<(Option<String>, String)> {
                let error: &(dyn std::error::Error + Send + Sync) = self;
                error.context()
            }
        }
    }
}

impl_error_detail_with_std_error!(io::Error);
impl_error_detail_with_std_error!(toml::de::Error);
impl_error_detail_with_std_error!(serde_json::Error);
impl_error_detail_with_std_error!(serde_yaml::Error);
impl_error_detail_with_std_error!(image::ImageError);
impl_error_detail_with_std_error!(std::str::Utf8Error);

impl ErrorDetail for String { }
impl ErrorDetail for &str { }

impl ErrorDetail for Fault {
    fn context(&self) -> Vec<(Option<String>, String)> {
        match self {
            Fault::NotFound { name } => vec![(Some("name".into()), name.clone())],
            Fault::CyclicDependency { stack, .. } => {
                vec![(Some("cycle".into()), stack.join(" -> "))]
            }
            Fault::ExternalProcess { program, status, stderr } => {
                let mut ctxt = vec![(Some("program".into()), program.clone())];
                if let Some(status) = status {
                    ctxt.push((Some("exit status".into()), status.to_string()));
                }

                if !stderr.trim().is_empty() {
                    ctxt.push((Some("stderr".into()), stderr.trim().to_string()));
                }

                ctxt
            }
            _ => vec![],
        }
    }

    fn fault(&self) -> Option<&Fault> {
        Some(self)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::NotFound { name } => write!(f, "`{name}` was not found"),
            Fault::DuplicateParserId(id) => write!(f, "id `{id}` is already registered"),
            Fault::DuplicatePath(path) => write!(f, "path `{path}` is already occupied"),
            Fault::UnresolvedParser(ext) => write!(f, "no parser is registered for `{ext}`"),
            Fault::CyclicDependency { path, .. } => write!(f, "cyclic dependency on `{path}`"),
            Fault::ExternalProcess { program, .. } => write!(f, "external program `{program}` failed"),
            Fault::IllFormedInclude(text) => write!(f, "ill-formed include directive `{text}`"),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Parse => f.write_str("parse"),
            Stage::Graph => f.write_str("graph"),
            Stage::Render => f.write_str("render"),
        }
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        Error {
            detail: self.detail.iter()
                .map(|detail| MakeshiftError::from(&**detail))
                .map(|error| Box::new(error) as Box<dyn ErrorDetail>)
                .collect(),
            prev: self.prev.clone(),
            _location: self._location,
        }
    }
}

impl<T: ErrorDetail + 'static> From<T> for Error {
    #[track_caller]
    fn from(detail: T) -> Self {
        Error {
            prev: None,
            detail: vec![Box::new(detail)],
            _location: std::panic::Location::caller(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[derive(Copy, Clone)] struct Indent(usize);

        impl fmt::Display for Indent {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for _ in 0..(self.0 * 4) { write!(f, " ")? }
                Ok(())
            }
        }

        struct NestedError<'a>(Indent, &'a Error);

        impl fmt::Display for NestedError<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let NestedError(indent, e) = self;

                for detail in &e.detail {
                    let indent_line = format!("\n{indent}");

                    writeln!(f, "{indent}{}", format!("{:#}", detail).replace('\n', &indent_line))?;
                    if let Some(prev) = &e.prev {
                        NestedError(Indent(indent.0 + 1), prev).fmt(f)?;
                    }

                    for (key, value) in detail.context() {
                        let value = value.to_string().replace('\n', &indent_line);
                        if let Some(key) = key {
                            writeln!(f, "{indent}{key}: {value}")?;
                        } else {
                            writeln!(f, "{indent}{value}")?;
                        }
                    }

                    if std::env::var_os("RUST_BACKTRACE").is_some() {
                        writeln!(f, "{indent}[{}]", e._location)?;
                    }
                }

                Ok(())
            }
        }

        NestedError(Indent(0), self).fmt(f)
    }
}

#[derive(Debug)]
pub struct MakeshiftError {
    pub message: String,
    pub parameters: Vec<(Option<String>, String)>,
    pub fault: Option<Fault>,
}

impl From<&dyn ErrorDetail> for MakeshiftError {
    #[inline]
    fn from(detail: &dyn ErrorDetail) -> Self {
        MakeshiftError {
            message: detail.to_string(),
            parameters: detail.context(),
            fault: detail.fault().cloned(),
        }
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! err {
    ($($token:tt)*) => (Err($crate::error!($($token)*)));
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($msg:expr, $($rest:tt)*) => (
        $crate::error::Error::from($crate::error::MakeshiftError {
            message: $msg.to_string(),
            parameters: {
                #[allow(unused_mut)]
                let mut v: Vec<(Option<String>, String)> = Vec::new();
                $crate::error!(@param v $($rest)*);
                v
            },
            fault: None,
        })
    );

    ($msg:expr) => ( $crate::error!($msg,) );

    (@param $v:ident if $cond:expr => $value:expr $(, $rest:tt)*) => {
        if $cond {
            $v.push((None, $value.to_string()));
        }

        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident if $cond:expr => $key:expr => $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v if $cond => $key => $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident if $cond:expr => $key:expr => $value:expr) => {
        if $cond {
            $crate::error!(@param $v $key => $value);
        }
    };

    (@param $v:ident $key:expr => $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $key => $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $key:expr => $value:expr) => {
        $v.push((Some($key.to_string()), $value.to_string()));
    };

    (@param $v:ident $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $value:expr) => {
        $v.push((None, $value.to_string()));
    };

    (@param $v:ident $(,)?) => { };
}

impl fmt::Display for MakeshiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

impl ErrorDetail for MakeshiftError {
    fn context(&self) -> Vec<(Option<String>, String)> {
        self.parameters.clone()
    }

    fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }
}

pub trait Chainable<T> {
    fn chain(self, other: impl Into<Error>) -> Result<T>;

    fn chain_with<F, E>(self, f: F) -> Result<T>
        where F: FnOnce() -> E, E: Into<Error>;
}

impl<T, E: Into<Error>> Chainable<T> for Result<T, E> {
    #[track_caller]
    fn chain(self, other: impl Into<Error>) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().chain(other.into()))
        }
    }

    fn chain_with<F, Err>(self, f: F) -> Result<T>
        where F: FnOnce() -> Err, Err: Into<Error>,
     {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().chain(f().into()))
        }
    }
}

impl ErrorDetail for Infallible {
    fn context(&self) -> Vec<(Option<String>, String)> { vec![] }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_is_found_behind_context() {
        let error = Error::from(Fault::NotFound { name: "a/b".into() })
            .chain(error!("lookup failed", "stage" => Stage::Graph));

        assert!(error.is_not_found());
        assert_eq!(error.fault(), Some(&Fault::NotFound { name: "a/b".into() }));
    }

    #[test]
    fn fault_survives_clone() {
        let fault = Fault::CyclicDependency {
            path: "a.md".into(),
            stack: vec!["a.md".into(), "b.md".into(), "a.md".into()],
        };

        let error = Error::from(fault.clone()).clone();
        assert_eq!(error.fault(), Some(&fault));
        assert!(error.to_string().contains("a.md -> b.md -> a.md"));
    }

    #[test]
    fn makeshift_errors_have_no_fault() {
        let error: Result<()> = err!("plain", "key" => "value");
        let error = error.unwrap_err();
        assert!(error.fault().is_none());
        assert!(error.to_string().contains("key: value"));
    }
}
