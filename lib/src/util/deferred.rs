use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::{Error, Result};

type Thunk<T> = Box<dyn FnOnce() -> Result<T> + Send>;

/// A fallible value computed at most once, on first demand.
///
/// Clones share the same cell: whichever clone forces first runs the
/// computation, concurrent callers block until it finishes, and everyone
/// observes the same memoized `Ok` or `Err`.
pub struct Deferred<T>(Arc<Lazy<Result<T>, Thunk<T>>>);

impl<T: Send + Sync + 'static> Deferred<T> {
    #[inline(always)]
    pub fn new<F>(with: F) -> Self
        where F: FnOnce() -> Result<T> + Send + 'static
    {
        Deferred(Arc::new(Lazy::new(Box::new(with))))
    }

    /// A cell whose value is already known.
    pub fn ready(value: T) -> Self {
        let cell = Deferred::new(move || Ok(value));
        Lazy::force(&*cell.0);
        cell
    }

    #[inline(always)]
    pub fn force_in_background(&self) {
        let lazy = self.0.clone();
        rayon::spawn(move || { Lazy::force(&*lazy); });
    }

    #[inline]
    pub fn force_ref(&self) -> Result<&T, &Error> {
        Lazy::force(&*self.0).as_ref()
    }

    /// Forces the value, cloning the memoized error on failure.
    #[inline]
    pub fn force(&self) -> Result<&T> {
        self.force_ref().map_err(|e| e.clone())
    }

    pub fn is_computed(&self) -> bool {
        Lazy::get(&*self.0).is_some()
    }

    /// A new cell computed from this one's value. Nothing is forced until the
    /// returned cell is.
    pub fn then<U, F>(&self, f: F) -> Deferred<U>
        where U: Send + Sync + 'static, F: FnOnce(&T) -> Result<U> + Send + 'static
    {
        let this = self.clone();
        Deferred::new(move || f(this.force()?))
    }
}

impl<T> Clone for Deferred<T> {
    #[inline(always)]
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Lazy::get(&*self.0) {
            Some(Ok(value)) => f.debug_tuple("Deferred").field(value).finish(),
            Some(Err(e)) => f.debug_tuple("Deferred").field(&format_args!("Err({e})")).finish(),
            None => f.write_str("Deferred(<pending>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::Deferred;

    #[test]
    fn computes_once_across_clones_and_threads() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let cell = Deferred::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(42usize)
        });

        assert!(!cell.is_computed());
        std::thread::scope(|s| {
            for _ in 0..8 {
                let cell = cell.clone();
                s.spawn(move || assert_eq!(*cell.force().unwrap(), 42));
            }
        });

        assert!(cell.is_computed());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn errors_are_memoized() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let cell: Deferred<()> = Deferred::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            crate::err!("boom")
        });

        assert!(cell.force().is_err());
        assert!(cell.force().is_err());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn then_is_lazy() {
        let base = Deferred::new(|| Ok(String::from("abc")));
        let len = base.then(|s| Ok(s.len()));
        assert!(!base.is_computed());
        assert_eq!(*len.force().unwrap(), 3);
        assert!(base.is_computed());
    }
}
