#[doc(hidden)]
#[macro_export]
macro_rules! dict {
    ($($key:expr => $value:expr),* $(,)?) => ({
        #[allow(unused_mut)]
        let mut dict: $crate::value::Dict = $crate::value::Dict::new();
        $(dict.insert($key.into(), $value.into());)*
        dict
    });
}

#[doc(hidden)]
#[macro_export]
macro_rules! meta {
    ($($key:expr => $value:expr),* $(,)?) => (
        $crate::store::Meta::from($crate::dict![$($key => $value),*])
    );
}

pub use {dict, meta};
