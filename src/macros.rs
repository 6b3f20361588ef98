/// Macro to implement `From<T>` for newtype wrappers around primitive types.
#[macro_export]
macro_rules! impl_from_primitive {
    ($wrapper:ident, $primitive:ty) => {
        impl From<$primitive> for $wrapper {
            fn from(value: $primitive) -> Self {
                Self(value)
            }
        }

        impl From<$wrapper> for $primitive {
            fn from(wrapper: $wrapper) -> Self {
                wrapper.0
            }
        }
    };
}

/// Macro to give a strum-derived column enum the `name()` / `as_str()` accessors
/// and a conversion into [`polars::prelude::PlSmallStr`].
#[macro_export]
macro_rules! impl_column_name {
    ($col:ident) => {
        impl From<$col> for polars::prelude::PlSmallStr {
            fn from(value: $col) -> Self {
                value.as_str().into()
            }
        }

        impl $col {
            pub fn name(&self) -> polars::prelude::PlSmallStr {
                (*self).into()
            }

            pub fn as_str(&self) -> &'static str {
                self.into()
            }
        }
    };
}
