//! Data module: field storage, layout, and the field registry.

pub mod field;
pub mod layout;
pub mod registry;
pub mod storage;

pub use field::{Field, FieldMeta, HostReadPass};
pub use layout::{BucketSpan, FieldLayout};
pub use registry::FieldId;
pub use storage::{DeviceStorage, Storage, VecStorage};

use std::fmt::{Debug, Display};

/// Scalar types a mirrored field can hold.
///
/// The `Pod` bound matches the device-storage requirement (buffers are
/// zero-initialized and copied bytewise); `NumCast` lets diagnostics widen
/// any scalar to `f64` for the fixed-precision device formatting.
pub trait FieldScalar:
    bytemuck::Pod + PartialEq + Debug + Display + num_traits::NumCast + Send + Sync + 'static
{
}

impl<T> FieldScalar for T where
    T: bytemuck::Pod + PartialEq + Debug + Display + num_traits::NumCast + Send + Sync + 'static
{
}

/// Widen a scalar for diagnostic reporting.
#[inline]
pub(crate) fn to_f64<V: FieldScalar>(value: V) -> f64 {
    num_traits::cast(value).unwrap_or(f64::NAN)
}
