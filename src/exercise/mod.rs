/*!
Reusable exercise routines built on the timing, wait, completion and retry primitives.

Per-device testers describe *what* to check as data ([`PropertyCheck`] rows,
boundaries, mode groups) and hand it to the routines here, which know *how* to
read, write, classify and record.
*/

mod boundary;
mod modes;
mod operation;
mod property;
mod rate;

pub use boundary::{write_boundary, write_values, BoundaryValue};
pub use modes::{check_modes, ModeProbe, ModeState};
pub use operation::{check_state, restore, run_operation};
pub(crate) use property::is_implemented;
pub use property::{
    check_property_table, read_property, record_read, PropertyCheck, PropertyValue, Reader,
    Validator,
};
pub use rate::{check_table_rates, measure_rate};

/// Build a [`Reader`] for `$device` from one of its getters.
///
/// The value is converted with `PropertyValue::from` unless a conversion is given.
macro_rules! reader {
    ($device:ty, $method:ident) => {
        $crate::exercise::reader!($device, $method, $crate::exercise::PropertyValue::from)
    };
    ($device:ty, $method:ident, $convert:expr) => {{
        let read: $crate::exercise::Reader<$device> = |device| {
            futures::FutureExt::boxed(futures::TryFutureExt::map_ok(device.$method(), $convert))
        };
        read
    }};
}
pub(crate) use reader;
