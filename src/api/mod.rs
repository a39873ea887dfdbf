/*!
Device handles exercised by the conformance checker.

Each category trait mirrors the ASCOM device interface for that category, with
optional members defaulting to [`ASCOMError::NOT_IMPLEMENTED`](crate::ASCOMError::NOT_IMPLEMENTED).
Transports (COM adapters, Alpaca clients, in-process simulators) implement these
traits; the checker only ever talks to them through `Arc<dyn Trait>`.

Rather than modelling every historical interface revision (ICameraV1..V4 etc.)
as a separate type, members introduced in later revisions are gated at runtime on
the device's declared `interface_version()`, see [`Capabilities`].
*/

use crate::ASCOMResult;

#[macro_use]
mod macros;

/// Types related to the general [`Device`] trait.
pub mod device;
pub use device::Device;

mod capabilities;
pub use capabilities::Capabilities;

#[cfg(feature = "camera")]
mod guide_direction;
#[cfg(feature = "camera")]
pub use guide_direction::GuideDirection;

device_mod! {
    #[cfg(feature = "camera")]
    Camera = "camera",

    #[cfg(feature = "dome")]
    Dome = "dome",

    #[cfg(feature = "observing_conditions")]
    ObservingConditions = "observingconditions",

    #[cfg(feature = "switch")]
    Switch = "switch",
}
