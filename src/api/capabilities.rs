use std::collections::BTreeMap;
use std::fmt;

/// Capability flags advertised by a device, plus its interface version.
///
/// Built once during the ReadCapabilities step and frozen afterwards; flags can
/// only be added through [`CapabilitiesBuilder`].
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    interface_version: i32,
    flags: BTreeMap<&'static str, bool>,
}

impl Capabilities {
    /// Start collecting flags for a device reporting the given interface version.
    pub fn builder(interface_version: i32) -> CapabilitiesBuilder {
        CapabilitiesBuilder(Self {
            interface_version,
            flags: BTreeMap::new(),
        })
    }

    /// Interface version declared by the device.
    pub const fn interface_version(&self) -> i32 {
        self.interface_version
    }

    /// Whether the device implements members introduced in the given interface version.
    pub const fn supports_version(&self, version: i32) -> bool {
        self.interface_version >= version
    }

    /// Value of a capability flag; capabilities that could not be read count as `false`.
    pub fn has(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Whether the flag was read successfully at all.
    pub fn is_known(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    /// Iterate over all known flags in name order.
    pub fn iter(&self) -> impl '_ + Iterator<Item = (&'static str, bool)> {
        self.flags.iter().map(|(&name, &value)| (name, value))
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("interface_version", &self.interface_version)
            .field("flags", &self.flags)
            .finish()
    }
}

/// Collects capability flags before they are frozen into [`Capabilities`].
#[derive(Debug)]
pub struct CapabilitiesBuilder(Capabilities);

impl CapabilitiesBuilder {
    /// Record a flag that was read successfully.
    pub fn flag(&mut self, name: &'static str, value: bool) -> &mut Self {
        _ = self.0.flags.insert(name, value);
        self
    }

    /// Freeze the collected flags.
    pub fn finish(self) -> Capabilities {
        self.0
    }
}
