macro_rules! device_mod {
    ($(# $cfg:tt $trait_name:ident = $path:literal,)*) => (paste::paste! {
        $(
            # $cfg
            #[doc = "Types related to [`" $trait_name "`] devices."]
            pub mod [<$trait_name:snake>];

            # $cfg
            pub use [<$trait_name:snake>]::$trait_name;
        )*

        /// Device categories the conformance checker knows how to exercise.
        #[derive(
            PartialOrd, Ord, PartialEq, Eq, Hash, Clone, Copy, Debug,
            derive_more::Display, serde::Serialize,
        )]
        #[expect(missing_docs)] // self-explanatory variants
        pub enum DeviceType {
            $(
                # $cfg
                #[display($path)]
                $trait_name,
            )*
        }

        /// A tagged enum wrapper for a type-erased device handle.
        #[derive(Clone, Debug)]
        #[expect(missing_docs)] // self-explanatory variants
        pub enum TypedDevice {
            $(
                # $cfg
                $trait_name(std::sync::Arc<dyn $trait_name>),
            )*
        }

        impl TypedDevice {
            /// Category of the wrapped device.
            pub const fn device_type(&self) -> DeviceType {
                match *self {
                    $(
                        # $cfg
                        Self::$trait_name(_) => DeviceType::$trait_name,
                    )*
                }
            }

            /// View the wrapped device through the members common to all categories.
            pub fn as_device(&self) -> &dyn Device {
                match *self {
                    $(
                        # $cfg
                        Self::$trait_name(ref device) => &**device,
                    )*
                }
            }

            /// Interface version declared by the wrapped device.
            pub async fn interface_version(&self) -> ASCOMResult<i32> {
                match *self {
                    $(
                        # $cfg
                        Self::$trait_name(ref device) => device.interface_version().await,
                    )*
                }
            }
        }

        $(
            # $cfg
            impl From<std::sync::Arc<dyn $trait_name>> for TypedDevice {
                fn from(device: std::sync::Arc<dyn $trait_name>) -> Self {
                    Self::$trait_name(device)
                }
            }
        )*
    });
}
