use crate::{ASCOMError, ASCOMResult};
use std::fmt::Debug;

/// ASCOM Methods Common To All Devices.
#[async_trait::async_trait]
pub trait Device: Debug + Send + Sync {
    /// Static device name used to label log output.
    fn static_name(&self) -> &str;

    /// Retrieves the connected state of the device.
    async fn connected(&self) -> ASCOMResult<bool>;

    /// **Deprecated in favour of the newer non-blocking [`connect`](Self::connect) and [`disconnect`](Self::disconnect) methods, with the new [`connecting`](Self::connecting) property serving as the completion property.**
    ///
    /// Sets the connected state of the device.
    async fn set_connected(&self, connected: bool) -> ASCOMResult;

    /// Connect to the device asynchronously.
    ///
    /// _Platform 7 onward._
    async fn connect(&self) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Disconnect from the device asynchronously.
    ///
    /// _Platform 7 onward._
    async fn disconnect(&self) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Returns true while the device is connecting or disconnecting.
    ///
    /// _Platform 7 onward._
    async fn connecting(&self) -> ASCOMResult<bool> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// The description of the device.
    async fn description(&self) -> ASCOMResult<String>;

    /// The description of the driver.
    async fn driver_info(&self) -> ASCOMResult<String>;

    /// A string containing only the major and minor version of the driver.
    ///
    /// This must be in the form "n.n".
    async fn driver_version(&self) -> ASCOMResult<String>;

    /// The name of the device.
    async fn name(&self) -> ASCOMResult<String> {
        Ok(self.static_name().to_owned())
    }

    /// Returns the list of action names supported by this driver.
    async fn supported_actions(&self) -> ASCOMResult<Vec<String>> {
        Ok(vec![])
    }
}
