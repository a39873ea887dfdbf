use super::Device;
use crate::{ASCOMError, ASCOMResult};

/// Switch Specific Methods.
///
/// Switch devices are numbered from 0 to `max_switch() - 1`; any other id must
/// be rejected with `INVALID_VALUE`.
#[async_trait::async_trait]
#[allow(unused_variables)]
pub trait Switch: Device + Send + Sync {
    /// Returns the number of switch devices managed by this driver.
    async fn max_switch(&self) -> ASCOMResult<i32>;

    /// Whether the given switch can operate asynchronously.
    ///
    /// _ISwitchV3 and later._
    async fn can_async(&self, id: i32) -> ASCOMResult<bool> {
        Ok(false)
    }

    /// Reports if the specified switch device can be written to.
    async fn can_write(&self, id: i32) -> ASCOMResult<bool> {
        Ok(false)
    }

    /// Return the state of switch device id as a boolean.
    async fn get_switch(&self, id: i32) -> ASCOMResult<bool>;

    /// Gets the description of the specified switch device.
    async fn get_switch_description(&self, id: i32) -> ASCOMResult<String>;

    /// Gets the name of the specified switch device.
    async fn get_switch_name(&self, id: i32) -> ASCOMResult<String>;

    /// Gets the value of the specified switch device as a double.
    async fn get_switch_value(&self, id: i32) -> ASCOMResult<f64>;

    /// Gets the minimum value of the specified switch device as a double.
    async fn min_switch_value(&self, id: i32) -> ASCOMResult<f64>;

    /// Gets the maximum value of the specified switch device as a double.
    async fn max_switch_value(&self, id: i32) -> ASCOMResult<f64>;

    /// Starts changing the state of a switch and returns immediately;
    /// `state_change_complete` turns true once the change has finished.
    ///
    /// _ISwitchV3 and later._
    async fn set_async(&self, id: i32, state: bool) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Starts changing the value of a switch and returns immediately;
    /// `state_change_complete` turns true once the change has finished.
    ///
    /// _ISwitchV3 and later._
    async fn set_async_value(&self, id: i32, value: f64) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Cancels an in-progress asynchronous state change.
    ///
    /// _ISwitchV3 and later._
    async fn cancel_async(&self, id: i32) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Sets a switch controller device to the specified state, true or false.
    async fn set_switch(&self, id: i32, state: bool) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Sets a switch device name to the specified value.
    async fn set_switch_name(&self, id: i32, name: String) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Sets a switch device value to the specified value.
    async fn set_switch_value(&self, id: i32, value: f64) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// True once the last asynchronous state change of the given switch has completed.
    ///
    /// _ISwitchV3 and later._
    async fn state_change_complete(&self, id: i32) -> ASCOMResult<bool> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Returns the step size that this device supports (the difference between successive values of the device).
    async fn switch_step(&self, id: i32) -> ASCOMResult<f64>;

    /// This method returns the version of the ASCOM device interface contract to which this device complies.
    async fn interface_version(&self) -> ASCOMResult<i32> {
        Ok(3_i32)
    }
}
