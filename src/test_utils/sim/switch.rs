use super::{lock, sim_device, SimCommon};
use crate::api::Switch;
use crate::{ASCOMError, ASCOMResult};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// How long an asynchronous change takes to settle.
const ASYNC_DURATION: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub(crate) struct SwitchConfig {
    pub(crate) name: String,
    pub(crate) can_write: bool,
    pub(crate) can_async: bool,
    pub(crate) min: f64,
    pub(crate) max: f64,
    pub(crate) step: f64,
    /// Added to every value read back.
    pub(crate) readback_offset: f64,
}

impl SwitchConfig {
    /// A writable on/off switch.
    pub(crate) fn boolean(name: &str) -> Self {
        Self::analogue(name, 0.0, 1.0, 1.0)
    }

    /// A writable switch taking values from `min` to `max`.
    pub(crate) fn analogue(name: &str, min: f64, max: f64, step: f64) -> Self {
        Self {
            name: name.to_owned(),
            can_write: true,
            can_async: false,
            min,
            max,
            step,
            readback_offset: 0.0,
        }
    }
}

#[derive(Debug)]
struct SwitchState {
    value: f64,
    pending: Option<(f64, Instant)>,
}

impl SwitchState {
    fn update(&mut self) {
        if let Some((value, _)) = self.pending.filter(|&(_, ends)| Instant::now() >= ends) {
            self.pending = None;
            self.value = value;
        }
    }
}

/// Simulated bank of switches, some of which may change asynchronously.
#[derive(Debug)]
pub(crate) struct SimSwitch {
    common: SimCommon,
    switches: Vec<SwitchConfig>,
    states: Mutex<Vec<SwitchState>>,
}

impl SimSwitch {
    pub(crate) fn new(switches: Vec<SwitchConfig>) -> Self {
        let states = switches
            .iter()
            .map(|switch| SwitchState {
                value: switch.min,
                pending: None,
            })
            .collect();
        Self {
            common: SimCommon::default(),
            switches,
            states: Mutex::new(states),
        }
    }

    fn config(&self, id: i32) -> ASCOMResult<(usize, &SwitchConfig)> {
        usize::try_from(id)
            .ok()
            .and_then(|index| Some((index, self.switches.get(index)?)))
            .ok_or_else(|| ASCOMError::invalid_value(format!("Switch {id} doesn't exist")))
    }

    fn writable(&self, id: i32, value: f64) -> ASCOMResult<usize> {
        let (index, switch) = self.config(id)?;
        if !switch.can_write {
            return Err(ASCOMError::NOT_IMPLEMENTED);
        }
        if !(switch.min..=switch.max).contains(&value) {
            return Err(ASCOMError::invalid_value(format!(
                "{value} is outside {} to {}",
                switch.min, switch.max
            )));
        }
        Ok(index)
    }

    fn value(&self, id: i32) -> ASCOMResult<f64> {
        let (index, switch) = self.config(id)?;
        let mut states = lock(&self.states);
        states[index].update();
        Ok(states[index].value + switch.readback_offset)
    }

    fn write(&self, id: i32, value: f64) -> ASCOMResult {
        let index = self.writable(id, value)?;
        let mut states = lock(&self.states);
        states[index].pending = None;
        states[index].value = value;
        Ok(())
    }

    fn write_async(&self, id: i32, value: f64) -> ASCOMResult {
        let index = self.writable(id, value)?;
        if !self.switches[index].can_async {
            return Err(ASCOMError::NOT_IMPLEMENTED);
        }
        lock(&self.states)[index].pending = Some((value, Instant::now() + ASYNC_DURATION));
        Ok(())
    }

    fn state_value(&self, id: i32, state: bool) -> ASCOMResult<f64> {
        let (_, switch) = self.config(id)?;
        Ok(if state { switch.max } else { switch.min })
    }
}

sim_device!(SimSwitch, "Switch");

#[async_trait::async_trait]
impl Switch for SimSwitch {
    async fn max_switch(&self) -> ASCOMResult<i32> {
        i32::try_from(self.switches.len()).map_err(ASCOMError::unspecified)
    }

    async fn max_switch_value(&self, id: i32) -> ASCOMResult<f64> {
        Ok(self.config(id)?.1.max)
    }

    async fn can_async(&self, id: i32) -> ASCOMResult<bool> {
        Ok(self.config(id)?.1.can_async)
    }

    async fn can_write(&self, id: i32) -> ASCOMResult<bool> {
        Ok(self.config(id)?.1.can_write)
    }

    async fn get_switch(&self, id: i32) -> ASCOMResult<bool> {
        let min = self.config(id)?.1.min;
        Ok(self.value(id)? > min)
    }

    async fn get_switch_description(&self, id: i32) -> ASCOMResult<String> {
        Ok(format!("Simulated {}", self.config(id)?.1.name))
    }

    async fn get_switch_name(&self, id: i32) -> ASCOMResult<String> {
        Ok(self.config(id)?.1.name.clone())
    }

    async fn get_switch_value(&self, id: i32) -> ASCOMResult<f64> {
        self.value(id)
    }

    async fn min_switch_value(&self, id: i32) -> ASCOMResult<f64> {
        Ok(self.config(id)?.1.min)
    }

    async fn set_async(&self, id: i32, state: bool) -> ASCOMResult {
        self.write_async(id, self.state_value(id, state)?)
    }

    async fn set_async_value(&self, id: i32, value: f64) -> ASCOMResult {
        self.write_async(id, value)
    }

    async fn set_switch(&self, id: i32, state: bool) -> ASCOMResult {
        self.write(id, self.state_value(id, state)?)
    }

    async fn set_switch_value(&self, id: i32, value: f64) -> ASCOMResult {
        self.write(id, value)
    }

    async fn state_change_complete(&self, id: i32) -> ASCOMResult<bool> {
        let (index, switch) = self.config(id)?;
        if !switch.can_async {
            return Err(ASCOMError::NOT_IMPLEMENTED);
        }
        let mut states = lock(&self.states);
        states[index].update();
        Ok(states[index].pending.is_none())
    }

    async fn switch_step(&self, id: i32) -> ASCOMResult<f64> {
        Ok(self.config(id)?.1.step)
    }
}
