// Two-phase measurement pipeline
//
// One conversion is outstanding at any time. Each step consumes the result of
// the previous request and issues the next one, so requests and reads are
// always one step out of phase.

/// Quantity a conversion produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Temperature,
    Pressure,
}

/// Which result the outstanding request will deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    AwaitingTemperature,
    AwaitingPressure,
}

/// One pipeline step: read `consume`, then request `request`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub consume: Conversion,
    pub request: Conversion,
}

/// Pressure conversions issued for each temperature conversion
pub const PRESSURE_SAMPLES_PER_TEMPERATURE: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementScheduler {
    state: SchedulerState,
    pressure_count: u8,
}

impl Default for MeasurementScheduler {
    fn default() -> Self {
        Self::primed()
    }
}

impl MeasurementScheduler {
    /// Scheduler for a pipeline whose first request was a temperature conversion
    pub fn primed() -> Self {
        Self {
            state: SchedulerState::AwaitingTemperature,
            pressure_count: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn pressure_count(&self) -> u8 {
        self.pressure_count
    }

    /// Move to the next step of the pipeline
    pub fn advance(&mut self) -> Step {
        match self.state {
            SchedulerState::AwaitingTemperature => {
                self.state = SchedulerState::AwaitingPressure;
                Step {
                    consume: Conversion::Temperature,
                    request: Conversion::Pressure,
                }
            }
            SchedulerState::AwaitingPressure => {
                self.pressure_count += 1;
                let request = if self.pressure_count >= PRESSURE_SAMPLES_PER_TEMPERATURE {
                    self.pressure_count = 0;
                    self.state = SchedulerState::AwaitingTemperature;
                    Conversion::Temperature
                } else {
                    Conversion::Pressure
                };
                Step {
                    consume: Conversion::Pressure,
                    request,
                }
            }
        }
    }
}
