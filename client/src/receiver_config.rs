use std::time::Duration;

/// Contains Config properties which will be used by the Receiver
#[derive(Clone, Debug)]
pub struct ReceiverConfig {
    /// Total number of times a reliable command is sent before its failure is
    /// reported instead of retried
    pub max_command_attempts: u32,
    /// Delay before the first retry of a failed reliable command. Each further
    /// retry doubles it.
    pub command_retry_base_delay: Duration,
    /// When true, resolutions reported while a critical section is open wait
    /// until the section has been drained
    pub queue_resolutions_in_critical_section: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            max_command_attempts: 5,
            command_retry_base_delay: Duration::from_millis(200),
            queue_resolutions_in_critical_section: true,
        }
    }
}

impl ReceiverConfig {
    /// Delay to wait before re-sending a command that has been sent
    /// `attempts` times.
    pub fn retry_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(16);
        self.command_retry_base_delay * (1u32 << exponent)
    }
}
