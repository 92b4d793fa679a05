/// Configuration settings for the C1001 driver.
///
/// All values have protocol defaults; override them with the builder-style
/// setters when the host or wiring calls for different timing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    /// How long a transaction waits for a complete, valid response frame.
    pub response_timeout_ms: u32,
    /// Sleep between receive polls while waiting for a response.
    pub poll_interval_ms: u32,
    /// Pacing between transmitted bytes; the sensor needs a minimum
    /// inter-byte gap on its half-duplex link.
    pub inter_byte_delay_ms: u32,
    /// Consecutive transaction failures tolerated before the driver forces
    /// re-initialization.
    pub max_consecutive_failures: u8,
    /// Elapsed time without a successful transaction after which the sensor
    /// is considered dead and re-initialization is forced.
    pub stale_after_ms: u64,
}

impl Config {
    /// Creates a configuration with the protocol defaults.
    pub fn new() -> Config {
        Config::default()
    }

    /// Sets the per-transaction response timeout in milliseconds.
    pub fn response_timeout_ms(mut self, ms: u32) -> Self {
        self.response_timeout_ms = ms;
        self
    }

    /// Sets the receive polling interval in milliseconds.
    pub fn poll_interval_ms(mut self, ms: u32) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Sets the transmit inter-byte pacing delay in milliseconds.
    pub fn inter_byte_delay_ms(mut self, ms: u32) -> Self {
        self.inter_byte_delay_ms = ms;
        self
    }

    /// Sets the consecutive-failure threshold for forced re-initialization.
    pub fn max_consecutive_failures(mut self, count: u8) -> Self {
        self.max_consecutive_failures = count;
        self
    }

    /// Sets the staleness threshold in milliseconds.
    pub fn stale_after_ms(mut self, ms: u64) -> Self {
        self.stale_after_ms = ms;
        self
    }
}

impl Default for Config {
    /// Returns the default configuration: 2 s response timeout, 5 ms receive
    /// polling, 2 ms write pacing, 20 tolerated consecutive failures, 120 s
    /// staleness threshold.
    fn default() -> Config {
        Config {
            response_timeout_ms: 2_000,
            poll_interval_ms: 5,
            inter_byte_delay_ms: 2,
            max_consecutive_failures: 20,
            stale_after_ms: 120_000,
        }
    }
}
