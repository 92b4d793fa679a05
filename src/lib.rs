#![cfg_attr(not(test), no_std)]

use embedded_io_async::{Read, ReadReady, Write};
use heapless::Vec;
use log::{debug, error, info, warn};

mod constants;
pub use constants::*;

mod error;
pub use error::*;

mod config;
pub use config::*;

mod clock;
pub use clock::*;

mod frame;
pub use frame::*;

mod scale;
pub use scale::*;

mod sink;
pub use sink::*;

mod state;
pub use state::*;

use sink::publish;

/// Cached sleep metrics, refreshed as their reads come around.
///
/// The composite read overwrites most fields at once; in-bed, sleep state
/// and the quality figures are also refreshed by their dedicated reads. Kept
/// for logging and host-side consistency checks, never for cross-tick
/// decisions.
#[derive(Debug, Clone, Copy)]
pub struct SleepSummary {
    pub presence: u8,
    /// 0 = deep, 1 = light, 2 = awake, 3 = none.
    pub sleep_state: u8,
    pub in_bed: u8,
    pub quality_score: u8,
    pub quality_rating: u8,
    /// Breaths/minute, post-scaling.
    pub average_respiration: f32,
    /// Beats/minute, post-scaling.
    pub average_heartbeat: f32,
    pub turnover_count: u8,
    pub large_body_movement: u8,
    pub minor_body_movement: u8,
    pub apnea_events: u8,
}

impl Default for SleepSummary {
    fn default() -> SleepSummary {
        SleepSummary {
            presence: 0,
            sleep_state: 3, // none
            in_bed: 0,
            quality_score: 0,
            quality_rating: 0,
            average_respiration: 0.0,
            average_heartbeat: 0.0,
            turnover_count: 0,
            large_body_movement: 0,
            minor_body_movement: 0,
            apnea_events: 0,
        }
    }
}

/// Represents a DFRobot C1001 mmWave presence and vital-signs sensor.
///
/// The driver owns no clock or thread of its own. The host calls
/// [`tick`](C1001::tick) on a fixed period; each tick performs at most one
/// bring-up step or one metric poll, issuing a single command/response
/// transaction over the serial link (two during the work-mode bring-up step,
/// when a set must follow the query). Decoded metrics go to the optional
/// [`Sinks`] slots passed into the tick.
///
/// # Type Parameters
///
/// * `Serial`: duplex serial channel to the sensor. Must implement
///   `embedded_io_async::Read`, `Write` and `ReadReady`; the driver does its
///   own framing, draining and write pacing on top.
/// * `Clk`: monotonic time source and delay provider, see [`Clock`].
pub struct C1001<Serial, Clk> {
    serial: Serial,
    clock: Clk,
    config: Config,
    state: DriverState,
    summary: SleepSummary,
}

impl<S, C> C1001<S, C>
where
    S: Read + Write + ReadReady,
    C: Clock,
{
    /// Creates a new driver instance. The sensor is brought up lazily over
    /// the following ticks; construction performs no I/O.
    pub fn new(serial: S, mut clock: C, config: Config) -> Self {
        let now = clock.now_ms();
        Self {
            serial,
            clock,
            config,
            state: DriverState::new(now),
            summary: SleepSummary::default(),
        }
    }

    /// Read-only view of the initialization phase, health counters and
    /// scheduler position.
    pub fn state(&self) -> &DriverState {
        &self.state
    }

    /// The cached sleep metrics.
    pub fn sleep_summary(&self) -> &SleepSummary {
        &self.summary
    }

    /// Consumes the driver and hands back the transport and clock.
    pub fn release(self) -> (S, C) {
        (self.serial, self.clock)
    }

    /// Runs one driver cycle. Safe to call from the very first period on.
    ///
    /// While the sensor is uninitialized this advances the bring-up sequence
    /// by at most one phase; afterwards it polls one scheduled metric and
    /// publishes it to the wired sinks. A tick may block for up to the
    /// configured response timeout while a transaction waits on the sensor.
    pub async fn tick(&mut self, sinks: &mut Sinks<'_>) {
        if self.state.initialized {
            let now = self.clock.now_ms();
            if self.state.is_stale(now, self.config.stale_after_ms) {
                error!(
                    "sensor timeout - no successful read in {} ms, resetting initialization",
                    now - self.state.last_success_ms
                );
                self.state.reset_initialization();
                return;
            }
            self.poll_step(sinks).await;
        } else {
            self.init_step().await;
        }
    }

    /// Reports a link-level fault detected outside the driver (framing or
    /// parity errors surfaced by the UART). Counts as one failed
    /// transaction toward the re-initialization threshold.
    pub fn on_transport_error(&mut self) {
        warn!(
            "transport fault reported, consecutive failures: {}",
            self.state.consecutive_failures + 1
        );
        if self
            .state
            .record_failure(self.config.max_consecutive_failures)
        {
            error!("too many consecutive transport faults, resetting initialization");
        }
    }

    /// Sends the driver back through the bring-up sequence on the next tick.
    pub fn reset_initialization(&mut self) {
        warn!("resetting initialization process");
        self.state.reset_initialization();
    }

    /// Executes one command/response transaction: drains stale input, writes
    /// the paced command frame, then waits for a complete valid response
    /// within the configured timeout. Invalid frames are discarded and the
    /// receive scan resynchronizes on the next head marker.
    pub async fn execute(&mut self, control: u8, command: u8, payload: &[u8]) -> Result<Frame, Error> {
        self.transact(Frame::new(control, command, payload)).await
    }

    // One bring-up step per tick. A failed transaction leaves the phase
    // unchanged; the next tick retries it.
    async fn init_step(&mut self) {
        match self.state.init_phase {
            InitPhase::Created => {
                debug!("probing sensor with indicator state query");
                match self.query(REG_CONFIG, CMD_GET_LED).await {
                    Ok(_) => {
                        info!("sensor is responding - proceeding with initialization");
                        self.state.init_phase = InitPhase::Probed;
                    }
                    Err(e) => warn!("no response from sensor ({:?}), will retry next tick", e),
                }
            }
            InitPhase::Probed => {
                let reply = match self.query(REG_WORK_MODE, CMD_WORK_MODE).await {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("work mode query failed ({:?}), will retry next tick", e);
                        return;
                    }
                };
                let mode = reply.payload.first().copied().unwrap_or(0);
                if mode != MODE_SLEEP {
                    debug!("current mode: {:02X}, switching to sleep mode", mode);
                    if let Err(e) = self.set(REG_WORK_MODE, CMD_WORK_MODE, MODE_SLEEP).await {
                        warn!("sleep mode command failed ({:?}), will retry next tick", e);
                        return;
                    }
                }
                info!("sleep mode confirmed");
                self.state.init_phase = InitPhase::LowPowerSet;
            }
            InitPhase::LowPowerSet => match self.set(REG_CONFIG, CMD_SET_LED, 0x01).await {
                Ok(_) => {
                    info!("indicator configured");
                    self.state.init_phase = InitPhase::IndicatorSet;
                }
                Err(e) => warn!("indicator command failed ({:?}), will retry next tick", e),
            },
            InitPhase::IndicatorSet => match self.query(REG_CONFIG, CMD_RESET).await {
                Ok(_) => {
                    // The sensor is not ready for commands straight after
                    // acknowledging the reset; give it time to settle.
                    self.clock.delay_ms(RESET_SETTLE_MS).await;
                    let now = self.clock.now_ms();
                    self.state.complete_initialization(now);
                    info!("sensor reset acknowledged - initialization complete");
                }
                Err(e) => warn!("reset command failed ({:?}), will retry next tick", e),
            },
            InitPhase::Complete => {}
        }
    }

    // One scheduled metric poll per tick.
    async fn poll_step(&mut self, sinks: &mut Sinks<'_>) {
        let metric = self.state.select_metric();
        debug!(
            "polling {:?} (vital cycle {}, round robin {})",
            metric, self.state.vital_cycle, self.state.round_robin
        );
        match self.read_metric(metric, sinks).await {
            Ok(()) => {
                let now = self.clock.now_ms();
                self.state.record_success(now);
            }
            Err(e) => {
                warn!(
                    "failed to read {:?} ({:?}), consecutive failures: {}",
                    metric,
                    e,
                    self.state.consecutive_failures + 1
                );
                if self
                    .state
                    .record_failure(self.config.max_consecutive_failures)
                {
                    error!("too many consecutive sensor errors, resetting initialization");
                }
            }
        }
    }

    async fn read_metric(&mut self, metric: Metric, sinks: &mut Sinks<'_>) -> Result<(), Error> {
        match metric {
            Metric::Presence => {
                let frame = self.query(REG_BASIC_HUMAN, CMD_GET_PRESENCE).await?;
                let raw = payload_byte(&frame, 0)?;
                let present = presence_detected(raw);
                publish(&mut sinks.presence_raw, raw);
                publish(&mut sinks.person_detected, present);
                info!("person detected: {} (raw value: {})", present, raw);
            }
            Metric::Movement => {
                let frame = self.query(REG_BASIC_HUMAN, CMD_GET_MOVEMENT).await?;
                let raw = payload_byte(&frame, 0)?;
                if raw <= 2 {
                    debug!("movement value: {}", raw);
                    publish(&mut sinks.movement, raw);
                } else {
                    warn!("movement value {} outside 0-2 range, dropped", raw);
                }
            }
            Metric::Respiration => {
                let frame = self.query(REG_BREATH, CMD_GET_BREATHING).await?;
                let raw = payload_byte(&frame, 0)?;
                let bpm = respiration_bpm(raw);
                if (RESPIRATION_SPEC_MIN..=RESPIRATION_SPEC_MAX).contains(&bpm) {
                    debug!("respiration: {:.1} BPM (raw {})", bpm, raw);
                    publish(&mut sinks.respiration, bpm);
                } else {
                    warn!(
                        "respiration outside specified range (10-25 BPM): {:.1} BPM (raw: {})",
                        bpm, raw
                    );
                    if (RESPIRATION_PUBLISH_MIN..=RESPIRATION_PUBLISH_MAX).contains(&bpm) {
                        publish(&mut sinks.respiration, bpm);
                    }
                }
            }
            Metric::HeartRate => {
                let frame = self.query(REG_HEART, CMD_GET_HEART_RATE).await?;
                let raw = payload_byte(&frame, 0)?;
                let bpm = heart_rate_bpm(raw);
                if (HEART_RATE_SPEC_MIN..=HEART_RATE_SPEC_MAX).contains(&bpm) {
                    debug!("heart rate: {:.1} BPM (raw {})", bpm, raw);
                    publish(&mut sinks.heart_rate, bpm);
                } else {
                    warn!(
                        "heart rate outside specified range (60-100 BPM): {:.1} BPM (raw: {})",
                        bpm, raw
                    );
                    if (HEART_RATE_PUBLISH_MIN..=HEART_RATE_PUBLISH_MAX).contains(&bpm) {
                        publish(&mut sinks.heart_rate, bpm);
                    }
                }
            }
            Metric::InBed => {
                let frame = self.query(REG_SLEEP, CMD_GET_IN_BED).await?;
                let raw = payload_byte(&frame, 0)?;
                self.summary.in_bed = raw;
                debug!("in-bed status: {} (0=out of bed, 1=in bed)", raw);
                publish(&mut sinks.in_bed, raw);
            }
            Metric::SleepState => {
                let frame = self.query(REG_SLEEP, CMD_GET_SLEEP_STATE).await?;
                let raw = payload_byte(&frame, 0)?;
                self.summary.sleep_state = raw;
                debug!("sleep state: {} (0=deep, 1=light, 2=awake, 3=none)", raw);
                publish(&mut sinks.sleep_state, raw);
            }
            Metric::SleepQualityScore => {
                let frame = self.query(REG_SLEEP, CMD_GET_SLEEP_QUALITY).await?;
                let raw = payload_byte(&frame, 0)?;
                self.summary.quality_score = raw;
                debug!("sleep quality score: {} (0-100)", raw);
                publish(&mut sinks.sleep_quality_score, raw);
            }
            Metric::SleepQualityRating => {
                let frame = self.query(REG_SLEEP, CMD_GET_SLEEP_QUALITY_RATING).await?;
                let raw = payload_byte(&frame, 0)?;
                self.summary.quality_rating = raw;
                debug!("sleep quality rating: {} (0=none, 1=good, 2=avg, 3=poor)", raw);
                publish(&mut sinks.sleep_quality_rating, raw);
            }
            Metric::AbnormalStruggle => {
                let frame = self.query(REG_SLEEP, CMD_GET_ABNORMAL_STRUGGLE).await?;
                let raw = payload_byte(&frame, 0)?;
                debug!("abnormal struggle: {} (0=none, 1=normal, 2=abnormal)", raw);
                publish(&mut sinks.abnormal_struggle, raw == 2);
            }
            Metric::SleepDisturbance => {
                let frame = self.query(REG_SLEEP, CMD_GET_SLEEP_DISTURBANCE).await?;
                let raw = payload_byte(&frame, 0)?;
                debug!(
                    "sleep disturbance: {} (0=<4hrs, 1=>12hrs, 2=abnormal, 3=none)",
                    raw
                );
                publish(&mut sinks.sleep_disturbance, raw != 3);
            }
            Metric::AwakeDuration => {
                let frame = self.query(REG_SLEEP, CMD_GET_WAKE_DURATION).await?;
                let minutes = payload_u16(&frame)?;
                debug!("wake duration: {} minutes", minutes);
                publish(&mut sinks.awake_duration, minutes);
            }
            Metric::LightSleepDuration => {
                let frame = self.query(REG_SLEEP, CMD_GET_LIGHT_SLEEP).await?;
                let minutes = payload_u16(&frame)?;
                debug!("light sleep duration: {} minutes", minutes);
                publish(&mut sinks.light_sleep_duration, minutes);
            }
            Metric::DeepSleepDuration => {
                let frame = self.query(REG_SLEEP, CMD_GET_DEEP_SLEEP).await?;
                let minutes = payload_u16(&frame)?;
                debug!("deep sleep duration: {} minutes", minutes);
                publish(&mut sinks.deep_sleep_duration, minutes);
            }
            Metric::SleepComposite => {
                let frame = self.query(REG_SLEEP, CMD_GET_SLEEP_COMPOSITE).await?;
                self.read_sleep_composite(&frame, sinks)?;
            }
        }
        Ok(())
    }

    // The composite response bundles eight sleep fields into one payload:
    // presence, sleep state, average respiration, average heartbeat,
    // turnovers, large body movement %, minor body movement %, apnea events.
    fn read_sleep_composite(&mut self, frame: &Frame, sinks: &mut Sinks<'_>) -> Result<(), Error> {
        let p = &frame.payload;
        if p.len() < 8 {
            warn!("sleep composite payload too short: {:02X?}", &p[..]);
            return Err(Error::UnexpectedReply);
        }
        let raw_avg_respiration = p[2];
        let raw_avg_heartbeat = p[3];

        self.summary.presence = p[0];
        self.summary.sleep_state = p[1];
        self.summary.average_respiration = respiration_bpm(raw_avg_respiration);
        self.summary.average_heartbeat = heart_rate_bpm(raw_avg_heartbeat);
        self.summary.turnover_count = p[4];
        self.summary.large_body_movement = p[5];
        self.summary.minor_body_movement = p[6];
        self.summary.apnea_events = p[7];

        debug!(
            "sleep composite: avg_resp={:.1} (raw={}), avg_heart={:.1} (raw={}), turnovers={}, large_move={}%, minor_move={}%, apnea={}",
            self.summary.average_respiration,
            raw_avg_respiration,
            self.summary.average_heartbeat,
            raw_avg_heartbeat,
            self.summary.turnover_count,
            self.summary.large_body_movement,
            self.summary.minor_body_movement,
            self.summary.apnea_events
        );

        let avg_respiration = self.summary.average_respiration;
        if (0.0..=AVG_RESPIRATION_MAX).contains(&avg_respiration) {
            publish(&mut sinks.average_respiration, avg_respiration);
        } else {
            warn!(
                "average respiration out of range: {:.1} BPM (raw: {})",
                avg_respiration, raw_avg_respiration
            );
        }

        let avg_heartbeat = self.summary.average_heartbeat;
        if (AVG_HEART_RATE_MIN..=AVG_HEART_RATE_MAX).contains(&avg_heartbeat) {
            publish(&mut sinks.average_heart_rate, avg_heartbeat);
        } else {
            warn!(
                "average heart rate out of range: {:.1} BPM (raw: {})",
                avg_heartbeat, raw_avg_heartbeat
            );
        }

        publish(&mut sinks.turnover_count, self.summary.turnover_count);

        if self.summary.large_body_movement <= 100 {
            publish(&mut sinks.large_body_movement, self.summary.large_body_movement);
        } else {
            warn!(
                "large body movement out of percentage range: {}%",
                self.summary.large_body_movement
            );
        }

        if self.summary.minor_body_movement <= 100 {
            publish(&mut sinks.minor_body_movement, self.summary.minor_body_movement);
        } else {
            warn!(
                "minor body movement out of percentage range: {}%",
                self.summary.minor_body_movement
            );
        }

        publish(&mut sinks.apnea_events, self.summary.apnea_events);
        Ok(())
    }

    // Sends a register query (filler payload) and returns the reply.
    async fn query(&mut self, control: u8, command: u8) -> Result<Frame, Error> {
        self.transact(Frame::query(control, command)).await
    }

    // Sends a one-byte register set and returns the reply.
    async fn set(&mut self, control: u8, command: u8, value: u8) -> Result<Frame, Error> {
        self.transact(Frame::new(control, command, &[value])).await
    }

    async fn transact(&mut self, frame: Frame) -> Result<Frame, Error> {
        self.drain_stale().await?;

        let bytes = frame.encode();
        debug!("sending: {:02X?}", &bytes[..]);
        for &b in bytes.iter() {
            self.serial
                .write_all(&[b])
                .await
                .map_err(|_| Error::WriteFailure)?;
            // The sensor drops bytes written back to back on its
            // half-duplex link.
            self.clock.delay_ms(self.config.inter_byte_delay_ms).await;
        }
        self.serial.flush().await.map_err(|_| Error::WriteFailure)?;

        self.wait_response().await
    }

    // Discards bytes left over from a prior aborted exchange.
    async fn drain_stale(&mut self) -> Result<(), Error> {
        let mut drained = 0usize;
        while self.serial.read_ready().map_err(|_| Error::ReadFailure)? {
            let mut byte = [0u8; 1];
            let n = self
                .serial
                .read(&mut byte)
                .await
                .map_err(|_| Error::ReadFailure)?;
            if n == 0 {
                break;
            }
            drained += n;
        }
        if drained > 0 {
            debug!("drained {} stale bytes before command", drained);
        }
        Ok(())
    }

    // Polls the link until the decoder closes a valid frame or the deadline
    // passes. Invalid frames are logged and the scan continues. The deadline
    // is consulted before every byte: a device streaming garbage without
    // interruption must not hold the transaction open past the timeout.
    async fn wait_response(&mut self) -> Result<Frame, Error> {
        let mut decoder = Decoder::new();
        let mut captured: Vec<u8, CAPTURE_LEN> = Vec::new();
        let deadline = self
            .clock
            .now_ms()
            .saturating_add(u64::from(self.config.response_timeout_ms));

        loop {
            while self.clock.now_ms() < deadline
                && self.serial.read_ready().map_err(|_| Error::ReadFailure)?
            {
                let mut byte = [0u8; 1];
                let n = self
                    .serial
                    .read(&mut byte)
                    .await
                    .map_err(|_| Error::ReadFailure)?;
                if n == 0 {
                    break;
                }
                // Keep what fits for diagnostics; decoding is unaffected.
                captured.push(byte[0]).ok();
                match decoder.feed(byte[0]) {
                    Decoded::Frame(response) => {
                        debug!("received: {:02X?}", &captured[..]);
                        return Ok(response);
                    }
                    Decoded::Invalid(reason) => {
                        warn!("discarding invalid frame ({:?}), resynchronizing", reason);
                    }
                    Decoded::Incomplete => {}
                }
            }

            if self.clock.now_ms() >= deadline {
                if captured.is_empty() {
                    warn!(
                        "no response received (timeout after {} ms)",
                        self.config.response_timeout_ms
                    );
                } else {
                    warn!(
                        "partial response: {:02X?} (timeout after {} ms)",
                        &captured[..],
                        self.config.response_timeout_ms
                    );
                }
                return Err(Error::Timeout {
                    captured: captured.len(),
                });
            }
            self.clock.delay_ms(self.config.poll_interval_ms).await;
        }
    }
}

fn payload_byte(frame: &Frame, idx: usize) -> Result<u8, Error> {
    frame.payload.get(idx).copied().ok_or(Error::UnexpectedReply)
}

// 16-bit big-endian value in the first two payload bytes (the duration
// replies).
fn payload_u16(frame: &Frame) -> Result<u16, Error> {
    let high = payload_byte(frame, 0)?;
    let low = payload_byte(frame, 1)?;
    Ok((u16::from(high) << 8) | u16::from(low))
}
