/// Receives one decoded metric value.
///
/// Any `FnMut` closure over the value type works as a sink, so hosts can
/// wire metrics straight into whatever publishing layer they use.
pub trait Sink<T> {
    fn publish(&mut self, value: T);
}

impl<T, F: FnMut(T)> Sink<T> for F {
    fn publish(&mut self, value: T) {
        self(value)
    }
}

/// Optional per-metric publish slots.
///
/// Every slot may be absent; the driver still decodes (and caches, where the
/// sleep summary is concerned) but skips the publish. Slots are checked on
/// every publish, never assumed.
#[derive(Default)]
pub struct Sinks<'a> {
    /// Raw presence reading, useful for threshold analysis.
    pub presence_raw: Option<&'a mut dyn Sink<u8>>,
    /// Inverted-polarity presence interpretation.
    pub person_detected: Option<&'a mut dyn Sink<bool>>,
    /// Movement state: 0 = none, 1 = slight, 2 = intense.
    pub movement: Option<&'a mut dyn Sink<u8>>,
    /// Respiration rate in breaths/minute, post-scaling.
    pub respiration: Option<&'a mut dyn Sink<f32>>,
    /// Heart rate in beats/minute, post-scaling.
    pub heart_rate: Option<&'a mut dyn Sink<f32>>,
    /// In-bed status: 0 = out of bed, 1 = in bed.
    pub in_bed: Option<&'a mut dyn Sink<u8>>,
    /// Sleep state: 0 = deep, 1 = light, 2 = awake, 3 = none.
    pub sleep_state: Option<&'a mut dyn Sink<u8>>,
    /// Sleep quality score, 0-100.
    pub sleep_quality_score: Option<&'a mut dyn Sink<u8>>,
    /// Sleep quality rating: 0 = none, 1 = good, 2 = average, 3 = poor.
    pub sleep_quality_rating: Option<&'a mut dyn Sink<u8>>,
    /// True while the sensor reports an abnormal struggle state.
    pub abnormal_struggle: Option<&'a mut dyn Sink<bool>>,
    /// True while the sensor reports any sleep disturbance.
    pub sleep_disturbance: Option<&'a mut dyn Sink<bool>>,
    /// Minutes spent awake.
    pub awake_duration: Option<&'a mut dyn Sink<u16>>,
    /// Minutes spent in light sleep.
    pub light_sleep_duration: Option<&'a mut dyn Sink<u16>>,
    /// Minutes spent in deep sleep.
    pub deep_sleep_duration: Option<&'a mut dyn Sink<u16>>,
    /// Average respiration over the sleep session, post-scaling.
    pub average_respiration: Option<&'a mut dyn Sink<f32>>,
    /// Average heart rate over the sleep session, post-scaling.
    pub average_heart_rate: Option<&'a mut dyn Sink<f32>>,
    /// Number of turnovers during the sleep session.
    pub turnover_count: Option<&'a mut dyn Sink<u8>>,
    /// Percentage of large body movement.
    pub large_body_movement: Option<&'a mut dyn Sink<u8>>,
    /// Percentage of minor body movement.
    pub minor_body_movement: Option<&'a mut dyn Sink<u8>>,
    /// Number of apnea events during the sleep session.
    pub apnea_events: Option<&'a mut dyn Sink<u8>>,
}

/// Publishes to a slot when one is wired.
pub(crate) fn publish<T>(slot: &mut Option<&mut dyn Sink<T>>, value: T) {
    if let Some(sink) = slot.as_mut() {
        sink.publish(value);
    }
}
