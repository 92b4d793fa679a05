//! Empirically observed raw-value scaling.
//!
//! The sensor reports vital signs on inconsistent scales depending on its
//! internal state. These maps reproduce the observed behavior as affine and
//! piecewise transforms; they are not an authoritative sensor specification.

/// Raw presence readings sit high (~95) with nobody in range and low (<50)
/// with someone present, so the polarity is inverted from the obvious
/// reading.
pub const PRESENCE_THRESHOLD: u8 = 50;

// Respiration measurement range published by the vendor, in breaths/minute.
pub const RESPIRATION_SPEC_MIN: f32 = 10.0;
pub const RESPIRATION_SPEC_MAX: f32 = 25.0;

// Generous limits a respiration reading may still be published within,
// accompanied by a warning.
pub const RESPIRATION_PUBLISH_MIN: f32 = 8.0;
pub const RESPIRATION_PUBLISH_MAX: f32 = 30.0;

// Heart rate measurement range published by the vendor, in beats/minute.
pub const HEART_RATE_SPEC_MIN: f32 = 60.0;
pub const HEART_RATE_SPEC_MAX: f32 = 100.0;

// Generous publishable limits for heart rate.
pub const HEART_RATE_PUBLISH_MIN: f32 = 40.0;
pub const HEART_RATE_PUBLISH_MAX: f32 = 120.0;

// Sleep-composite averages use looser gates than the live readings.
pub const AVG_RESPIRATION_MAX: f32 = 40.0;
pub const AVG_HEART_RATE_MIN: f32 = 40.0;
pub const AVG_HEART_RATE_MAX: f32 = 150.0;

/// Inverted-polarity presence interpretation.
pub fn presence_detected(raw: u8) -> bool {
    raw < PRESENCE_THRESHOLD
}

/// Maps a raw respiration reading onto the 10-25 BPM vendor range.
pub fn respiration_bpm(raw: u8) -> f32 {
    let raw_f = f32::from(raw);
    if raw < 8 {
        // Too low to be physiological; map 0-10 onto the lower half of the
        // vendor range.
        10.0 + (raw_f / 10.0) * 5.0
    } else if raw > 25 && raw < 100 {
        // Above the vendor maximum but below the alternate-scale threshold.
        10.0 + ((raw_f - 25.0) / 75.0) * 15.0
    } else if raw >= 100 {
        // Reported on a 0-255 scale.
        10.0 + (raw_f / 255.0) * 15.0
    } else {
        raw_f
    }
}

/// Maps a raw heart rate reading onto the 60-100 BPM vendor range.
pub fn heart_rate_bpm(raw: u8) -> f32 {
    let raw_f = f32::from(raw);
    if raw < 30 {
        // Too low to be physiological; map 0-30 onto the lower half of the
        // vendor range.
        60.0 + (raw_f / 30.0) * 15.0
    } else if raw > 100 && raw < 150 {
        60.0 + ((raw_f - 30.0) / 120.0) * 40.0
    } else if raw >= 150 {
        // Reported on a 0-255 scale.
        60.0 + (raw_f / 255.0) * 40.0
    } else if raw < 60 {
        // Below the vendor range but plausible; pull halfway toward it.
        60.0 - (60.0 - raw_f) * 0.5
    } else {
        raw_f
    }
}
