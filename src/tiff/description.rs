//! Vendor metadata hints from the ImageDescription tag.
//!
//! Scanner vendors stash resolution metadata in the level-0
//! ImageDescription as pipe-separated `key = value` pairs (the Aperio
//! convention):
//!
//! ```text
//! Aperio Image Library v12.0.15
//! 46920x33600 (256x256) JPEG/RGB Q=70|AppMag = 20|MPP = 0.499
//! ```
//!
//! When the hints are present they replace the hard-coded 0.25 µm/pixel
//! baseline; when they are absent the caller falls back to that default.

/// Resolution hints parsed from an ImageDescription string.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SlideMetadata {
    /// Micrometres per pixel at the highest-resolution level
    pub mpp: Option<f32>,

    /// Objective magnification (e.g. 20, 40)
    pub magnification: Option<f32>,
}

impl SlideMetadata {
    /// Parse `MPP` and `AppMag` hints from a description string.
    ///
    /// Unparseable values are ignored rather than treated as errors; the
    /// description is free-form text and absent or garbled hints simply
    /// leave the corresponding field `None`.
    pub fn parse(description: &str) -> Self {
        let mut metadata = SlideMetadata::default();

        for part in description.split('|') {
            let part = part.trim();
            let Some(eq_pos) = part.find('=') else {
                continue;
            };
            let key = part[..eq_pos].trim();
            let value = part[eq_pos + 1..].trim();

            match key {
                "MPP" => {
                    if let Ok(mpp) = value.parse::<f32>() {
                        metadata.mpp = Some(mpp);
                    }
                }
                "AppMag" => {
                    if let Ok(magnification) = value.parse::<f32>() {
                        metadata.magnification = Some(magnification);
                    }
                }
                _ => {}
            }
        }

        metadata
    }
}

// =============================================================================
// Tests
// =============================================================================
