use serde::Deserialize;

use crate::utils::TsuyaError;

fn default_frame_time() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
struct MetadataFile {
    #[serde(default)]
    animation: Option<AnimationSection>,
}

#[derive(Debug, Deserialize)]
struct AnimationSection {
    #[serde(default)]
    frames: Option<Vec<FrameEntry>>,
    #[serde(default)]
    width: Option<i64>,
    #[serde(default)]
    height: Option<i64>,
    #[serde(default = "default_frame_time", rename = "frametime")]
    frame_time: i64,
    #[serde(default)]
    interpolate: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FrameEntry {
    Index(i64),
    Timed {
        index: i64,
        #[serde(default)]
        time: Option<i64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationFrame {
    pub index: u32,
    /// Ticks this frame stays visible; `None` uses the default frame time.
    pub time: Option<u32>,
}

/// The `animation` section of an asset's sidecar metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationMetadata {
    /// Explicit frame order; empty means every frame of the image in order.
    pub frames: Vec<AnimationFrame>,
    pub frame_width: Option<u32>,
    pub frame_height: Option<u32>,
    pub default_frame_time: u32,
    pub interpolate: bool,
}

impl Default for AnimationMetadata {
    fn default() -> Self {
        Self {
            frames: Vec::new(),
            frame_width: None,
            frame_height: None,
            default_frame_time: 1,
            interpolate: false,
        }
    }
}

fn positive(value: i64, what: &str) -> Result<u32, TsuyaError> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| TsuyaError::MalformedMetadata(format!("invalid {what}: {value}")))
}

impl AnimationMetadata {
    /// Parses raw sidecar metadata. Returns `None` when it has no animation section.
    pub fn parse(bytes: &[u8]) -> Result<Option<Self>, TsuyaError> {
        let file: MetadataFile = serde_json::from_slice(bytes)
            .map_err(|err| TsuyaError::MalformedMetadata(err.to_string()))?;
        let Some(section) = file.animation else {
            return Ok(None);
        };

        let mut frames = Vec::new();
        for entry in section.frames.unwrap_or_default() {
            let frame = match entry {
                FrameEntry::Index(index) => AnimationFrame {
                    index: u32::try_from(index).map_err(|_| {
                        TsuyaError::MalformedMetadata(format!("invalid frame index: {index}"))
                    })?,
                    time: None,
                },
                FrameEntry::Timed { index, time } => AnimationFrame {
                    index: u32::try_from(index).map_err(|_| {
                        TsuyaError::MalformedMetadata(format!("invalid frame index: {index}"))
                    })?,
                    time: time.map(|t| positive(t, "frame time")).transpose()?,
                },
            };
            frames.push(frame);
        }

        Ok(Some(Self {
            frames,
            frame_width: section.width.map(|w| positive(w, "frame width")).transpose()?,
            frame_height: section.height.map(|h| positive(h, "frame height")).transpose()?,
            default_frame_time: positive(section.frame_time, "default frame time")?,
            interpolate: section.interpolate,
        }))
    }

    fn declared_frame_size(&self, width: u32, height: u32) -> (u32, u32) {
        match (self.frame_width, self.frame_height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, height),
            (None, Some(h)) => (width, h),
            (None, None) => {
                let side = width.min(height);
                (side, side)
            }
        }
    }
}

/// Size of one animation frame of a `width` x `height` image.
///
/// Without metadata the whole image is a single frame. The image must be an
/// integer multiple of the frame size.
pub fn frame_size(
    metadata: Option<&AnimationMetadata>,
    width: u32,
    height: u32,
) -> Result<(u32, u32), TsuyaError> {
    let Some(metadata) = metadata else {
        return Ok((width, height));
    };

    let (frame_width, frame_height) = metadata.declared_frame_size(width, height);
    let divides = |total: u32, part: u32| part != 0 && total % part == 0;
    if divides(width, frame_width) && divides(height, frame_height) {
        Ok((frame_width, frame_height))
    } else {
        Err(TsuyaError::MalformedMetadata(format!(
            "image size {width},{height} is not multiply of frame size {frame_width},{frame_height}"
        )))
    }
}
