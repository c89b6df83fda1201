use image::{Rgba, RgbaImage, imageops};
use tracing::warn;

use crate::{
    meta::{DeviceTexture, SpriteInfo, SpriteName, SpritePlacement},
    parsing::AnimationMetadata,
    utils::TsuyaError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameTiming {
    index: u32,
    time: u32,
}

/// What a single animation tick asks the sprite to upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tick {
    Idle,
    Show(u32),
    Blend { from: u32, to: u32, weight: u32, time: u32 },
}

/// Frame ticker of an animated sprite. Advances one tick per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteAnimation {
    frames: Vec<FrameTiming>,
    frame: usize,
    sub_frame: u32,
    interpolate: bool,
}

impl SpriteAnimation {
    /// Builds the ticker for an image holding `frame_count` frames. Returns
    /// `None` when fewer than two frames would be shown.
    pub fn new(name: &SpriteName, metadata: &AnimationMetadata, frame_count: u32) -> Option<Self> {
        let frames: Vec<FrameTiming> = if metadata.frames.is_empty() {
            (0..frame_count)
                .map(|index| FrameTiming {
                    index,
                    time: metadata.default_frame_time,
                })
                .collect()
        } else {
            metadata
                .frames
                .iter()
                .filter_map(|frame| {
                    if frame.index >= frame_count {
                        warn!(resource = "sprite", sprite = %name, index = frame.index, "invalid frame index");
                        return None;
                    }
                    Some(FrameTiming {
                        index: frame.index,
                        time: frame.time.unwrap_or(metadata.default_frame_time),
                    })
                })
                .collect()
        };

        if frames.len() <= 1 {
            return None;
        }

        Some(Self {
            frames,
            frame: 0,
            sub_frame: 0,
            interpolate: metadata.interpolate,
        })
    }

    /// Position in the frame list.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Ticks spent on the current frame.
    pub fn sub_frame(&self) -> u32 {
        self.sub_frame
    }

    /// Image frame currently shown.
    pub fn current_index(&self) -> u32 {
        self.frames[self.frame].index
    }

    pub fn first_index(&self) -> u32 {
        self.frames[0].index
    }

    fn tick(&mut self) -> Tick {
        self.sub_frame += 1;
        let current = self.frames[self.frame];
        let next = self.frames[(self.frame + 1) % self.frames.len()];

        if self.sub_frame >= current.time {
            self.frame = (self.frame + 1) % self.frames.len();
            self.sub_frame = 0;
            if current.index != next.index {
                return Tick::Show(next.index);
            }
        } else if self.interpolate && current.index != next.index {
            return Tick::Blend {
                from: current.index,
                to: next.index,
                weight: self.sub_frame,
                time: current.time,
            };
        }
        Tick::Idle
    }
}

fn mix(d: f64, a: u8, b: u8) -> u8 {
    (d * a as f64 + (1.0 - d) * b as f64) as u8
}

/// Mip chain of `image`: level `l` is half the size of level `l - 1`.
fn generate_mip_levels(image: RgbaImage, mip_levels: u32) -> Vec<RgbaImage> {
    let mut levels = vec![image];
    for _ in 1..mip_levels {
        let Some(previous) = levels.last() else { break };
        let (width, height) = (previous.width() / 2, previous.height() / 2);
        if width == 0 || height == 0 {
            break;
        }
        let next = imageops::resize(previous, width, height, imageops::FilterType::Triangle);
        levels.push(next);
    }
    levels
}

////////////////////////////////////////////////
/// CompanionSprite
/// * Companion map pixels for one base sprite, placed at the base sprite's
///   atlas coordinates with the base sprite's frame size and mip levels.
/// * Keeps the decoded image (all frames, all mip levels) so frames can be
///   re-uploaded when the atlas is reloaded or animated.
////////////////////////////////////////////////
#[derive(Debug, Clone)]
pub struct CompanionSprite {
    name: SpriteName,
    placement: SpritePlacement,
    width: u32,
    height: u32,
    frames_per_row: u32,
    levels: Vec<RgbaImage>,
    animation: Option<SpriteAnimation>,
}

impl CompanionSprite {
    /// `info` carries the companion's name, frame size and animation; the
    /// frame size must divide `image`.
    pub fn new(info: &SpriteInfo, placement: SpritePlacement, image: RgbaImage) -> Self {
        let frames_per_row = (image.width() / info.width.max(1)).max(1);
        let frame_count = frames_per_row * (image.height() / info.height.max(1)).max(1);
        let animation = info
            .animation
            .as_ref()
            .and_then(|metadata| SpriteAnimation::new(&info.name, metadata, frame_count));

        Self {
            name: info.name.clone(),
            placement,
            width: info.width,
            height: info.height,
            frames_per_row,
            levels: generate_mip_levels(image, placement.max_level + 1),
            animation,
        }
    }

    pub fn name(&self) -> &SpriteName {
        &self.name
    }

    pub fn x(&self) -> u32 {
        self.placement.x
    }

    pub fn y(&self) -> u32 {
        self.placement.y
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn max_level(&self) -> u32 {
        self.placement.max_level
    }

    pub fn placement(&self) -> &SpritePlacement {
        &self.placement
    }

    pub fn is_animated(&self) -> bool {
        self.animation.is_some()
    }

    pub fn animation(&self) -> Option<&SpriteAnimation> {
        self.animation.as_ref()
    }

    fn frame_origin(&self, index: u32) -> (u32, u32) {
        (
            index % self.frames_per_row * self.width,
            index / self.frames_per_row * self.height,
        )
    }

    /// Frame `index` at mip `level`, or `None` when the level is too small.
    fn frame_image(&self, index: u32, level: u32) -> Option<RgbaImage> {
        let source = self.levels.get(level as usize)?;
        let (width, height) = (self.width >> level, self.height >> level);
        if width == 0 || height == 0 {
            return None;
        }
        let (fx, fy) = self.frame_origin(index);
        Some(imageops::crop_imm(source, fx >> level, fy >> level, width, height).to_image())
    }

    /// The frame currently shown, at mip `level`.
    pub fn current_frame(&self, level: u32) -> Option<RgbaImage> {
        let index = self.animation.as_ref().map_or(0, SpriteAnimation::current_index);
        self.frame_image(index, level)
    }

    fn upload_image(&self, texture: &DeviceTexture, level: u32, image: &RgbaImage) -> Result<(), TsuyaError> {
        texture.upload(level, self.placement.x >> level, self.placement.y >> level, image)
    }

    fn upload_frame(&self, texture: &DeviceTexture, index: u32) -> Result<(), TsuyaError> {
        for level in 0..self.levels.len() as u32 {
            if let Some(image) = self.frame_image(index, level) {
                self.upload_image(texture, level, &image)?;
            }
        }
        Ok(())
    }

    /// Uploads the animation's first frame (or the only frame) into `texture`.
    pub fn upload_first_frame(&self, texture: &DeviceTexture) -> Result<(), TsuyaError> {
        let index = self.animation.as_ref().map_or(0, SpriteAnimation::first_index);
        self.upload_frame(texture, index)
    }

    fn upload_blended(
        &self,
        texture: &DeviceTexture,
        from: u32,
        to: u32,
        d: f64,
    ) -> Result<(), TsuyaError> {
        for level in 0..self.levels.len() as u32 {
            let (Some(current), Some(next)) = (self.frame_image(from, level), self.frame_image(to, level))
            else {
                continue;
            };
            let blended = RgbaImage::from_fn(current.width(), current.height(), |x, y| {
                let Rgba([r0, g0, b0, a0]) = *current.get_pixel(x, y);
                let Rgba([r1, g1, b1, _]) = *next.get_pixel(x, y);
                Rgba([mix(d, r0, r1), mix(d, g0, g1), mix(d, b0, b1), a0])
            });
            self.upload_image(texture, level, &blended)?;
        }
        Ok(())
    }

    /// Advances the animation by one tick. When `texture` is given, uploads
    /// into it if the visible pixels changed. Static sprites ignore ticks.
    pub fn cycle_frames(&mut self, texture: Option<&DeviceTexture>) -> Result<(), TsuyaError> {
        let Some(animation) = self.animation.as_mut() else {
            return Ok(());
        };
        let tick = animation.tick();
        let Some(texture) = texture else {
            return Ok(());
        };

        match tick {
            Tick::Idle => Ok(()),
            Tick::Show(index) => self.upload_frame(texture, index),
            Tick::Blend { from, to, weight, time } => {
                let d = 1.0 - weight as f64 / time as f64;
                self.upload_blended(texture, from, to, d)
            }
        }
    }
}
