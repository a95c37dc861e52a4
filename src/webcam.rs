//! Frame capture from V4L2 webcams.
//!
//! Only devices that can stream JPEG or Motion JPEG frames at discrete sizes and frame rates are
//! used; nearly every USB webcam qualifies.

use std::{cmp::Reverse, env};

use anyhow::{bail, Context};
use linuxvideo::{
    format::{FrameIntervals, FrameSizes, PixFormat, Pixelformat},
    stream::ReadStream,
    BufType, CapabilityFlags, Device, Fract,
};

use crate::{image::Image, resolution::Resolution, timer::Timer};

const ENV_VAR_WEBCAM_NAME: &str = "HANDSIGN_WEBCAM_NAME";

/// Which webcam to open, and the frame format to ask it for.
#[derive(Debug, Default, Clone)]
pub struct WebcamOptions {
    name: Option<String>,
    prefs: FramePrefs,
}

impl WebcamOptions {
    /// Only opens the device whose card name is `name`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Asks for frames of at least this size. Smaller frames are accepted if the webcam has none.
    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.prefs.resolution = Some(resolution);
        self
    }

    /// Asks for at least `fps` frames per second. This is the first preference given up.
    pub fn fps(mut self, fps: u32) -> Self {
        self.prefs.fps = Some(fps);
        self
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct FramePrefs {
    resolution: Option<Resolution>,
    fps: Option<u32>,
}

/// A frame size and rate the device advertises.
#[derive(Clone, Copy)]
struct FrameFormat {
    resolution: Resolution,
    interval: Fract,
}

impl FrameFormat {
    /// Frames per second, rounded (30 for an interval of 333333/10000000).
    fn fps(&self) -> u32 {
        (1.0 / self.interval.as_f32()).round() as u32
    }

    fn satisfies(&self, prefs: FramePrefs) -> bool {
        let big_enough = prefs.resolution.map_or(true, |min| {
            self.resolution.width() >= min.width() && self.resolution.height() >= min.height()
        });
        let fast_enough = prefs.fps.map_or(true, |min| self.fps() >= min);
        big_enough && fast_enough
    }
}

/// Picks the format to stream with.
///
/// With a requested resolution, the smallest format that is at least that large wins, otherwise
/// the largest format. Among equal sizes the highest frame rate wins. If nothing satisfies
/// `prefs`, the frame rate preference is dropped, then the resolution preference.
fn pick_format(formats: &[FrameFormat], mut prefs: FramePrefs) -> Option<FrameFormat> {
    loop {
        let mut eligible = formats.iter().copied().filter(|fmt| fmt.satisfies(prefs));
        let picked = if prefs.resolution.is_some() {
            eligible.min_by_key(|fmt| (fmt.resolution.num_pixels(), Reverse(fmt.fps())))
        } else {
            eligible.max_by_key(|fmt| (fmt.resolution.num_pixels(), fmt.fps()))
        };
        if picked.is_some() {
            return picked;
        }

        log::debug!("no webcam format satisfies {:?}", prefs);
        if prefs.fps.take().is_none() && prefs.resolution.take().is_none() {
            return None;
        }
    }
}

fn jpeg_pixel_format(device: &Device) -> anyhow::Result<Pixelformat> {
    for desc in device.formats(BufType::VIDEO_CAPTURE) {
        let pixfmt = desc?.pixelformat();
        if pixfmt == Pixelformat::JPEG || pixfmt == Pixelformat::MJPG {
            return Ok(pixfmt);
        }
    }
    bail!("device cannot stream JPEG frames")
}

fn frame_formats(device: &Device, pixfmt: Pixelformat) -> anyhow::Result<Vec<FrameFormat>> {
    let FrameSizes::Discrete(sizes) = device.frame_sizes(pixfmt)? else {
        bail!("only discrete frame sizes are supported");
    };

    let mut formats = Vec::new();
    for size in sizes {
        let (width, height) = (size.width(), size.height());
        let FrameIntervals::Discrete(intervals) = device.frame_intervals(pixfmt, width, height)?
        else {
            bail!("only discrete frame intervals are supported ({width}x{height})");
        };
        formats.extend(intervals.into_iter().map(|interval| FrameFormat {
            resolution: Resolution::new(width, height),
            interval: *interval.fract(),
        }));
    }
    Ok(formats)
}

/// An open webcam stream.
pub struct Webcam {
    stream: ReadStream,
    resolution: Resolution,
    t_dequeue: Timer,
    t_decode: Timer,
}

impl Webcam {
    /// Opens the first webcam that matches `options` and can stream JPEG frames.
    ///
    /// Without a name in `options`, `HANDSIGN_WEBCAM_NAME` selects the device. Opening takes a
    /// few hundred milliseconds while the device powers up.
    pub fn open(options: WebcamOptions) -> anyhow::Result<Self> {
        let name = options.name.clone().or_else(|| env::var(ENV_VAR_WEBCAM_NAME).ok());
        if let Some(name) = &name {
            log::debug!("looking for webcam '{}'", name);
        }

        for device in linuxvideo::list()? {
            let device = match device {
                Ok(device) => device,
                Err(e) => {
                    log::warn!("skipping video device: {}", e);
                    continue;
                }
            };
            match Self::try_open(device, name.as_deref(), options.prefs) {
                Ok(Some(webcam)) => return Ok(webcam),
                Ok(None) => {}
                Err(e) => log::debug!("skipping video device: {:#}", e),
            }
        }

        match name {
            Some(name) => bail!("no usable webcam named '{}' found", name),
            None => bail!("no usable webcam found"),
        }
    }

    fn try_open(
        device: Device,
        name: Option<&str>,
        prefs: FramePrefs,
    ) -> anyhow::Result<Option<Self>> {
        let caps = device.capabilities()?;
        let path = device.path()?;
        if name.map_or(false, |name| caps.card() != name) {
            return Ok(None);
        }
        if !caps.device_capabilities().contains(CapabilityFlags::VIDEO_CAPTURE) {
            log::trace!("{} ({}) cannot capture video", caps.card(), path.display());
            return Ok(None);
        }

        let pixfmt = jpeg_pixel_format(&device)?;
        let formats = frame_formats(&device, pixfmt)?;
        let format = pick_format(&formats, prefs)
            .with_context(|| format!("{} advertises no frame formats", caps.card()))?;

        let res = format.resolution;
        let capture = device.video_capture(PixFormat::new(res.width(), res.height(), pixfmt))?;
        let actual = capture.format();
        let resolution = Resolution::new(actual.width(), actual.height());
        let interval = capture.set_frame_interval(format.interval)?;
        log::info!(
            "streaming {}x{} @ {:.1} fps from {} ({})",
            resolution.width(),
            resolution.height(),
            1.0 / interval.as_f32(),
            caps.card(),
            path.display(),
        );

        Ok(Some(Self {
            stream: capture.into_stream(2)?,
            resolution,
            t_dequeue: Timer::new("dequeue"),
            t_decode: Timer::new("decode"),
        }))
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Blocks until the next frame arrives and decodes it.
    ///
    /// Webcams occasionally send corrupt Motion JPEG frames. Those are logged and replaced by a
    /// blank frame, so only device errors end the stream.
    pub fn read(&mut self) -> anyhow::Result<Image> {
        let res = self.resolution;
        let t_decode = &mut self.t_decode;
        let waiting = self.t_dequeue.start();
        let image = self.stream.dequeue(|jpeg| {
            drop(waiting);
            let image = t_decode.time(|| Image::decode_jpeg(&jpeg)).unwrap_or_else(|e| {
                log::error!("dropping corrupt webcam frame: {:#}", e);
                Image::new(res.width(), res.height())
            });
            Ok(image)
        })?;
        Ok(image)
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_dequeue, &self.t_decode].into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_HD: Resolution = Resolution::new(1920, 1080);
    const VGA: Resolution = Resolution::new(640, 480);

    /// Formats of a typical USB webcam.
    fn webcam_formats() -> Vec<FrameFormat> {
        [
            (VGA, 30),
            (VGA, 60),
            (Resolution::RES_720P, 30),
            (FULL_HD, 30),
            (FULL_HD, 5),
        ]
        .into_iter()
        .map(|(resolution, fps)| FrameFormat {
            resolution,
            interval: Fract::new(1, fps),
        })
        .collect()
    }

    fn pick(resolution: Option<Resolution>, fps: Option<u32>) -> Option<(Resolution, u32)> {
        let picked = pick_format(&webcam_formats(), FramePrefs { resolution, fps })?;
        Some((picked.resolution, picked.fps()))
    }

    #[test]
    fn smallest_format_at_least_as_large() {
        assert_eq!(
            pick(Some(Resolution::RES_720P), None),
            Some((Resolution::RES_720P, 30))
        );
        assert_eq!(
            pick(Some(Resolution::new(800, 600)), None),
            Some((Resolution::RES_720P, 30))
        );
    }

    #[test]
    fn higher_frame_rate_wins_at_equal_size() {
        assert_eq!(pick(Some(VGA), None), Some((VGA, 60)));
        assert_eq!(pick(None, None), Some((FULL_HD, 30)));
    }

    #[test]
    fn frame_rate_is_given_up_first() {
        // No 1080p format reaches 60 fps; the resolution is kept.
        assert_eq!(pick(Some(FULL_HD), Some(60)), Some((FULL_HD, 30)));
        assert_eq!(pick(None, Some(60)), Some((VGA, 60)));
    }

    #[test]
    fn resolution_is_given_up_last() {
        // Larger than anything the webcam offers.
        assert_eq!(pick(Some(Resolution::new(3840, 2160)), Some(30)), Some((FULL_HD, 30)));
        assert!(pick_format(&[], FramePrefs::default()).is_none());
    }
}
