use std::{
    env::{self, VarError},
    process,
};

use anyhow::{anyhow, bail};
use image::ImageBuffer;
use once_cell::sync::Lazy;
use zune_jpeg::{
    zune_core::{colorspace::ColorSpace, options::DecoderOptions},
    JpegDecoder,
};

use super::Image;

/// The JPEG decoders that can be selected at runtime.
enum JpegBackend {
    /// Uses the `jpeg-decoder` crate (through `image`), a robust but slow pure-Rust decoder.
    JpegDecoder,
    /// Uses the `zune-jpeg` crate, which is considerably faster on webcam MJPG streams.
    ZuneJpeg,
}

const DEFAULT_BACKEND: JpegBackend = JpegBackend::ZuneJpeg;

static JPEG_BACKEND: Lazy<JpegBackend> = Lazy::new(|| match env::var("HANDSIGN_JPEG_BACKEND") {
    Ok(v) if v == "zune-jpeg" => JpegBackend::ZuneJpeg,
    Ok(v) if v == "jpeg-decoder" => JpegBackend::JpegDecoder,
    Ok(v) => {
        eprintln!("invalid value set for `HANDSIGN_JPEG_BACKEND` variable: '{v}'; exiting");
        process::exit(1);
    }
    Err(VarError::NotPresent) => DEFAULT_BACKEND,
    Err(VarError::NotUnicode(s)) => {
        eprintln!(
            "invalid value set for `HANDSIGN_JPEG_BACKEND` variable: {}; exiting",
            s.to_string_lossy()
        );
        process::exit(1);
    }
});

pub(super) fn decode_jpeg(data: &[u8]) -> anyhow::Result<Image> {
    let buf = match *JPEG_BACKEND {
        JpegBackend::JpegDecoder => {
            image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)?.to_rgba8()
        }
        JpegBackend::ZuneJpeg => {
            let mut decomp = JpegDecoder::new_with_options(
                DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGBA),
                data,
            );
            decomp.decode_headers()?;
            let colorspace = decomp.get_output_colorspace();
            if colorspace != Some(ColorSpace::RGBA) {
                bail!("unsupported colorspace {colorspace:?} (expected RGBA)");
            }

            let size = decomp
                .output_buffer_size()
                .ok_or_else(|| anyhow!("JPEG headers do not describe the output size"))?;
            let mut buf = vec![0; size];
            decomp.decode_into(&mut buf)?;
            let (width, height) = decomp
                .dimensions()
                .ok_or_else(|| anyhow!("JPEG decoder did not report image dimensions"))?;
            ImageBuffer::from_raw(width.into(), height.into(), buf)
                .ok_or_else(|| anyhow!("decoded JPEG data does not match a {width}x{height} image"))?
        }
    };

    Ok(Image { buf })
}
