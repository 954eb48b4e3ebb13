//! Codec registry: maps a file extension (or sniffed magic bytes) to
//! a canonical [`CodecFormat`] and decode/encode/probe routines backed
//! by the `image` crate.
//!
//! The codec set is closed and enumerated (per Design Note #1 in
//! spec.md §9): a tagged `enum` beats open polymorphism here, and
//! decode/encode become a `match` over four variants rather than a
//! trait-object table.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;

use image::{ColorType, DynamicImage, ImageReader};

use crate::error::{CoreError, Result};
use crate::{ImageInfo, PixelBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecFormat {
    Jpeg,
    Png,
    WebP,
    Bmp,
}

impl CodecFormat {
    pub fn canonical_name(self) -> &'static str {
        match self {
            CodecFormat::Jpeg => "jpg",
            CodecFormat::Png => "png",
            CodecFormat::WebP => "webp",
            CodecFormat::Bmp => "bmp",
        }
    }

    pub fn from_extension(ext: &str) -> Option<CodecFormat> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(CodecFormat::Jpeg),
            "png" => Some(CodecFormat::Png),
            "webp" => Some(CodecFormat::WebP),
            "bmp" => Some(CodecFormat::Bmp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<CodecFormat> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(CodecFormat::from_extension)
    }

    /// Light magic-byte sniff; only overrides the extension when it
    /// succeeds (§4.2). Reads at most 16 bytes.
    fn sniff(header: &[u8]) -> Option<CodecFormat> {
        if header.len() >= 3 && header[0..3] == [0xFF, 0xD8, 0xFF] {
            return Some(CodecFormat::Jpeg);
        }
        if header.len() >= 8 && header[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
            return Some(CodecFormat::Png);
        }
        if header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WEBP" {
            return Some(CodecFormat::WebP);
        }
        if header.len() >= 2 && &header[0..2] == b"BM" {
            return Some(CodecFormat::Bmp);
        }
        None
    }

    fn image_format(self) -> image::ImageFormat {
        match self {
            CodecFormat::Jpeg => image::ImageFormat::Jpeg,
            CodecFormat::Png => image::ImageFormat::Png,
            CodecFormat::WebP => image::ImageFormat::WebP,
            CodecFormat::Bmp => image::ImageFormat::Bmp,
        }
    }
}

/// Resolve the format that governs an existing file: the sniffed
/// magic bytes if recognized, otherwise the extension.
pub fn resolve_input_format(path: &Path) -> Result<CodecFormat> {
    let mut header = [0u8; 16];
    let n = {
        let mut f = File::open(path).map_err(|_| {
            CoreError::FileNotFound(path.display().to_string())
        })?;
        f.read(&mut header).unwrap_or(0)
    };
    if let Some(sniffed) = CodecFormat::sniff(&header[..n]) {
        return Ok(sniffed);
    }
    CodecFormat::from_path(path).ok_or_else(|| {
        CoreError::UnsupportedFormat(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("<no extension>")
                .to_string(),
        )
    })
}

/// Resolve the format an output path demands, purely from its
/// extension (output format selection is never sniffed — there is
/// nothing to sniff yet).
pub fn resolve_output_format(path: &Path) -> Result<CodecFormat> {
    CodecFormat::from_path(path).ok_or_else(|| {
        CoreError::UnsupportedFormat(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("<no extension>")
                .to_string(),
        )
    })
}

/// Probe an image file's geometry, true channel count, and format.
///
/// `ImageInfo.channels` is a spec data-model field callers (notably
/// the `info` CLI command) treat as authoritative, so this derives it
/// from the same decode path `decode` uses rather than guessing from
/// the format tag — a PNG or JPEG can be gray, RGB, or RGBA, and the
/// format alone doesn't say which.
pub fn probe(path: &Path) -> Result<ImageInfo> {
    let (_buffer, info) = decode(path)?;
    Ok(info)
}

/// Decode an entire image into a tightly-packed [`PixelBuffer`],
/// along with the [`ImageInfo`] that decode actually observed (the
/// authoritative channel count, unlike `probe`'s guess).
pub fn decode(path: &Path) -> Result<(PixelBuffer, ImageInfo)> {
    if !path.exists() {
        return Err(CoreError::FileNotFound(path.display().to_string()));
    }
    let format = resolve_input_format(path)?;

    let file = File::open(path)?;
    let reader = ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .map_err(|e| CoreError::DecodeError(e.to_string()))?;
    let decoded = reader
        .decode()
        .map_err(|e| CoreError::DecodeError(e.to_string()))?;

    let (channels, data, width, height) = match &decoded {
        DynamicImage::ImageLuma8(buf) => (1u8, buf.clone().into_raw(), buf.width(), buf.height()),
        DynamicImage::ImageLumaA8(buf) => (2u8, buf.clone().into_raw(), buf.width(), buf.height()),
        DynamicImage::ImageRgba8(buf) => (4u8, buf.clone().into_raw(), buf.width(), buf.height()),
        _ if decoded.color().has_alpha() => {
            let buf = decoded.to_rgba8();
            (4u8, buf.clone().into_raw(), buf.width(), buf.height())
        }
        _ => {
            let buf = decoded.to_rgb8();
            (3u8, buf.clone().into_raw(), buf.width(), buf.height())
        }
    };

    let info = ImageInfo {
        width,
        height,
        channels,
        format: format.canonical_name().to_string(),
    };
    Ok((PixelBuffer::new(width, height, channels, data), info))
}

/// Encode `buffer` to `path`, inferring the format from `path`'s
/// extension. `quality` is interpreted only by JPEG; the other
/// encoders ignore it silently (§3 invariant).
pub fn encode(path: &Path, buffer: &PixelBuffer, quality: u8) -> Result<()> {
    let format = resolve_output_format(path)?;
    let file = File::create(path).map_err(|e| CoreError::WriteError(e.to_string()))?;
    let mut writer = BufWriter::new(file);

    match format {
        CodecFormat::Jpeg => {
            use image::codecs::jpeg::JpegEncoder;
            use image::ImageEncoder;
            // JPEG carries no alpha channel; drop or expand to RGB8 first.
            let owned;
            let data_ref: &[u8] = match buffer.channels {
                4 => {
                    owned = drop_alpha(&buffer.data, buffer.width, buffer.height);
                    &owned
                }
                1 | 2 => {
                    owned = expand_to_rgb(&buffer.data, buffer.channels, buffer.width, buffer.height);
                    &owned
                }
                _ => &buffer.data,
            };
            let encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder
                .write_image(data_ref, buffer.width, buffer.height, ColorType::Rgb8.into())
                .map_err(|e| CoreError::EncodeError(e.to_string()))?;
        }
        CodecFormat::Png => {
            use image::codecs::png::PngEncoder;
            use image::ImageEncoder;
            let color = color_type_for(buffer.channels)?;
            let encoder = PngEncoder::new(&mut writer);
            encoder
                .write_image(&buffer.data, buffer.width, buffer.height, color.into())
                .map_err(|e| CoreError::EncodeError(e.to_string()))?;
        }
        CodecFormat::Bmp => {
            use image::codecs::bmp::BmpEncoder;
            use image::ImageEncoder;
            let color = color_type_for(buffer.channels)?;
            let encoder = BmpEncoder::new(&mut writer);
            encoder
                .write_image(&buffer.data, buffer.width, buffer.height, color.into())
                .map_err(|e| CoreError::EncodeError(e.to_string()))?;
        }
        CodecFormat::WebP => {
            use image::codecs::webp::WebPEncoder;
            use image::ImageEncoder;
            let color = color_type_for(buffer.channels)?;
            let encoder = WebPEncoder::new_lossless(&mut writer);
            encoder
                .write_image(&buffer.data, buffer.width, buffer.height, color.into())
                .map_err(|e| CoreError::EncodeError(e.to_string()))?;
        }
    }

    Ok(())
}

fn color_type_for(channels: u8) -> Result<ColorType> {
    match channels {
        1 => Ok(ColorType::L8),
        2 => Ok(ColorType::La8),
        3 => Ok(ColorType::Rgb8),
        4 => Ok(ColorType::Rgba8),
        _ => Err(CoreError::InvalidOptions(format!(
            "unsupported channel count: {channels}"
        ))),
    }
}

fn drop_alpha(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let n = (width as usize) * (height as usize);
    let mut out = Vec::with_capacity(n * 3);
    for px in data.chunks_exact(4) {
        out.extend_from_slice(&px[0..3]);
    }
    out
}

fn expand_to_rgb(data: &[u8], channels: u8, width: u32, height: u32) -> Vec<u8> {
    let n = (width as usize) * (height as usize);
    let mut out = Vec::with_capacity(n * 3);
    match channels {
        1 => {
            for &g in data.iter() {
                out.extend_from_slice(&[g, g, g]);
            }
        }
        2 => {
            for px in data.chunks_exact(2) {
                out.extend_from_slice(&[px[0], px[0], px[0]]);
            }
        }
        _ => out.extend_from_slice(data),
    }
    out
}

/// Validate that an `ImageBuffer` round-trips cleanly for the given
/// channel count; used by kernel tests that need a real decodable
/// encode to assert against. Not part of the public contract.
#[cfg(test)]
pub(crate) fn synth_rgb(width: u32, height: u32) -> PixelBuffer {
    let buf: image::ImageBuffer<image::Rgb<u8>, Vec<u8>> =
        image::ImageBuffer::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
    PixelBuffer::new(width, height, 3, buf.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn extension_mapping_round_trips_canonical_names() {
        for (ext, name) in [("jpg", "jpg"), ("jpeg", "jpg"), ("png", "png"), ("webp", "webp"), ("bmp", "bmp")] {
            let fmt = CodecFormat::from_extension(ext).unwrap();
            assert_eq!(fmt.canonical_name(), name);
        }
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        assert!(CodecFormat::from_extension("tga").is_none());
    }

    #[test]
    fn sniff_overrides_misleading_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("actually_png.jpg");
        let buf = synth_rgb(4, 4);
        // Encode as real PNG bytes under a misleading .jpg extension.
        {
            use image::codecs::png::PngEncoder;
            use image::ImageEncoder;
            let mut f = std::fs::File::create(&path).unwrap();
            let encoder = PngEncoder::new(&mut f);
            encoder
                .write_image(&buf.data, buf.width, buf.height, ColorType::Rgb8.into())
                .unwrap();
        }
        let fmt = resolve_input_format(&path).unwrap();
        assert_eq!(fmt, CodecFormat::Png);
    }

    #[test]
    fn decode_encode_round_trip_preserves_channels() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("in.png");
        let buf = synth_rgb(16, 8);
        encode(&src, &buf, 85).unwrap();
        let (decoded, info) = decode(&src).unwrap();
        assert_eq!(info.channels, 3);
        assert_eq!(decoded.width, 16);
        assert_eq!(decoded.height, 8);
    }

    #[test]
    fn probe_missing_file_is_file_not_found() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.png");
        let err = probe(&missing).unwrap_err();
        matches!(err, CoreError::FileNotFound(_));
    }

    #[test]
    fn format_round_trip_tag_matches_every_supported_format() {
        let dir = tempdir().unwrap();
        let buf = synth_rgb(8, 8);
        for (ext, expect) in [("jpg", "jpg"), ("png", "png"), ("webp", "webp"), ("bmp", "bmp")] {
            let path = dir.path().join(format!("x.{ext}"));
            encode(&path, &buf, 85).unwrap();
            let info = probe(&path).unwrap();
            assert_eq!(info.format, expect);
        }
    }

    #[test]
    fn writing_requires_parent_directory_to_exist() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("missing_parent").join("x.png");
        let buf = synth_rgb(2, 2);
        let err = encode(&nested, &buf, 85).unwrap_err();
        matches!(err, CoreError::WriteError(_));
    }
}
