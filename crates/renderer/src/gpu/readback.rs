use std::io::Cursor;

use anyhow::anyhow;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::types::{ExportFormat, RendererError};

use super::context::RenderTarget;

const BYTES_PER_PIXEL: u32 = 4;

pub(crate) fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Copies `target` into a mappable buffer and returns its tightly packed
/// premultiplied RGBA rows, top row first.
pub(crate) fn read_target(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    target: &RenderTarget,
) -> Result<Vec<u8>, RendererError> {
    let (width, height) = target.size();
    let padded = padded_bytes_per_row(width);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback buffer"),
        size: u64::from(padded) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &target.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(Some(encoder.finish()));

    let slice = buffer.slice(..);
    let (sender, receiver) = crossbeam_channel::bounded(1);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device
        .poll(wgpu::PollType::Wait)
        .map_err(|err| anyhow!("GPU poll failed during readback: {err}"))?;
    receiver
        .recv()
        .map_err(|_| anyhow!("readback map callback never fired"))??;

    let mapped = slice.get_mapped_range();
    let pixels = unpad_rows(&mapped, width, height, padded);
    drop(mapped);
    buffer.unmap();
    buffer.destroy();
    Ok(pixels)
}

pub(crate) fn unpad_rows(mapped: &[u8], width: u32, height: u32, padded: u32) -> Vec<u8> {
    let row_bytes = (width * BYTES_PER_PIXEL) as usize;
    let mut out = Vec::with_capacity(row_bytes * height as usize);
    for row in mapped.chunks(padded as usize).take(height as usize) {
        out.extend_from_slice(&row[..row_bytes]);
    }
    out
}

/// Converts premultiplied RGBA to straight alpha in place.
pub(crate) fn unpremultiply(pixels: &mut [u8]) {
    for pixel in pixels.chunks_exact_mut(4) {
        let alpha = pixel[3];
        if alpha == 0 {
            pixel[..3].fill(0);
            continue;
        }
        if alpha == u8::MAX {
            continue;
        }
        for channel in &mut pixel[..3] {
            let value = (u32::from(*channel) * 255 + u32::from(alpha) / 2) / u32::from(alpha);
            *channel = value.min(255) as u8;
        }
    }
}

pub(crate) fn encode(
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    format: ExportFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, RendererError> {
    let image = RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("pixel buffer does not match {width}x{height}"))?;
    let mut bytes = Cursor::new(Vec::new());
    match format {
        ExportFormat::Png => {
            image.write_to(&mut bytes, ImageFormat::Png)?;
        }
        ExportFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
            rgb.write_with_encoder(JpegEncoder::new_with_quality(
                &mut bytes,
                jpeg_quality.clamp(1, 100),
            ))?;
        }
    }
    Ok(bytes.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
    }

    #[test]
    fn unpad_strips_row_padding() {
        let padded = padded_bytes_per_row(2) as usize;
        let mut mapped = vec![0u8; padded * 2];
        mapped[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        mapped[padded..padded + 8].copy_from_slice(&[9, 10, 11, 12, 13, 14, 15, 16]);
        let rows = unpad_rows(&mapped, 2, 2, padded as u32);
        assert_eq!(rows, (1..=16).collect::<Vec<u8>>());
    }

    #[test]
    fn unpremultiply_restores_straight_colour() {
        let mut pixels = vec![64, 32, 0, 128, 10, 20, 30, 0, 200, 100, 50, 255];
        unpremultiply(&mut pixels);
        assert_eq!(&pixels[..4], &[128, 64, 0, 128]);
        assert_eq!(&pixels[4..8], &[0, 0, 0, 0]);
        assert_eq!(&pixels[8..], &[200, 100, 50, 255]);
    }

    #[test]
    fn png_and_jpeg_have_their_signatures() {
        let pixels = vec![255u8; 4 * 4 * 4];
        let png = encode(pixels.clone(), 4, 4, ExportFormat::Png, 90).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let jpeg = encode(pixels, 4, 4, ExportFormat::Jpeg, 90).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn mismatched_buffer_is_an_error() {
        let err = encode(vec![0; 3], 1, 1, ExportFormat::Png, 90).unwrap_err();
        assert!(matches!(err, RendererError::Gpu(_)));
    }
}
