use crate::decode::decoder::{PixelFormat, RawFrame};
use crate::foundation::error::{ScrollyError, ScrollyResult};
use crate::frames::DecodedFrame;

/// Convert a decoder picture into a drawable RGBA8 frame, consuming the raw buffer.
pub fn to_decoded(raw: RawFrame) -> ScrollyResult<DecodedFrame> {
    let RawFrame {
        width,
        height,
        format,
        timestamp_us,
        data,
    } = raw;
    if width == 0 || height == 0 {
        return Err(ScrollyError::decoder(format!(
            "decoder produced an empty {width}x{height} frame"
        )));
    }
    let expected = expected_len(width, height, format);
    if data.len() != expected {
        return Err(ScrollyError::decoder(format!(
            "{format:?} frame {width}x{height} has {} bytes, expected {expected}",
            data.len()
        )));
    }

    let rgba = match format {
        PixelFormat::Rgba8 => data,
        PixelFormat::Bgra8 => {
            let mut data = data;
            for px in data.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
            data
        }
        PixelFormat::I420 => i420_to_rgba(width as usize, height as usize, &data),
    };

    let image = image::RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| ScrollyError::decoder("rgba buffer does not match frame size"))?;
    let frame = DecodedFrame::new(image);
    Ok(match timestamp_us {
        Some(ts) => frame.with_timestamp(ts),
        None => frame,
    })
}

pub fn expected_len(width: u32, height: u32, format: PixelFormat) -> usize {
    let (w, h) = (width as usize, height as usize);
    match format {
        PixelFormat::Rgba8 | PixelFormat::Bgra8 => w * h * 4,
        PixelFormat::I420 => w * h + 2 * w.div_ceil(2) * h.div_ceil(2),
    }
}

// BT.601 limited range.
fn i420_to_rgba(w: usize, h: usize, data: &[u8]) -> Vec<u8> {
    let cw = w.div_ceil(2);
    let ch = h.div_ceil(2);
    let (y_plane, rest) = data.split_at(w * h);
    let (u_plane, v_plane) = rest.split_at(cw * ch);

    let mut out = vec![0u8; w * h * 4];
    for row in 0..h {
        for col in 0..w {
            let y = i32::from(y_plane[row * w + col]) - 16;
            let ci = (row / 2) * cw + col / 2;
            let u = i32::from(u_plane[ci]) - 128;
            let v = i32::from(v_plane[ci]) - 128;

            let r = (298 * y + 409 * v + 128) >> 8;
            let g = (298 * y - 100 * u - 208 * v + 128) >> 8;
            let b = (298 * y + 516 * u + 128) >> 8;

            let o = (row * w + col) * 4;
            out[o] = r.clamp(0, 255) as u8;
            out[o + 1] = g.clamp(0, 255) as u8;
            out[o + 2] = b.clamp(0, 255) as u8;
            out[o + 3] = 255;
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/decode/convert.rs"]
mod tests;
