use image::RgbImage;

use crate::domain::{
    errors::{DomainError, DomainResult},
    frame::BgrFrame,
};

/// Decodifica los bytes subidos (PNG, JPEG, ...) y los deja en orden BGR.
pub fn decode_frame(bytes: &[u8]) -> DomainResult<BgrFrame> {
    let img = image::load_from_memory(bytes).map_err(|e| DomainError::DecodeError(e.to_string()))?;
    Ok(rgb_to_bgr(img.into_rgb8()))
}

pub fn rgb_to_bgr(rgb: RgbImage) -> BgrFrame {
    let (width, height) = rgb.dimensions();
    let mut data = rgb.into_raw();
    for px in data.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    BgrFrame { width, height, data }
}

pub fn bgr_to_rgb(frame: &BgrFrame) -> DomainResult<RgbImage> {
    let mut data = frame.data.clone();
    for px in data.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    RgbImage::from_raw(frame.width, frame.height, data).ok_or_else(|| {
        DomainError::DecodeError(format!(
            "frame buffer does not match {}x{}x3",
            frame.width, frame.height
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(img: &image::DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn swaps_red_and_blue() {
        let mut rgb = RgbImage::new(2, 1);
        rgb.put_pixel(0, 0, Rgb([10, 20, 30]));
        rgb.put_pixel(1, 0, Rgb([255, 0, 1]));
        let frame = rgb_to_bgr(rgb);
        assert_eq!(frame.pixel(0, 0), Some([30, 20, 10]));
        assert_eq!(frame.pixel(1, 0), Some([1, 0, 255]));
        assert_eq!(frame.pixel(2, 0), None);
    }

    #[test]
    fn bgr_round_trips_to_rgb() {
        let mut rgb = RgbImage::new(3, 2);
        rgb.put_pixel(2, 1, Rgb([7, 8, 9]));
        let back = bgr_to_rgb(&rgb_to_bgr(rgb.clone())).unwrap();
        assert_eq!(back, rgb);
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let frame = BgrFrame { width: 4, height: 4, data: vec![0; 5] };
        assert!(matches!(bgr_to_rgb(&frame), Err(DomainError::DecodeError(_))));
    }

    #[test]
    fn decodes_png() {
        let mut rgb = RgbImage::new(4, 3);
        rgb.put_pixel(1, 1, Rgb([200, 100, 50]));
        let bytes = encode(&image::DynamicImage::ImageRgb8(rgb), ImageFormat::Png);
        let frame = decode_frame(&bytes).unwrap();
        assert_eq!((frame.width, frame.height), (4, 3));
        assert_eq!(frame.pixel(1, 1), Some([50, 100, 200]));
    }

    #[test]
    fn alpha_channel_is_dropped() {
        let mut rgba = RgbaImage::new(2, 2);
        rgba.put_pixel(0, 0, Rgba([1, 2, 3, 128]));
        let bytes = encode(&image::DynamicImage::ImageRgba8(rgba), ImageFormat::Png);
        let frame = decode_frame(&bytes).unwrap();
        assert_eq!(frame.data.len(), 2 * 2 * 3);
        assert_eq!(frame.pixel(0, 0), Some([3, 2, 1]));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode_frame(b"definitely not an image").unwrap_err();
        assert!(matches!(err, DomainError::DecodeError(_)));
        assert!(!err.to_string().is_empty());
    }
}
