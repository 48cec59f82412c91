//! In-memory test image generation

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

fn encode(img: RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, format)
        .expect("Failed to encode test image");
    bytes.into_inner()
}

/// Solid-color PNG
pub fn generate_test_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    encode(RgbImage::from_pixel(width, height, Rgb(rgb)), ImageFormat::Png)
}

/// Solid-color JPEG
pub fn generate_test_jpeg(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    encode(RgbImage::from_pixel(width, height, Rgb(rgb)), ImageFormat::Jpeg)
}

/// PNG with the top half `top` and the bottom half `bottom`
pub fn generate_two_tone_png(width: u32, height: u32, top: [u8; 3], bottom: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |_, y| {
        if y < height / 2 {
            Rgb(top)
        } else {
            Rgb(bottom)
        }
    });
    encode(img, ImageFormat::Png)
}
