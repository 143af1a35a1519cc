use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

pub const INPUT_SIZE: u32 = 224;
pub const INPUT_CHANNELS: usize = 3;
pub const PIXEL_SCALE: f32 = 255.0;

#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("Invalid image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Tensor shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Decodes `image_data` and turns it into the `[1, 224, 224, 3]` model input.
pub fn preprocess_image(image_data: &[u8]) -> Result<Array4<f32>, PreprocessError> {
    let rgb = decode_rgb(image_data)?;
    to_tensor(&rgb)
}

pub fn decode_rgb(image_data: &[u8]) -> Result<RgbImage, PreprocessError> {
    let image = image::load_from_memory(image_data)?;
    Ok(image.to_rgb8())
}

/// Resizes to `INPUT_SIZE` square, scales into `[0, 1]` and adds the batch axis.
/// Layout is NHWC, matching the row-major pixel order of `RgbImage`.
pub fn to_tensor(rgb: &RgbImage) -> Result<Array4<f32>, PreprocessError> {
    let pixels = if rgb.dimensions() == (INPUT_SIZE, INPUT_SIZE) {
        rgb.as_raw().clone()
    } else {
        imageops::resize(rgb, INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom).into_raw()
    };

    let side = INPUT_SIZE as usize;
    let values = pixels
        .into_iter()
        .map(|v| f32::from(v) / PIXEL_SCALE)
        .collect::<Vec<f32>>();

    Ok(Array4::from_shape_vec((1, side, side, INPUT_CHANNELS), values)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        image.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb(color));
        encode(DynamicImage::ImageRgb8(image), ImageFormat::Png)
    }

    #[test]
    fn any_input_size_becomes_model_shape() {
        for (w, h) in [(1, 1), (10, 10), (300, 120), (224, 224), (640, 480)] {
            let tensor = preprocess_image(&solid_png(w, h, [10, 20, 30])).unwrap();
            assert_eq!(tensor.shape(), &[1, 224, 224, 3], "input {}x{}", w, h);
        }
    }

    #[test]
    fn values_are_scaled_into_unit_range() {
        let tensor = preprocess_image(&solid_png(10, 10, [0, 255, 0])).unwrap();
        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));

        let tolerance = 1.0 / PIXEL_SCALE + f32::EPSILON;
        assert!(tensor[[0, 112, 112, 0]].abs() < tolerance);
        assert!((tensor[[0, 112, 112, 1]] - 1.0).abs() < tolerance);
        assert!(tensor[[0, 112, 112, 2]].abs() < tolerance);
    }

    #[test]
    fn exact_size_input_is_copied_without_resampling() {
        let mut image = RgbImage::new(INPUT_SIZE, INPUT_SIZE);
        image.put_pixel(3, 5, Rgb([255, 51, 0]));
        let tensor = to_tensor(&image).unwrap();

        assert_eq!(tensor[[0, 5, 3, 0]], 1.0);
        assert_eq!(tensor[[0, 5, 3, 1]], 51.0 / PIXEL_SCALE);
        assert_eq!(tensor[[0, 5, 3, 2]], 0.0);
        assert_eq!(tensor[[0, 3, 5, 0]], 0.0);
    }

    #[test]
    fn alpha_channel_is_dropped() {
        let image = RgbaImage::from_pixel(4, 4, Rgba([200, 100, 50, 0]));
        let rgb = decode_rgb(&encode(DynamicImage::ImageRgba8(image), ImageFormat::Png)).unwrap();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([200, 100, 50]));
    }

    #[test]
    fn preprocessing_is_deterministic() {
        let mut image = RgbImage::new(37, 53);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 7) as u8, (y * 3) as u8, ((x + y) * 5) as u8]);
        }
        let bytes = encode(DynamicImage::ImageRgb8(image), ImageFormat::Png);

        let first = preprocess_image(&bytes).unwrap();
        let second = preprocess_image(&bytes).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = preprocess_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, PreprocessError::Decode(_)));
        assert!(err.to_string().starts_with("Invalid image: "));
    }

    #[test]
    fn empty_input_is_a_decode_error() {
        assert!(matches!(
            preprocess_image(&[]),
            Err(PreprocessError::Decode(_))
        ));
    }
}
