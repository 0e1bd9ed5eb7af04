//! CLIP image preprocessing: resize, center-crop, normalize, CHW layout.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

use crate::AiError;

/// Side length of the square CLIP input.
pub const IMAGE_SIZE: u32 = 224;

/// Per-channel RGB mean used during CLIP training.
pub const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
/// Per-channel RGB standard deviation used during CLIP training.
pub const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Flat `f32` pixel data with its `[batch, channels, height, width]` shape.
#[derive(Debug, Clone)]
pub struct PixelTensor {
    pub data: Vec<f32>,
    pub shape: [usize; 4],
}

impl PixelTensor {
    /// Value at channel `c`, row `y`, column `x` of the single batch item.
    pub fn at(&self, c: usize, y: usize, x: usize) -> f32 {
        let [_, _, h, w] = self.shape;
        self.data[(c * h + y) * w + x]
    }
}

/// Open an image file and preprocess it.
pub fn load_and_preprocess(path: &Path) -> Result<PixelTensor, AiError> {
    let img = image::open(path)?;
    debug!(path = %path.display(), width = img.width(), height = img.height(), "loaded image");
    Ok(preprocess_image(&img))
}

/// Resize the shortest side to 224 (bicubic), center-crop 224×224, then
/// normalize each channel with [`CLIP_MEAN`] / [`CLIP_STD`].
pub fn preprocess_image(img: &DynamicImage) -> PixelTensor {
    let (w, h) = img.dimensions();
    let scale = IMAGE_SIZE as f32 / w.min(h).max(1) as f32;
    let new_w = ((w as f32 * scale).round() as u32).max(IMAGE_SIZE);
    let new_h = ((h as f32 * scale).round() as u32).max(IMAGE_SIZE);

    let resized = img.resize_exact(new_w, new_h, FilterType::CatmullRom);
    let left = (new_w - IMAGE_SIZE) / 2;
    let top = (new_h - IMAGE_SIZE) / 2;
    let rgb = resized
        .crop_imm(left, top, IMAGE_SIZE, IMAGE_SIZE)
        .to_rgb8();

    let side = IMAGE_SIZE as usize;
    let plane = side * side;
    let mut data = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let offset = y as usize * side + x as usize;
        for c in 0..3 {
            let v = pixel.0[c] as f32 / 255.0;
            data[c * plane + offset] = (v - CLIP_MEAN[c]) / CLIP_STD[c];
        }
    }

    PixelTensor {
        data,
        shape: [1, 3, side, side],
    }
}
