use crate::error::{CompressionError, Result};
use image::{DynamicImage, RgbaImage};
use imagequant::{Attributes, Image as LiqImage, RGBA};

/// Reduces an image to an adaptive palette of at most `colors` entries.
///
/// The result is expanded back to RGBA so the rest of the pipeline can keep
/// working on a `DynamicImage`; the PNG optimizer later stores it indexed.
pub fn quantize_to_palette(img: &DynamicImage, colors: u32) -> Result<DynamicImage> {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut attr = Attributes::new();
    attr.set_max_colors(colors).map_err(quant_err)?;

    let pixels: Vec<RGBA> = rgba
        .pixels()
        .map(|p| RGBA::new(p[0], p[1], p[2], p[3]))
        .collect();

    let mut liq_img = LiqImage::new(
        &attr,
        pixels.as_slice(),
        width as usize,
        height as usize,
        0.0,
    )
    .map_err(quant_err)?;
    let mut res = attr.quantize(&mut liq_img).map_err(quant_err)?;
    // Adaptive palette conversion without dithering
    res.set_dithering_level(0.0).map_err(quant_err)?;

    let (palette, indices) = res.remapped(&mut liq_img).map_err(quant_err)?;

    let mut expanded = Vec::with_capacity(indices.len() * 4);
    for idx in indices {
        let p = palette[idx as usize];
        expanded.extend_from_slice(&[p.r, p.g, p.b, p.a]);
    }

    let quantized = RgbaImage::from_raw(width, height, expanded).ok_or_else(|| {
        CompressionError::Quantization("palette expansion size mismatch".to_string())
    })?;
    Ok(DynamicImage::ImageRgba8(quantized))
}

fn quant_err(e: imagequant::Error) -> CompressionError {
    CompressionError::Quantization(e.to_string())
}
