//! Synchronous decode / resize / paste / encode steps.

use image::{DynamicImage, RgbaImage};

use super::layout::{self, Placement, Size};
use crate::error::{CompositeError, CompositeResult};

/// PNG output plus where the subject was placed.
#[derive(Debug, Clone)]
pub struct RenderedComposite {
    pub png_bytes: Vec<u8>,
    pub canvas: Size,
    pub placement: Placement,
}

/// Composites an already segmented subject onto a backdrop.
///
/// `segmented` is the collaborator's output (any decodable format with
/// alpha); `backdrop` is the raw second photo.
pub fn compose_layers(segmented: &[u8], backdrop: &[u8]) -> CompositeResult<RenderedComposite> {
    let subject = decode_rgba(segmented).map_err(CompositeError::segmentation)?;
    let mut canvas = decode_rgba(backdrop).map_err(CompositeError::decode)?;

    let canvas_size = Size::new(canvas.width(), canvas.height());
    let placement = layout::place(Size::new(subject.width(), subject.height()), canvas_size);
    let subject = resize_rgba(subject, placement.size)?;

    paste_with_alpha(&mut canvas, &subject, placement.x, placement.y);

    let png_bytes = encode_png(&canvas)?;
    Ok(RenderedComposite {
        png_bytes,
        canvas: canvas_size,
        placement,
    })
}

fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, String> {
    let reader = image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| format!("decode: {e}"))?;
    let dyn_img = reader.decode().map_err(|e| format!("decode: {e}"))?;
    Ok(dyn_img.into_rgba8())
}

fn resize_rgba(src: RgbaImage, dst: Size) -> CompositeResult<RgbaImage> {
    use fast_image_resize as fir;

    if src.width() == dst.width && src.height() == dst.height {
        return Ok(src);
    }

    let (src_w, src_h) = src.dimensions();
    let src_image =
        fir::images::Image::from_vec_u8(src_w, src_h, src.into_raw(), fir::PixelType::U8x4)
            .map_err(|e| CompositeError::encode(format!("resize: {e}")))?;

    let mut dst_image = fir::images::Image::new(dst.width, dst.height, fir::PixelType::U8x4);
    let mut resizer = fir::Resizer::new();
    // Premultiplied around the convolution.
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom))
        .use_alpha(true);
    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| CompositeError::encode(format!("resize: {e}")))?;

    RgbaImage::from_raw(dst.width, dst.height, dst_image.into_vec())
        .ok_or_else(|| CompositeError::encode("resize: invalid output buffer"))
}

/// Pastes `layer` at `(x, y)` using its own alpha as the blend mask.
///
/// Colour channels become `src*a + dst*(1-a)`; coverage accumulates as
/// `a + dst_a*(1-a)`, so an opaque backdrop stays opaque. Pixels outside
/// the canvas are clipped.
pub fn paste_with_alpha(canvas: &mut RgbaImage, layer: &RgbaImage, x: u32, y: u32) {
    let (canvas_w, canvas_h) = canvas.dimensions();
    for (lx, ly, src) in layer.enumerate_pixels() {
        let (cx, cy) = (x + lx, y + ly);
        if cx >= canvas_w || cy >= canvas_h {
            continue;
        }
        let alpha = u32::from(src[3]);
        match alpha {
            0 => {}
            255 => canvas.put_pixel(cx, cy, *src),
            _ => {
                let dst = canvas.get_pixel_mut(cx, cy);
                for channel in 0..3 {
                    let blended = u32::from(src[channel]) * alpha
                        + u32::from(dst[channel]) * (255 - alpha);
                    dst[channel] = ((blended + 127) / 255) as u8;
                }
                let coverage = alpha * 255 + u32::from(dst[3]) * (255 - alpha);
                dst[3] = ((coverage + 127) / 255) as u8;
            }
        }
    }
}

fn encode_png(img: &RgbaImage) -> CompositeResult<Vec<u8>> {
    use image::ImageEncoder as _;
    use image::codecs::png::{CompressionType, FilterType, PngEncoder};

    let mut buf = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut buf, CompressionType::Fast, FilterType::Adaptive);
    let (w, h) = img.dimensions();
    encoder
        .write_image(img.as_raw(), w, h, image::ExtendedColorType::Rgba8)
        .map_err(|e| CompositeError::encode(format!("encode: {e}")))?;
    Ok(buf)
}

/// Encodes any image as RGBA PNG.
pub fn to_png(img: &DynamicImage) -> CompositeResult<Vec<u8>> {
    encode_png(&img.to_rgba8())
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage, Rgba};

    use super::*;
    use crate::error::CompositeErrorKind;

    fn solid_rgba(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(pixel));
        to_png(&DynamicImage::ImageRgba8(img)).unwrap()
    }

    fn solid_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([10, 20, 30]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Jpeg)
            .unwrap();
        buf
    }

    fn decode(bytes: &[u8]) -> RgbaImage {
        image::load_from_memory(bytes).unwrap().into_rgba8()
    }

    // Resampled pixels may drift by a unit or two from fixed-point rounding.
    fn assert_close(actual: &Rgba<u8>, expected: [u8; 4]) {
        for (a, e) in actual.0.iter().zip(expected) {
            assert!(a.abs_diff(e) <= 3, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn output_keeps_backdrop_dimensions_and_centers_subject() {
        let subject = solid_rgba(400, 400, [255, 0, 0, 255]);
        let backdrop = solid_rgba(200, 100, [0, 0, 255, 255]);

        let rendered = compose_layers(&subject, &backdrop).unwrap();
        assert_eq!(rendered.placement.size, Size::new(100, 100));
        assert_eq!((rendered.placement.x, rendered.placement.y), (50, 0));

        let out = decode(&rendered.png_bytes);
        assert_eq!(out.dimensions(), (200, 100));
        assert_eq!(out.get_pixel(10, 50), &Rgba([0, 0, 255, 255]));
        assert_close(out.get_pixel(100, 50), [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(160, 50), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn small_subject_is_pasted_at_native_size() {
        let subject = solid_rgba(50, 50, [0, 255, 0, 255]);
        let backdrop = solid_rgba(200, 200, [0, 0, 0, 255]);

        let rendered = compose_layers(&subject, &backdrop).unwrap();
        assert_eq!(rendered.placement.size, Size::new(50, 50));
        assert_eq!((rendered.placement.x, rendered.placement.y), (75, 75));

        let out = decode(&rendered.png_bytes);
        assert_eq!(out.get_pixel(74, 74), &Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(75, 75), &Rgba([0, 255, 0, 255]));
        assert_eq!(out.get_pixel(124, 124), &Rgba([0, 255, 0, 255]));
        assert_eq!(out.get_pixel(125, 125), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn transparent_subject_leaves_backdrop_untouched() {
        let subject = solid_rgba(20, 20, [255, 255, 255, 0]);
        let backdrop = solid_rgba(40, 40, [12, 34, 56, 255]);

        let out = decode(&compose_layers(&subject, &backdrop).unwrap().png_bytes);
        assert!(out.pixels().all(|p| *p == Rgba([12, 34, 56, 255])));
    }

    #[test]
    fn half_alpha_blends_with_backdrop() {
        let mut canvas = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let layer = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 128]));
        paste_with_alpha(&mut canvas, &layer, 0, 0);
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn translucent_backdrop_gains_coverage_under_the_subject() {
        let mut canvas = RgbaImage::from_pixel(3, 1, Rgba([0, 0, 200, 100]));
        let mut layer = RgbaImage::new(3, 1);
        layer.put_pixel(0, 0, Rgba([200, 0, 0, 0]));
        layer.put_pixel(1, 0, Rgba([200, 0, 0, 128]));
        layer.put_pixel(2, 0, Rgba([200, 0, 0, 255]));
        paste_with_alpha(&mut canvas, &layer, 0, 0);

        assert_eq!(canvas.get_pixel(0, 0), &Rgba([0, 0, 200, 100]));
        // Coverage is a + dst_a * (1 - a), not a mask lerp of the two alphas.
        assert_eq!(canvas.get_pixel(1, 0), &Rgba([100, 0, 100, 178]));
        assert_eq!(canvas.get_pixel(2, 0), &Rgba([200, 0, 0, 255]));
    }

    #[test]
    fn layer_is_clipped_at_canvas_edge() {
        let mut canvas = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let layer = RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255]));
        paste_with_alpha(&mut canvas, &layer, 2, 2);
        assert_eq!(canvas.get_pixel(1, 1), &Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(3, 3), &Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn backdrop_without_alpha_is_accepted() {
        let subject = solid_rgba(10, 10, [255, 0, 0, 255]);
        let backdrop = solid_jpeg(32, 16);

        let rendered = compose_layers(&subject, &backdrop).unwrap();
        let out = decode(&rendered.png_bytes);
        assert_eq!(out.dimensions(), (32, 16));
        assert_eq!(out.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn undecodable_backdrop_is_a_decode_error() {
        let subject = solid_rgba(10, 10, [255, 0, 0, 255]);
        let err = compose_layers(&subject, b"definitely not an image").unwrap_err();
        assert_eq!(err.kind, CompositeErrorKind::Decode);
    }

    #[test]
    fn undecodable_segmentation_output_is_a_segmentation_error() {
        let backdrop = solid_rgba(10, 10, [0, 0, 0, 255]);
        let err = compose_layers(b"garbage", &backdrop).unwrap_err();
        assert_eq!(err.kind, CompositeErrorKind::Segmentation);
    }
}
