use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use pixfan_core::dimensions::fit_inside;

/// Select the resampling filter from the downscale ratio.
///
/// Large reductions use a cheaper filter; the output quality difference is
/// not visible at those ratios.
pub fn select_filter(orig_width: u32, orig_height: u32, new_width: u32, new_height: u32) -> FilterType {
    let width_ratio = orig_width as f32 / new_width.max(1) as f32;
    let height_ratio = orig_height as f32 / new_height.max(1) as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        FilterType::Triangle
    } else if max_ratio > 1.5 {
        FilterType::CatmullRom
    } else {
        FilterType::Lanczos3
    }
}

/// Resize `img` to fit inside `box_width x box_height`, keeping the aspect
/// ratio. Never crops and never enlarges: a source that already fits is
/// returned at its own size. Shrinking in either dimension resizes, so the
/// result never exceeds the box.
pub fn resize_to_fit(img: &DynamicImage, box_width: u32, box_height: u32) -> DynamicImage {
    let (orig_width, orig_height) = img.dimensions();
    let (width, height) = fit_inside(orig_width, orig_height, box_width, box_height);

    if width >= orig_width && height >= orig_height {
        return img.clone();
    }
    let (width, height) = (width.min(orig_width), height.min(orig_height));

    let filter = select_filter(orig_width, orig_height, width, height);
    tracing::trace!(
        from_width = orig_width,
        from_height = orig_height,
        width,
        height,
        ?filter,
        "Resizing image"
    );
    img.resize_exact(width, height, filter)
}
