use image::{Rgba, RgbaImage};

/// One RGBA8 pixel.  Alpha 0 is a real (erased) value, not "no data".
pub type Pixel = Rgba<u8>;

pub const TRANSPARENT: Pixel = Rgba([0, 0, 0, 0]);
pub const OPAQUE_BLACK: Pixel = Rgba([0, 0, 0, 255]);

/// Smallest / largest supported sprite edge, in pixels.
pub const MIN_SPRITE_SIZE: u32 = 2;
pub const MAX_SPRITE_SIZE: u32 = 128;

/// Logical edge length of the square drawing viewport, in view units.
pub const VIEWPORT_SIZE: u32 = 512;

const CHECKER_DARK: Pixel = Rgba([192, 192, 192, 255]);
const CHECKER_LIGHT: Pixel = Rgba([224, 224, 224, 255]);

/// Clamp a requested sprite edge into the supported range.
pub fn clamp_sprite_size(size: u32) -> u32 {
    size.clamp(MIN_SPRITE_SIZE, MAX_SPRITE_SIZE)
}

// ============================================================================
// PIXEL BUFFER: one frame's image data
// ============================================================================

/// Fixed-size RGBA grid, row-major, backed by an [`RgbaImage`].
///
/// Coordinates are trusted: callers clip to `[0, width) × [0, height)` before
/// calling [`get`](Self::get) / [`set`](Self::set).  Out-of-range access is a
/// bug in the caller and panics inside the image buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    /// Create a fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, TRANSPARENT),
        }
    }

    pub fn new_filled(width: u32, height: u32, color: Pixel) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, color),
        }
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.image.width() && y < self.image.height()
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Pixel {
        *self.image.get_pixel(x, y)
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, pixel: Pixel) {
        self.image.put_pixel(x, y, pixel);
    }

    pub fn fill(&mut self, pixel: Pixel) {
        for px in self.image.pixels_mut() {
            *px = pixel;
        }
    }

    /// Reset every pixel to fully transparent.
    pub fn clear(&mut self) {
        self.fill(TRANSPARENT);
    }

    /// Number of pixels with non-zero alpha.
    pub fn painted_count(&self) -> usize {
        self.image.pixels().filter(|p| p[3] != 0).count()
    }

    pub fn as_rgba_image(&self) -> &RgbaImage {
        &self.image
    }

}

/// Gray "no pixel" checkerboard drawn behind the sprite.
/// Regenerated whenever the sprite size changes.
pub fn checkerboard(size: u32) -> PixelBuffer {
    let image = RgbaImage::from_fn(size, size, |x, y| {
        if x % 2 == y % 2 { CHECKER_DARK } else { CHECKER_LIGHT }
    });
    PixelBuffer::from_rgba_image(image)
}

// ============================================================================
// CANVAS VIEW: zoom + view-space → pixel-space mapping
// ============================================================================

/// Zoom state of the 512×512 drawing viewport for a square sprite.
///
/// `image_scale` is fixed when the sprite size is set (`512 / size`,
/// truncating); `zoom_scale` moves in factors of two inside
/// `[1, image_scale]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanvasView {
    sprite_size: u32,
    image_scale: u32,
    zoom_scale: u32,
}

impl CanvasView {
    pub fn new(sprite_size: u32) -> Self {
        let sprite_size = sprite_size.max(1);
        let image_scale = (VIEWPORT_SIZE / sprite_size).max(1);
        Self {
            sprite_size,
            image_scale,
            zoom_scale: image_scale,
        }
    }

    pub fn sprite_size(&self) -> u32 {
        self.sprite_size
    }

    pub fn image_scale(&self) -> u32 {
        self.image_scale
    }

    pub fn zoom_scale(&self) -> u32 {
        self.zoom_scale
    }

    /// Double the zoom unless that would pass `image_scale`.
    /// Returns `true` when the zoom changed.
    pub fn zoom_in(&mut self) -> bool {
        let next = self.zoom_scale * 2;
        if next > self.image_scale {
            return false;
        }
        self.zoom_scale = next;
        true
    }

    /// Halve the zoom unless that would drop below 1.
    pub fn zoom_out(&mut self) -> bool {
        let next = self.zoom_scale / 2;
        if next < 1 {
            return false;
        }
        self.zoom_scale = next;
        true
    }

    /// Top-left corner of the centered sprite inside the viewport.
    pub fn origin(&self) -> (i32, i32) {
        let scaled = (self.sprite_size * self.zoom_scale) as i32;
        let offset = (VIEWPORT_SIZE as i32 - scaled) / 2;
        (offset, offset)
    }

    /// Map a view-space pointer position to a pixel coordinate.
    ///
    /// Both axes are clamped to `>= 0`; there is no upper clamp, so the result
    /// may lie past the sprite edge and each tool clips it.
    pub fn view_to_pixel(&self, view_x: i32, view_y: i32) -> (u32, u32) {
        let (ox, oy) = self.origin();
        let zoom = self.zoom_scale as i32;
        let px = view_x.saturating_sub(ox) / zoom;
        let py = view_y.saturating_sub(oy) / zoom;
        (px.max(0) as u32, py.max(0) as u32)
    }

    /// Render what the drawing viewport shows: the frame over the
    /// checkerboard, scaled by `zoom_scale` (nearest neighbour) and centered.
    /// Outside the sprite the viewport stays transparent.
    pub fn compose(&self, frame: &PixelBuffer, background: &PixelBuffer) -> RgbaImage {
        let (ox, oy) = self.origin();
        let zoom = self.zoom_scale as i32;
        let edge = (self.sprite_size * self.zoom_scale) as i32;
        RgbaImage::from_fn(VIEWPORT_SIZE, VIEWPORT_SIZE, |vx, vy| {
            let (lx, ly) = (vx as i32 - ox, vy as i32 - oy);
            if lx < 0 || ly < 0 || lx >= edge || ly >= edge {
                return TRANSPARENT;
            }
            let (x, y) = ((lx / zoom) as u32, (ly / zoom) as u32);
            blend_over(frame.get(x, y), background.get(x, y))
        })
    }
}

/// Source-over blend of `top` onto an opaque `bottom`.
fn blend_over(top: Pixel, bottom: Pixel) -> Pixel {
    match top[3] {
        255 => top,
        0 => bottom,
        a => {
            let a = a as u32;
            let mix = |t: u8, b: u8| ((t as u32 * a + b as u32 * (255 - a) + 127) / 255) as u8;
            Rgba([
                mix(top[0], bottom[0]),
                mix(top[1], bottom[1]),
                mix(top[2], bottom[2]),
                255,
            ])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Pixel = Rgba([255, 0, 0, 255]);

    #[test]
    fn new_buffer_is_transparent() {
        let buf = PixelBuffer::new(4, 4);
        assert_eq!(buf.width(), 4);
        assert_eq!(buf.as_rgba_image().as_raw().len(), 4 * 4 * 4);
        assert!(buf.as_rgba_image().pixels().all(|p| *p == TRANSPARENT));
        assert_eq!(buf.painted_count(), 0);
    }

    #[test]
    fn set_then_get_returns_same_pixel() {
        let mut buf = PixelBuffer::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                let p = Rgba([x as u8 * 30, y as u8 * 30, (x + y) as u8, (x * y) as u8]);
                buf.set(x, y, p);
                assert_eq!(buf.get(x, y), p);
            }
        }
    }

    #[test]
    fn fill_and_clear() {
        let mut buf = PixelBuffer::new(3, 3);
        buf.fill(RED);
        assert_eq!(buf.painted_count(), 9);
        let copy = buf.clone();
        buf.clear();
        assert_eq!(buf.painted_count(), 0);
        assert_eq!(copy.get(2, 2), RED);
    }

    #[test]
    fn contains_checks_both_axes() {
        let buf = PixelBuffer::new(2, 2);
        assert!(buf.contains(1, 1));
        assert!(!buf.contains(2, 0));
        assert!(!buf.contains(0, 2));
    }

    #[test]
    fn checkerboard_alternates() {
        let bg = checkerboard(4);
        assert_eq!(bg.get(0, 0), CHECKER_DARK);
        assert_eq!(bg.get(1, 0), CHECKER_LIGHT);
        assert_eq!(bg.get(0, 1), CHECKER_LIGHT);
        assert_eq!(bg.get(3, 3), CHECKER_DARK);
    }

    #[test]
    fn sprite_size_is_clamped() {
        assert_eq!(clamp_sprite_size(0), 2);
        assert_eq!(clamp_sprite_size(64), 64);
        assert_eq!(clamp_sprite_size(500), 128);
    }

    #[test]
    fn image_scale_truncates() {
        assert_eq!(CanvasView::new(16).image_scale(), 32);
        assert_eq!(CanvasView::new(3).image_scale(), 170);
        assert_eq!(CanvasView::new(128).image_scale(), 4);
    }

    #[test]
    fn zoom_stays_within_bounds() {
        let mut view = CanvasView::new(3);
        assert_eq!(view.zoom_scale(), view.image_scale());
        for _ in 0..10 {
            view.zoom_in();
            assert!(view.zoom_scale() <= view.image_scale());
        }
        for _ in 0..20 {
            view.zoom_out();
            assert!(view.zoom_scale() >= 1);
        }
        assert_eq!(view.zoom_scale(), 1);
        assert!(!view.zoom_out());
        for _ in 0..20 {
            view.zoom_in();
        }
        assert_eq!(view.zoom_scale(), 128);
    }

    #[test]
    fn zoom_in_at_full_scale_is_refused() {
        let mut view = CanvasView::new(16);
        assert!(!view.zoom_in());
        assert!(view.zoom_out());
        assert_eq!(view.zoom_scale(), 16);
        assert!(view.zoom_in());
        assert_eq!(view.zoom_scale(), 32);
    }

    #[test]
    fn maps_view_points_at_full_zoom() {
        let view = CanvasView::new(16);
        assert_eq!(view.origin(), (0, 0));
        assert_eq!(view.view_to_pixel(40, 70), (1, 2));
        assert_eq!(view.view_to_pixel(511, 0), (15, 0));
    }

    #[test]
    fn maps_view_points_with_centering() {
        let mut view = CanvasView::new(16);
        view.zoom_out();
        assert_eq!(view.origin(), (128, 128));
        assert_eq!(view.view_to_pixel(128 + 17, 128 + 33), (1, 2));
        // Left of / above the sprite clamps to zero.
        assert_eq!(view.view_to_pixel(100, 3), (0, 0));
        // Past the far edge is left for the tools to clip.
        assert_eq!(view.view_to_pixel(511, 511), (23, 23));
    }

    #[test]
    fn extreme_pointer_positions_do_not_overflow() {
        let mut view = CanvasView::new(16);
        view.zoom_out();
        assert_eq!(view.view_to_pixel(i32::MIN, i32::MIN), (0, 0));
        assert_eq!(view.view_to_pixel(i32::MAX, 0), (134_217_719, 0));
        assert_eq!(view.view_to_pixel(0, i32::MAX), (0, 134_217_719));
    }

    #[test]
    fn compose_scales_and_centers() {
        let mut frame = PixelBuffer::new(2, 2);
        frame.set(0, 0, RED);
        let bg = checkerboard(2);

        let mut view = CanvasView::new(2);
        let full = view.compose(&frame, &bg);
        assert_eq!(full.dimensions(), (512, 512));
        assert_eq!(*full.get_pixel(0, 0), RED);
        assert_eq!(*full.get_pixel(255, 255), RED);
        assert_eq!(*full.get_pixel(256, 0), CHECKER_LIGHT);
        assert_eq!(*full.get_pixel(511, 511), CHECKER_DARK);

        view.zoom_out();
        let half = view.compose(&frame, &bg);
        assert_eq!(*half.get_pixel(0, 0), TRANSPARENT);
        assert_eq!(*half.get_pixel(128, 128), RED);
        assert_eq!(*half.get_pixel(383, 383), CHECKER_DARK);
        assert_eq!(*half.get_pixel(384, 384), TRANSPARENT);
    }

    #[test]
    fn compose_blends_translucent_pixels() {
        let mut frame = PixelBuffer::new(2, 2);
        frame.set(1, 1, Rgba([0, 0, 0, 128]));
        let view = CanvasView::new(2);
        let out = view.compose(&frame, &checkerboard(2));
        // 192 * 127 / 255 rounds to 96
        assert_eq!(*out.get_pixel(300, 300), Rgba([96, 96, 96, 255]));
    }
}
