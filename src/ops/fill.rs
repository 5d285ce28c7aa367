// ============================================================================
// FLOOD FILL: 4-connected exact-color region fill
// ============================================================================

use crate::canvas::{Pixel, PixelBuffer};

/// Recolor the 4-connected region of `target` reachable from `seed`.
///
/// Returns the number of pixels changed.  Does nothing when `target` equals
/// `replacement`, when the seed lies outside the buffer, or when the seed
/// pixel is not exactly `target`.
///
/// Uses an explicit DFS stack of packed flat indices, so memory is bounded by
/// the pixel count and a 128×128 sprite can never overflow the call stack.
/// Each pixel is recolored before it is pushed, which doubles as the visited
/// mark: a recolored pixel no longer matches `target`.
pub fn flood_fill(
    buffer: &mut PixelBuffer,
    seed: (u32, u32),
    target: Pixel,
    replacement: Pixel,
) -> usize {
    let (seed_x, seed_y) = seed;
    if target == replacement || !buffer.contains(seed_x, seed_y) {
        return 0;
    }
    if buffer.get(seed_x, seed_y) != target {
        return 0;
    }

    let width = buffer.width();
    let height = buffer.height();

    let mut stack: Vec<u32> = Vec::with_capacity(256);
    buffer.set(seed_x, seed_y, replacement);
    stack.push(seed_y * width + seed_x);
    let mut filled = 1;

    while let Some(idx) = stack.pop() {
        let x = idx % width;
        let y = idx / width;

        let mut visit = |nx: u32, ny: u32| {
            if buffer.get(nx, ny) == target {
                buffer.set(nx, ny, replacement);
                stack.push(ny * width + nx);
                filled += 1;
            }
        };

        if x > 0 {
            visit(x - 1, y);
        }
        if x + 1 < width {
            visit(x + 1, y);
        }
        if y > 0 {
            visit(x, y - 1);
        }
        if y + 1 < height {
            visit(x, y + 1);
        }
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::TRANSPARENT;
    use image::Rgba;

    const BLUE: Pixel = Rgba([0, 0, 255, 255]);
    const WALL: Pixel = Rgba([10, 10, 10, 255]);

    #[test]
    fn fills_whole_transparent_sprite() {
        let mut buf = PixelBuffer::new(16, 16);
        let changed = flood_fill(&mut buf, (7, 3), TRANSPARENT, BLUE);
        assert_eq!(changed, 256);
        assert!(buf.as_rgba_image().pixels().all(|p| *p == BLUE));
    }

    #[test]
    fn fills_largest_sprite_without_overflow() {
        let mut buf = PixelBuffer::new(128, 128);
        assert_eq!(flood_fill(&mut buf, (0, 0), TRANSPARENT, BLUE), 128 * 128);
    }

    #[test]
    fn same_target_and_replacement_is_a_no_op() {
        let mut buf = PixelBuffer::new_filled(4, 4, BLUE);
        assert_eq!(flood_fill(&mut buf, (1, 1), BLUE, BLUE), 0);
        assert_eq!(buf, PixelBuffer::new_filled(4, 4, BLUE));
    }

    #[test]
    fn refill_with_same_color_is_idempotent() {
        let mut buf = PixelBuffer::new(4, 4);
        flood_fill(&mut buf, (0, 0), TRANSPARENT, BLUE);
        let snapshot = buf.clone();
        // The seed is no longer the old target, so nothing changes.
        assert_eq!(flood_fill(&mut buf, (0, 0), TRANSPARENT, BLUE), 0);
        assert_eq!(buf, snapshot);
    }

    #[test]
    fn out_of_bounds_seed_is_ignored() {
        let mut buf = PixelBuffer::new(4, 4);
        assert_eq!(flood_fill(&mut buf, (4, 0), TRANSPARENT, BLUE), 0);
        assert_eq!(flood_fill(&mut buf, (0, 9), TRANSPARENT, BLUE), 0);
        assert_eq!(buf.painted_count(), 0);
    }

    #[test]
    fn seed_not_matching_target_is_ignored() {
        let mut buf = PixelBuffer::new(4, 4);
        buf.set(2, 2, WALL);
        assert_eq!(flood_fill(&mut buf, (2, 2), TRANSPARENT, BLUE), 0);
        assert_eq!(buf.painted_count(), 1);
    }

    #[test]
    fn stops_at_walls() {
        // 5×5 split by a full-height wall at x = 2.
        let mut buf = PixelBuffer::new(5, 5);
        for y in 0..5 {
            buf.set(2, y, WALL);
        }
        let changed = flood_fill(&mut buf, (0, 0), TRANSPARENT, BLUE);
        assert_eq!(changed, 10);
        for y in 0..5 {
            for x in 0..5 {
                let expected = match x {
                    0 | 1 => BLUE,
                    2 => WALL,
                    _ => TRANSPARENT,
                };
                assert_eq!(buf.get(x, y), expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn diagonal_neighbours_are_not_connected() {
        let mut buf = PixelBuffer::new_filled(3, 3, WALL);
        buf.set(0, 0, TRANSPARENT);
        buf.set(1, 1, TRANSPARENT);
        assert_eq!(flood_fill(&mut buf, (0, 0), TRANSPARENT, BLUE), 1);
        assert_eq!(buf.get(1, 1), TRANSPARENT);
    }

    #[test]
    fn exact_color_match_only() {
        let mut buf = PixelBuffer::new(3, 1);
        buf.set(1, 0, Rgba([0, 0, 0, 1]));
        assert_eq!(flood_fill(&mut buf, (0, 0), TRANSPARENT, BLUE), 1);
        assert_eq!(buf.get(2, 0), TRANSPARENT);
    }
}
