use image::Rgba;

use crate::canvas::{OPAQUE_BLACK, Pixel, PixelBuffer, TRANSPARENT};
use crate::ops::fill::flood_fill;

pub const MIN_BRUSH_SIZE: u32 = 1;
pub const MAX_BRUSH_SIZE: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    Pen,
    Eraser,
    Bucket,
    /// Paints into all four quadrants at once (half-sprite offsets).
    Tile,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Pen => "Pen",
            Tool::Eraser => "Eraser",
            Tool::Bucket => "Bucket",
            Tool::Tile => "Tile",
        }
    }

    /// Only the Pen honours the brush size; every other tool acts on one cell.
    pub fn uses_brush_size(&self) -> bool {
        matches!(self, Tool::Pen)
    }

    /// Edge length of the block a single stroke step touches.
    pub fn effective_size(&self, brush_size: u32) -> u32 {
        if self.uses_brush_size() { brush_size } else { 1 }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolProperties {
    pub tool: Tool,
    /// Brush edge length, 1–4.
    pub size: u32,
    pub color: Pixel,
}

impl Default for ToolProperties {
    fn default() -> Self {
        Self {
            tool: Tool::Pen,
            size: MIN_BRUSH_SIZE,
            color: OPAQUE_BLACK,
        }
    }
}

/// Inline array of up to 4 tile positions (no heap allocation).
pub struct TilePositions {
    data: [(u32, u32); 4],
    len: usize,
}

impl TilePositions {
    pub fn iter(&self) -> impl Iterator<Item = &(u32, u32)> {
        self.data[..self.len].iter()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn push(&mut self, pos: (u32, u32)) {
        self.data[self.len] = pos;
        self.len += 1;
    }
}

/// `(x, y)` plus its copies shifted by half the sprite along each axis,
/// toward the opposite half.  Copies that land outside the sprite are
/// dropped; an origin outside the sprite yields nothing.
pub fn tile_positions(x: u32, y: u32, width: u32, height: u32) -> TilePositions {
    let mut out = TilePositions { data: [(0, 0); 4], len: 0 };
    if x >= width || y >= height {
        return out;
    }
    let shift = |v: u32, extent: u32| {
        let half = extent / 2;
        let moved = if v >= half { v - half } else { v + half };
        (moved < extent && moved != v).then_some(moved)
    };
    let sx = shift(x, width);
    let sy = shift(y, height);

    out.push((x, y));
    if let Some(sx) = sx {
        out.push((sx, y));
    }
    if let Some(sy) = sy {
        out.push((x, sy));
    }
    if let (Some(sx), Some(sy)) = (sx, sy) {
        out.push((sx, sy));
    }
    out
}

/// Per-stroke state, alive between pointer-down and pointer-up.
#[derive(Clone, Copy, Debug, Default)]
struct StrokeState {
    /// Bucket target color, sampled once at pointer-down.
    color_to_replace: Option<Pixel>,
}

/// Turns pointer strokes into pixel edits on a single frame.
#[derive(Clone, Debug, Default)]
pub struct ToolEngine {
    properties: ToolProperties,
    stroke: Option<StrokeState>,
}

impl ToolEngine {
    pub fn new(properties: ToolProperties) -> Self {
        Self {
            properties,
            stroke: None,
        }
    }

    pub fn properties(&self) -> &ToolProperties {
        &self.properties
    }

    pub fn tool(&self) -> Tool {
        self.properties.tool
    }

    pub fn size(&self) -> u32 {
        self.properties.size
    }

    pub fn color(&self) -> Pixel {
        self.properties.color
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.properties.tool = tool;
    }

    /// Set the brush size, clamped to 1–4.
    pub fn set_size(&mut self, size: u32) {
        self.properties.size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
    }

    pub fn set_color(&mut self, color: Pixel) {
        self.properties.color = color;
    }

    pub fn is_stroking(&self) -> bool {
        self.stroke.is_some()
    }

    /// Pointer-down: start a stroke and paint the first point.
    /// Returns the number of pixels written.
    pub fn begin_stroke(&mut self, buffer: &mut PixelBuffer, point: (u32, u32)) -> usize {
        let (x, y) = point;
        let color_to_replace = match self.properties.tool {
            Tool::Bucket if buffer.contains(x, y) => Some(buffer.get(x, y)),
            _ => None,
        };
        self.stroke = Some(StrokeState { color_to_replace });
        self.apply_stroke(buffer, point)
    }

    /// Pointer-move while down.  Ignored when no stroke is active.
    pub fn continue_stroke(&mut self, buffer: &mut PixelBuffer, point: (u32, u32)) -> usize {
        if self.stroke.is_none() {
            return 0;
        }
        self.apply_stroke(buffer, point)
    }

    /// Pointer-up: paint the release point, then end the stroke.
    pub fn end_stroke(&mut self, buffer: &mut PixelBuffer, point: (u32, u32)) -> usize {
        if self.stroke.is_none() {
            return 0;
        }
        let written = self.apply_stroke(buffer, point);
        self.stroke = None;
        written
    }

    /// Drop the active stroke without painting (frame switched underneath).
    pub fn cancel_stroke(&mut self) {
        self.stroke = None;
    }

    /// Apply the current tool at one mapped pixel position.
    ///
    /// `point` is already clamped to `>= 0`; anything past the sprite edge is
    /// clipped here.  Returns the number of pixels written.
    pub fn apply_stroke(&mut self, buffer: &mut PixelBuffer, point: (u32, u32)) -> usize {
        let props = &self.properties;
        let size = props.tool.effective_size(props.size);
        match props.tool {
            Tool::Pen => paint_block(buffer, point, size, props.color),
            Tool::Eraser => paint_block(buffer, point, size, TRANSPARENT),
            Tool::Tile => paint_tiled(buffer, point, size, props.color),
            Tool::Bucket => {
                let target = self.stroke.and_then(|s| s.color_to_replace);
                match target {
                    Some(target) => flood_fill(buffer, point, target, props.color),
                    None => 0,
                }
            }
        }
    }
}

/// Visit every cell of the `size × size` block at `origin`, clipped to the
/// buffer.
fn for_each_in_block(buffer: &PixelBuffer, origin: (u32, u32), size: u32, mut f: impl FnMut(u32, u32)) {
    let (x0, y0) = origin;
    let x_end = x0.saturating_add(size).min(buffer.width());
    let y_end = y0.saturating_add(size).min(buffer.height());
    for x in x0..x_end {
        for y in y0..y_end {
            f(x, y);
        }
    }
}

fn paint_block(buffer: &mut PixelBuffer, origin: (u32, u32), size: u32, color: Pixel) -> usize {
    let mut cells = Vec::with_capacity((size * size) as usize);
    for_each_in_block(buffer, origin, size, |x, y| cells.push((x, y)));
    for &(x, y) in &cells {
        buffer.set(x, y, color);
    }
    cells.len()
}

fn paint_tiled(buffer: &mut PixelBuffer, origin: (u32, u32), size: u32, color: Pixel) -> usize {
    let (w, h) = (buffer.width(), buffer.height());
    let mut cells = Vec::with_capacity((size * size * 4) as usize);
    for_each_in_block(buffer, origin, size, |x, y| {
        cells.extend(tile_positions(x, y, w, h).iter().copied());
    });
    for &(x, y) in &cells {
        buffer.set(x, y, color);
    }
    cells.len()
}

/// Parse an `r,g,b[,a]` color string (alpha defaults to 255).
pub fn parse_color(s: &str) -> Option<Pixel> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let r = parts[0].parse::<u8>().ok()?;
    let g = parts[1].parse::<u8>().ok()?;
    let b = parts[2].parse::<u8>().ok()?;
    let a = match parts.get(3) {
        Some(a) => a.parse::<u8>().ok()?,
        None => 255,
    };
    Some(Rgba([r, g, b, a]))
}

/// Format a color as `r,g,b,a`.
pub fn color_to_str(c: Pixel) -> String {
    format!("{},{},{},{}", c[0], c[1], c[2], c[3])
}
