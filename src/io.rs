use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbaImage};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::canvas::{MAX_SPRITE_SIZE, MIN_SPRITE_SIZE, OPAQUE_BLACK, Pixel, PixelBuffer};
use crate::frames::FrameSequence;

/// File extension of sprite projects.
pub const SSP_EXTENSION: &str = "ssp";

/// Shortest GIF frame delay, in centiseconds.  Most viewers clamp anything
/// faster than this.
const MIN_GIF_DELAY_CS: u16 = 2;

// ============================================================================
// SSP PROJECT FILE FORMAT
// ============================================================================
//
// JSON document:
//   { "width": W, "height": H, "numOfFrames": N,
//     "frames": [ frame0, ... ] }
// where every frame is H rows of W `{"r","g","b","a"}` objects, top to
// bottom, left to right.  `a` is omitted when it is 255.

/// Error type for `.ssp` file operations
#[derive(Debug)]
pub enum SspError {
    Io(std::io::Error),
    Json(serde_json::Error),
    InvalidFormat(String),
}

impl std::fmt::Display for SspError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SspError::Io(e) => write!(f, "I/O error: {}", e),
            SspError::Json(e) => write!(f, "JSON error: {}", e),
            SspError::InvalidFormat(e) => write!(f, "Invalid format: {}", e),
        }
    }
}

impl std::error::Error for SspError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SspError::Io(e) => Some(e),
            SspError::Json(e) => Some(e),
            SspError::InvalidFormat(_) => None,
        }
    }
}

impl From<std::io::Error> for SspError {
    fn from(e: std::io::Error) -> Self {
        SspError::Io(e)
    }
}

impl From<serde_json::Error> for SspError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            SspError::Io(e.into())
        } else {
            SspError::Json(e)
        }
    }
}

#[derive(Serialize)]
struct SspPixel {
    r: u8,
    g: u8,
    b: u8,
    #[serde(skip_serializing_if = "is_opaque")]
    a: u8,
}

fn is_opaque(a: &u8) -> bool {
    *a == 255
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SspDocument {
    width: u32,
    height: u32,
    num_of_frames: usize,
    frames: Vec<Vec<Vec<SspPixel>>>,
}

fn build_ssp(frames: &FrameSequence) -> SspDocument {
    let size = frames.sprite_size();
    let encoded = frames
        .frames()
        .iter()
        .map(|frame| {
            (0..size)
                .map(|y| {
                    (0..size)
                        .map(|x| {
                            let p = frame.get(x, y);
                            SspPixel { r: p[0], g: p[1], b: p[2], a: p[3] }
                        })
                        .collect()
                })
                .collect()
        })
        .collect();

    SspDocument {
        width: size,
        height: size,
        num_of_frames: frames.frame_count(),
        frames: encoded,
    }
}

/// Serialize every frame to `writer` as a pretty-printed `.ssp` document.
pub fn write_ssp<W: Write>(frames: &FrameSequence, writer: W) -> Result<(), SspError> {
    serde_json::to_writer_pretty(writer, &build_ssp(frames))?;
    Ok(())
}

/// Save a frame sequence as a `.ssp` project file.
pub fn save_ssp(frames: &FrameSequence, path: &Path) -> Result<(), SspError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_ssp(frames, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Load a `.ssp` project file.  The returned sequence has its cursor on
/// the last frame.
pub fn load_ssp(path: &Path) -> Result<FrameSequence, SspError> {
    let file = File::open(path)?;
    read_ssp(BufReader::new(file))
}

/// Read and decode a `.ssp` document from any byte stream.
pub fn read_ssp<R: Read>(mut reader: R) -> Result<FrameSequence, SspError> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    let doc: Value = serde_json::from_slice(&raw)
        .map_err(|e| SspError::InvalidFormat(format!("not a JSON document: {}", e)))?;
    decode_ssp(&doc)
}

/// Decode a parsed `.ssp` document.
///
/// Only the dimensions are strict: they must be present, integral, inside
/// the supported sprite range, and square.  Everything below them degrades
/// instead of failing: missing or garbled color channels read as 0, a
/// missing alpha as 255, a pixel that is not an object as opaque black,
/// short rows and frames stay transparent, and surplus rows or columns are
/// ignored.
pub fn decode_ssp(doc: &Value) -> Result<FrameSequence, SspError> {
    let root = doc
        .as_object()
        .ok_or_else(|| SspError::InvalidFormat("top level is not an object".into()))?;

    let width = dimension(root, "width")?;
    let height = dimension(root, "height")?;
    if width != height {
        return Err(SspError::InvalidFormat(format!(
            "sprite must be square, got {}×{}",
            width, height
        )));
    }
    let size = width;

    let frame_values: &[Value] = match field(root, &["frames", "m_frames"]) {
        Some(Value::Array(list)) => list.as_slice(),
        Some(_) => {
            crate::log_warn!("ssp: frame list is not an array, starting with a blank frame");
            &[]
        }
        None => {
            crate::log_warn!("ssp: no frame list, starting with a blank frame");
            &[]
        }
    };

    if let Some(declared) = field(root, &["numOfFrames", "numOfm_frames"]).and_then(as_integer)
        && declared != frame_values.len() as i64
    {
        crate::log_warn!(
            "ssp: header declares {} frames but {} are present; using the frame list",
            declared,
            frame_values.len()
        );
    }

    let frames: Vec<PixelBuffer> = frame_values
        .iter()
        .enumerate()
        .map(|(i, value)| decode_frame(i, value, size))
        .collect();

    Ok(FrameSequence::from_frames(size, frames, usize::MAX))
}

/// First present key among `keys` (current name first, then legacy aliases).
fn field<'a>(root: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| root.get(*k))
}

fn dimension(root: &Map<String, Value>, key: &str) -> Result<u32, SspError> {
    let value = root
        .get(key)
        .ok_or_else(|| SspError::InvalidFormat(format!("missing \"{}\"", key)))?;
    let n = as_integer(value)
        .ok_or_else(|| SspError::InvalidFormat(format!("\"{}\" is not an integer: {}", key, value)))?;
    if n < MIN_SPRITE_SIZE as i64 || n > MAX_SPRITE_SIZE as i64 {
        return Err(SspError::InvalidFormat(format!(
            "\"{}\" = {} is outside {}..={}",
            key, n, MIN_SPRITE_SIZE, MAX_SPRITE_SIZE
        )));
    }
    Ok(n as u32)
}

/// Integer value of a JSON number, accepting integral floats like `12.0`.
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    if let Some(n) = value.as_u64() {
        return Some(n.min(i64::MAX as u64) as i64);
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && f.is_finite()).then(|| f.clamp(i64::MIN as f64, i64::MAX as f64) as i64)
}

fn decode_frame(index: usize, value: &Value, size: u32) -> PixelBuffer {
    let mut frame = PixelBuffer::new(size, size);
    let Some(rows) = value.as_array() else {
        crate::log_warn!("ssp: frame {} is not an array, left transparent", index + 1);
        return frame;
    };
    if rows.len() != size as usize {
        crate::log_warn!(
            "ssp: frame {} has {} rows, expected {}",
            index + 1,
            rows.len(),
            size
        );
    }
    for (y, row) in rows.iter().take(size as usize).enumerate() {
        let Some(cells) = row.as_array() else {
            continue;
        };
        for (x, cell) in cells.iter().take(size as usize).enumerate() {
            frame.set(x as u32, y as u32, decode_pixel(cell));
        }
    }
    frame
}

fn decode_pixel(value: &Value) -> Pixel {
    let Some(obj) = value.as_object() else {
        return OPAQUE_BLACK;
    };
    let channel = |key: &str, missing: u8| match obj.get(key) {
        None => missing,
        Some(v) => as_integer(v).map(|n| n.clamp(0, 255) as u8).unwrap_or(0),
    };
    image::Rgba([
        channel("r", 0),
        channel("g", 0),
        channel("b", 0),
        channel("a", 255),
    ])
}

// ============================================================================
// IMAGE EXPORT
// ============================================================================

/// Write a single frame as an RGBA PNG at its native size.
pub fn export_frame_png(frame: &PixelBuffer, path: &Path) -> Result<(), String> {
    let file = File::create(path).map_err(|e| format!("Failed to create PNG file: {}", e))?;
    let mut writer = BufWriter::new(file);
    let image = frame.as_rgba_image();
    PngEncoder::new(&mut writer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e| format!("PNG encode error: {}", e))?;
    writer
        .flush()
        .map_err(|e| format!("PNG write error: {}", e))
}

/// Lay every frame out left to right in a single image.
pub fn build_sprite_sheet(frames: &[PixelBuffer]) -> RgbaImage {
    let (w, h) = frames
        .first()
        .map(|f| (f.width(), f.height()))
        .unwrap_or((0, 0));
    let mut sheet = RgbaImage::new(w * frames.len() as u32, h);
    for (i, frame) in frames.iter().enumerate() {
        image::imageops::replace(&mut sheet, frame.as_rgba_image(), (i as u32 * w) as i64, 0);
    }
    sheet
}

/// Export all frames as a horizontal sprite-sheet PNG.
pub fn export_sprite_sheet(frames: &[PixelBuffer], path: &Path) -> Result<(), String> {
    if frames.is_empty() {
        return Err("No frames to export".to_string());
    }
    let sheet = PixelBuffer::from_rgba_image(build_sprite_sheet(frames));
    export_frame_png(&sheet, path)
}

// ============================================================================
// ANIMATION ENCODING
// ============================================================================

/// Encode frames as an endlessly looping animated GIF.
///
/// Each frame gets its own palette of up to `max_colors` entries
/// (2–256).  Pixels with alpha below 128 map to a reserved transparent
/// index.
pub fn encode_animated_gif(
    frames: &[RgbaImage],
    fps: u32,
    max_colors: u16,
    path: &Path,
) -> Result<(), String> {
    if frames.is_empty() {
        return Err("No frames to encode".to_string());
    }
    if frames[0].width() > u16::MAX as u32 || frames[0].height() > u16::MAX as u32 {
        return Err("Image dimensions exceed GIF maximum (65535×65535)".to_string());
    }
    let (w, h) = (frames[0].width() as u16, frames[0].height() as u16);
    let delay_cs = ((100 + fps.max(1) / 2) / fps.max(1)).max(MIN_GIF_DELAY_CS as u32) as u16;
    let colors = (max_colors as usize).clamp(2, 256);

    // Quantizing is the slow part; do all frames up front.
    let quantized: Vec<QuantizedFrame> = frames
        .par_iter()
        .map(|frame| quantize_rgba(frame, colors))
        .collect();

    let file = File::create(path).map_err(|e| format!("Failed to create GIF file: {}", e))?;
    let mut encoder = gif::Encoder::new(BufWriter::new(file), w, h, &[])
        .map_err(|e| format!("GIF encoder init error: {}", e))?;
    encoder
        .set_repeat(gif::Repeat::Infinite)
        .map_err(|e| format!("GIF set repeat error: {}", e))?;

    for q in quantized {
        let frame = gif::Frame {
            width: w,
            height: h,
            delay: delay_cs,
            dispose: gif::DisposalMethod::Background,
            transparent: q.transparent,
            palette: Some(q.palette),
            buffer: std::borrow::Cow::Owned(q.indices),
            ..Default::default()
        };
        encoder
            .write_frame(&frame)
            .map_err(|e| format!("GIF frame write error: {}", e))?;
    }

    Ok(())
}

/// Encode frames as an endlessly looping animated PNG (APNG).
pub fn encode_animated_png(frames: &[RgbaImage], fps: u32, path: &Path) -> Result<(), String> {
    if frames.is_empty() {
        return Err("No frames to encode".to_string());
    }

    let width = frames[0].width();
    let height = frames[0].height();
    let delay_ms = (1000 / fps.max(1)).clamp(1, u16::MAX as u32) as u16;

    let file = File::create(path).map_err(|e| format!("Failed to create APNG file: {}", e))?;
    let writer = BufWriter::new(file);

    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder
        .set_animated(frames.len() as u32, 0) // 0 = infinite loop
        .map_err(|e| format!("APNG set_animated error: {}", e))?;

    let mut writer = encoder
        .write_header()
        .map_err(|e| format!("APNG header write error: {}", e))?;

    for frame_img in frames {
        writer
            .set_frame_delay(delay_ms, 1000)
            .map_err(|e| format!("APNG set frame delay error: {}", e))?;
        writer
            .set_dispose_op(png::DisposeOp::Background)
            .map_err(|e| format!("APNG set dispose op error: {}", e))?;
        writer
            .write_image_data(frame_img.as_raw())
            .map_err(|e| format!("APNG frame write error: {}", e))?;
    }

    writer
        .finish()
        .map_err(|e| format!("APNG finish error: {}", e))?;

    Ok(())
}

struct QuantizedFrame {
    /// Flat `[R,G,B, R,G,B, …]` as the gif crate expects.
    palette: Vec<u8>,
    indices: Vec<u8>,
    transparent: Option<u8>,
}

/// Quantize an RGBA image to at most `max_colors` palette entries.
///
/// When the image has see-through pixels the last entry is reserved for
/// them and only the visible pixels train the quantizer.
fn quantize_rgba(image: &RgbaImage, max_colors: usize) -> QuantizedFrame {
    let is_visible = |p: &image::Rgba<u8>| p[3] >= 128;
    let has_transparency = image.pixels().any(|p| !is_visible(p));
    let quant_colors = if has_transparency { max_colors - 1 } else { max_colors };

    let mut samples: Vec<u8> = image
        .pixels()
        .filter(|p| is_visible(p))
        .flat_map(|p| [p[0], p[1], p[2], 255])
        .collect();
    if samples.is_empty() {
        samples.extend_from_slice(&[0, 0, 0, 255]);
    }

    let nq = color_quant::NeuQuant::new(10, quant_colors, &samples);

    let mut palette = Vec::with_capacity(max_colors * 3);
    for i in 0..quant_colors {
        match nq.lookup(i) {
            Some(c) => palette.extend_from_slice(&[c[0], c[1], c[2]]),
            None => palette.extend_from_slice(&[0, 0, 0]),
        }
    }
    let transparent = if has_transparency {
        palette.extend_from_slice(&[0, 0, 0]);
        Some(quant_colors as u8)
    } else {
        None
    };

    let indices = image
        .pixels()
        .map(|p| match transparent {
            Some(t) if !is_visible(p) => t,
            _ => nq.index_of(&[p[0], p[1], p[2], 255]) as u8,
        })
        .collect();

    QuantizedFrame {
        palette,
        indices,
        transparent,
    }
}
