use image::RgbaImage;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

use crate::canvas::{CanvasView, Pixel, PixelBuffer, checkerboard, clamp_sprite_size};
use crate::components::preview::{FrameRate, PlaybackScheduler};
use crate::components::tools::{MIN_BRUSH_SIZE, Tool, ToolEngine, ToolProperties};
use crate::frames::{FrameSequence, NavState};
use crate::io::{self, SspError};
use crate::settings::AppSettings;

/// Single open sprite document.
///
/// Everything a front end needs goes through here: pointer events in view
/// coordinates, tool and frame controls, playback, save and load.  Playback
/// is paused and any stroke in flight is dropped before a structural edit
/// commits.
pub struct Project {
    pub id: Uuid,
    frames: FrameSequence,
    tools: ToolEngine,
    view: CanvasView,
    /// Checkerboard shown behind transparent pixels; sized with the sprite.
    background: PixelBuffer,
    playback: PlaybackScheduler,
    /// Color restored on resize.
    default_color: Pixel,
    /// `None` for unsaved/untitled files.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,

    /// Display name (derived from path or "Untitled-X")
    pub name: String,
}

impl Project {
    pub fn new_untitled(untitled_counter: usize, sprite_size: u32, settings: &AppSettings) -> Self {
        let size = clamp_sprite_size(sprite_size);
        if size != sprite_size {
            crate::log_warn!("Sprite size {} clamped to {}", sprite_size, size);
        }
        Self {
            id: Uuid::new_v4(),
            frames: FrameSequence::new(size),
            tools: ToolEngine::new(ToolProperties {
                tool: Tool::Pen,
                size: settings.default_brush_size,
                color: settings.default_color,
            }),
            view: CanvasView::new(size),
            background: checkerboard(size),
            playback: PlaybackScheduler::new(settings.default_frame_rate),
            default_color: settings.default_color,
            path: None,
            is_dirty: false,
            name: format!("Untitled-{}", untitled_counter),
        }
    }

    /// Open a `.ssp` file as a new project.
    pub fn from_file(path: &Path, settings: &AppSettings) -> Result<Self, SspError> {
        let frames = io::load_ssp(path)?;
        let mut project = Self::new_untitled(0, frames.sprite_size(), settings);
        project.install_frames(frames);
        project.path = Some(path.to_path_buf());
        project.update_name_from_path();
        crate::log_info!(
            "Opened {} ({}×{}, {} frames)",
            path.display(),
            project.sprite_size(),
            project.sprite_size(),
            project.frames.frame_count()
        );
        Ok(project)
    }

    // ------------------------------------------------------------------
    // Document state
    // ------------------------------------------------------------------

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    pub fn update_name_from_path(&mut self) {
        if let Some(ref path) = self.path {
            self.name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
        }
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }

    pub fn sprite_size(&self) -> u32 {
        self.frames.sprite_size()
    }

    pub fn frames(&self) -> &FrameSequence {
        &self.frames
    }

    pub fn current_frame(&self) -> &PixelBuffer {
        self.frames.current()
    }

    pub fn background(&self) -> &PixelBuffer {
        &self.background
    }

    pub fn view(&self) -> &CanvasView {
        &self.view
    }

    pub fn nav_state(&self) -> NavState {
        self.frames.nav_state()
    }

    /// What the drawing viewport shows right now.
    pub fn compose_view(&self) -> RgbaImage {
        self.view.compose(self.frames.current(), &self.background)
    }

    // ------------------------------------------------------------------
    // Pointer input (view coordinates)
    // ------------------------------------------------------------------

    pub fn pointer_down(&mut self, view_x: i32, view_y: i32) -> usize {
        let point = self.view.view_to_pixel(view_x, view_y);
        let written = self.tools.begin_stroke(self.frames.current_mut(), point);
        self.after_stroke(written)
    }

    pub fn pointer_move(&mut self, view_x: i32, view_y: i32) -> usize {
        let point = self.view.view_to_pixel(view_x, view_y);
        let written = self.tools.continue_stroke(self.frames.current_mut(), point);
        self.after_stroke(written)
    }

    pub fn pointer_up(&mut self, view_x: i32, view_y: i32) -> usize {
        let point = self.view.view_to_pixel(view_x, view_y);
        let written = self.tools.end_stroke(self.frames.current_mut(), point);
        self.after_stroke(written)
    }

    fn after_stroke(&mut self, written: usize) -> usize {
        if written > 0 {
            self.mark_dirty();
        }
        written
    }

    // ------------------------------------------------------------------
    // Tool controls
    // ------------------------------------------------------------------

    pub fn tool(&self) -> Tool {
        self.tools.tool()
    }

    /// Selecting Pen or Eraser drops the brush back to size 1.
    pub fn set_tool(&mut self, tool: Tool) {
        self.tools.set_tool(tool);
        if matches!(tool, Tool::Pen | Tool::Eraser) {
            self.tools.set_size(MIN_BRUSH_SIZE);
        }
        crate::log_info!("Tool: {}", tool.label());
    }

    pub fn brush_size(&self) -> u32 {
        self.tools.size()
    }

    /// Clamped to 1–4.
    pub fn set_brush_size(&mut self, size: u32) {
        self.tools.set_size(size);
    }

    pub fn color(&self) -> Pixel {
        self.tools.color()
    }

    pub fn set_color(&mut self, color: Pixel) {
        self.tools.set_color(color);
    }

    pub fn zoom_in(&mut self) -> bool {
        self.view.zoom_in()
    }

    pub fn zoom_out(&mut self) -> bool {
        self.view.zoom_out()
    }

    // ------------------------------------------------------------------
    // Frame controls
    // ------------------------------------------------------------------

    /// Pause playback and drop any stroke before the sequence changes shape.
    fn begin_structural_edit(&mut self) {
        self.playback.pause();
        self.tools.cancel_stroke();
    }

    pub fn add_frame(&mut self) {
        self.begin_structural_edit();
        self.frames.add_frame();
        self.mark_dirty();
        crate::log_info!("Added frame {}", self.frames.display_number());
    }

    pub fn duplicate_current_frame(&mut self) {
        self.begin_structural_edit();
        self.frames.duplicate_current_frame();
        self.mark_dirty();
        crate::log_info!("Duplicated into frame {}", self.frames.display_number());
    }

    /// Returns `false` (and changes nothing) when only one frame is left.
    pub fn delete_current_frame(&mut self) -> bool {
        self.begin_structural_edit();
        let deleted_number = self.frames.display_number();
        if !self.frames.delete_current_frame() {
            return false;
        }
        self.mark_dirty();
        crate::log_info!("Deleted frame {}", deleted_number);
        true
    }

    pub fn clear_current_frame(&mut self) {
        self.begin_structural_edit();
        self.frames.clear_current_frame();
        self.mark_dirty();
    }

    pub fn go_to_previous(&mut self) {
        self.tools.cancel_stroke();
        self.frames.go_to_previous();
    }

    pub fn go_to_next(&mut self) {
        self.tools.cancel_stroke();
        self.frames.go_to_next();
    }

    /// Start over with one blank frame of `sprite_size` (clamped to 2–128).
    /// The draw color and brush size go back to their defaults.
    pub fn resize(&mut self, sprite_size: u32) {
        let size = clamp_sprite_size(sprite_size);
        self.begin_structural_edit();
        self.frames.resize(size);
        self.view = CanvasView::new(size);
        self.background = checkerboard(size);
        self.tools.set_color(self.default_color);
        self.tools.set_size(1);
        self.mark_dirty();
        crate::log_info!("Resized sprite to {}×{}", size, size);
    }

    // ------------------------------------------------------------------
    // Save / load
    // ------------------------------------------------------------------

    /// Save to `path` and adopt it as the project's file.
    pub fn save(&mut self, path: &Path) -> Result<(), SspError> {
        io::save_ssp(&self.frames, path).inspect_err(|e| {
            crate::log_err!("Save to {} failed: {}", path.display(), e);
        })?;
        self.path = Some(path.to_path_buf());
        self.update_name_from_path();
        self.mark_clean();
        crate::log_info!("Saved {} frames to {}", self.frames.frame_count(), path.display());
        Ok(())
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), SspError> {
        io::write_ssp(&self.frames, writer)
    }

    /// Replace every frame with the contents of `path`.  On error the
    /// project is left untouched.
    pub fn load(&mut self, path: &Path) -> Result<(), SspError> {
        let frames = io::load_ssp(path).inspect_err(|e| {
            crate::log_err!("Load of {} failed: {}", path.display(), e);
        })?;
        self.install_frames(frames);
        self.path = Some(path.to_path_buf());
        self.update_name_from_path();
        crate::log_info!(
            "Loaded {} frames ({}×{}) from {}",
            self.frames.frame_count(),
            self.sprite_size(),
            self.sprite_size(),
            path.display()
        );
        Ok(())
    }

    pub fn read_from<R: Read>(&mut self, reader: R) -> Result<(), SspError> {
        let frames = io::read_ssp(reader)?;
        self.install_frames(frames);
        Ok(())
    }

    /// Swap in a fully decoded sequence (cursor already on the last frame).
    fn install_frames(&mut self, frames: FrameSequence) {
        self.begin_structural_edit();
        let size = frames.sprite_size();
        self.frames = frames;
        self.view = CanvasView::new(size);
        self.background = checkerboard(size);
        self.mark_clean();
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.playback.frame_rate()
    }

    pub fn set_frame_rate(&mut self, rate: FrameRate) {
        self.playback.set_frame_rate(rate);
    }

    /// Start the preview from the frame being edited.
    pub fn play(&mut self, now: Instant) {
        self.playback.play(now, self.frames.current_index());
    }

    pub fn pause(&mut self) {
        self.playback.pause();
    }

    pub fn toggle_playback(&mut self, now: Instant) {
        if self.playback.is_playing() {
            self.pause();
        } else {
            self.play(now);
        }
    }

    pub fn restart_playback(&mut self, now: Instant) {
        self.playback.restart(now);
    }

    /// The frame the preview pane should show, when a tick is due.
    pub fn poll_playback(&mut self, now: Instant) -> Option<&PixelBuffer> {
        let index = self.playback.poll(now, self.frames.frames())?;
        self.frames.frame(index)
    }

    pub fn playback(&self) -> &PlaybackScheduler {
        &self.playback
    }
}
