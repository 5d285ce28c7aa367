// ============================================================================
// FRAME SEQUENCE: ordered animation frames with an edit cursor
// ============================================================================

use crate::canvas::PixelBuffer;

/// Navigation availability for the frame controls, recomputed on demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavState {
    /// 0-based index of the frame being edited.
    pub frame_index: usize,
    pub can_go_prev: bool,
    pub can_go_next: bool,
    pub can_delete: bool,
}

/// Ordered frames of one square sprite.
///
/// Invariants: there is always at least one frame, every frame is
/// `sprite_size × sprite_size`, and `current_index` names a live frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSequence {
    frames: Vec<PixelBuffer>,
    current_index: usize,
    sprite_size: u32,
}

impl FrameSequence {
    /// One transparent frame of `sprite_size × sprite_size`.
    pub fn new(sprite_size: u32) -> Self {
        Self {
            frames: vec![PixelBuffer::new(sprite_size, sprite_size)],
            current_index: 0,
            sprite_size,
        }
    }

    /// Build a sequence from decoded frames.  An empty list becomes a single
    /// transparent frame; `current_index` is clamped to the last frame.
    pub fn from_frames(sprite_size: u32, mut frames: Vec<PixelBuffer>, current_index: usize) -> Self {
        frames.retain(|f| f.width() == sprite_size && f.height() == sprite_size);
        if frames.is_empty() {
            frames.push(PixelBuffer::new(sprite_size, sprite_size));
        }
        let current_index = current_index.min(frames.len() - 1);
        Self {
            frames,
            current_index,
            sprite_size,
        }
    }

    pub fn sprite_size(&self) -> u32 {
        self.sprite_size
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// 1-based frame number as shown to the user.
    pub fn display_number(&self) -> usize {
        self.current_index + 1
    }

    pub fn current(&self) -> &PixelBuffer {
        &self.frames[self.current_index]
    }

    pub fn current_mut(&mut self) -> &mut PixelBuffer {
        &mut self.frames[self.current_index]
    }

    pub fn frame(&self, index: usize) -> Option<&PixelBuffer> {
        self.frames.get(index)
    }

    pub fn frames(&self) -> &[PixelBuffer] {
        &self.frames
    }

    pub fn can_go_prev(&self) -> bool {
        self.current_index > 0
    }

    pub fn can_go_next(&self) -> bool {
        self.current_index + 1 < self.frames.len()
    }

    pub fn can_delete(&self) -> bool {
        self.frames.len() > 1
    }

    pub fn nav_state(&self) -> NavState {
        NavState {
            frame_index: self.current_index,
            can_go_prev: self.can_go_prev(),
            can_go_next: self.can_go_next(),
            can_delete: self.can_delete(),
        }
    }

    /// Insert a transparent frame right after the current one and move to it.
    pub fn add_frame(&mut self) {
        let frame = PixelBuffer::new(self.sprite_size, self.sprite_size);
        self.insert_after_current(frame);
    }

    /// Insert a copy of the current frame right after it and move to the copy.
    pub fn duplicate_current_frame(&mut self) {
        let frame = self.current().clone();
        self.insert_after_current(frame);
    }

    fn insert_after_current(&mut self, frame: PixelBuffer) {
        let idx = self.current_index + 1;
        self.frames.insert(idx, frame);
        self.current_index = idx;
    }

    /// Remove the current frame.
    ///
    /// Deleting the last frame moves the cursor back one; otherwise the cursor
    /// stays put and now names the frame that slid into the gap.
    ///
    /// Precondition: [`can_delete`](Self::can_delete).  Callers disable the
    /// control when only one frame is left; if it is called anyway nothing
    /// is removed and `false` is returned.
    pub fn delete_current_frame(&mut self) -> bool {
        if !self.can_delete() {
            crate::log_warn!("delete_current_frame ignored: only one frame left");
            return false;
        }
        self.frames.remove(self.current_index);
        if self.current_index >= self.frames.len() {
            self.current_index = self.frames.len() - 1;
        }
        true
    }

    /// Make the current frame fully transparent.
    pub fn clear_current_frame(&mut self) {
        self.current_mut().clear();
    }

    /// Step back one frame, staying on the first frame.
    pub fn go_to_previous(&mut self) {
        self.current_index = self.current_index.saturating_sub(1);
    }

    /// Step forward one frame, staying on the last frame.
    pub fn go_to_next(&mut self) {
        if self.can_go_next() {
            self.current_index += 1;
        }
    }

    /// Discard every frame and start over with one transparent frame of the
    /// new size.  Destructive: confirming with the user is the caller's job.
    pub fn resize(&mut self, sprite_size: u32) {
        self.sprite_size = sprite_size;
        self.frames.clear();
        self.frames.push(PixelBuffer::new(sprite_size, sprite_size));
        self.current_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const GREEN: image::Rgba<u8> = Rgba([0, 255, 0, 255]);

    /// Three frames, each tagged with its creation order in pixel (0, 0).
    fn tagged(count: u8) -> FrameSequence {
        let mut seq = FrameSequence::new(4);
        seq.current_mut().set(0, 0, Rgba([0, 0, 0, 255]));
        for tag in 1..count {
            seq.add_frame();
            seq.current_mut().set(0, 0, Rgba([tag, 0, 0, 255]));
        }
        seq
    }

    fn tags(seq: &FrameSequence) -> Vec<u8> {
        seq.frames().iter().map(|f| f.get(0, 0)[0]).collect()
    }

    #[test]
    fn starts_with_one_transparent_frame() {
        let seq = FrameSequence::new(16);
        assert_eq!(seq.frame_count(), 1);
        assert_eq!(seq.current_index(), 0);
        assert_eq!(seq.display_number(), 1);
        assert_eq!(seq.current().painted_count(), 0);
        assert_eq!(
            seq.nav_state(),
            NavState { frame_index: 0, can_go_prev: false, can_go_next: false, can_delete: false }
        );
    }

    #[test]
    fn add_frame_inserts_after_current() {
        let mut seq = tagged(3);
        seq.go_to_previous();
        assert_eq!(seq.current_index(), 1);

        seq.add_frame();
        assert_eq!(seq.frame_count(), 4);
        assert_eq!(seq.current_index(), 2);
        assert_eq!(seq.current().painted_count(), 0);
        // Tag 2 shifted to position 3, identity unchanged.
        assert_eq!(seq.frame(3).map(|f| f.get(0, 0)[0]), Some(2));
        assert!(seq.can_go_next());
    }

    #[test]
    fn add_frame_at_end_appends() {
        let mut seq = tagged(2);
        seq.add_frame();
        assert_eq!(seq.frame_count(), 3);
        assert_eq!(seq.current_index(), 2);
        assert!(!seq.can_go_next());
        assert!(seq.can_go_prev());
    }

    #[test]
    fn duplicate_clones_current_frame() {
        let mut seq = FrameSequence::new(4);
        seq.current_mut().set(1, 1, GREEN);
        seq.duplicate_current_frame();
        assert_eq!(seq.frame_count(), 2);
        assert_eq!(seq.current_index(), 1);
        assert_eq!(seq.current().get(1, 1), GREEN);

        // The copy is independent of the original.
        seq.clear_current_frame();
        assert_eq!(seq.frame(0).map(|f| f.get(1, 1)), Some(GREEN));
    }

    #[test]
    fn delete_middle_keeps_cursor_on_successor() {
        let mut seq = tagged(3);
        seq.go_to_previous();
        assert!(seq.delete_current_frame());
        assert_eq!(tags(&seq), vec![0, 2]);
        assert_eq!(seq.current_index(), 1);
        assert_eq!(seq.current().get(0, 0)[0], 2);
    }

    #[test]
    fn delete_last_moves_cursor_back() {
        let mut seq = tagged(3);
        assert!(seq.delete_current_frame());
        assert_eq!(tags(&seq), vec![0, 1]);
        assert_eq!(seq.current_index(), 1);
        assert!(!seq.can_go_next());
    }

    #[test]
    fn delete_first_of_two() {
        let mut seq = tagged(2);
        seq.go_to_previous();
        assert!(seq.delete_current_frame());
        assert_eq!(tags(&seq), vec![1]);
        assert_eq!(seq.nav_state(), NavState {
            frame_index: 0,
            can_go_prev: false,
            can_go_next: false,
            can_delete: false,
        });
    }

    #[test]
    fn sequence_never_becomes_empty() {
        let mut seq = tagged(3);
        while seq.can_delete() {
            seq.delete_current_frame();
        }
        assert_eq!(seq.frame_count(), 1);
        assert!(!seq.delete_current_frame());
        assert_eq!(seq.frame_count(), 1);
    }

    #[test]
    fn navigation_is_clamped() {
        let mut seq = tagged(2);
        seq.go_to_next();
        assert_eq!(seq.current_index(), 1);
        seq.go_to_previous();
        seq.go_to_previous();
        assert_eq!(seq.current_index(), 0);
        assert!(!seq.can_go_prev());
    }

    #[test]
    fn clear_keeps_length_and_position() {
        let mut seq = tagged(3);
        seq.go_to_previous();
        seq.clear_current_frame();
        assert_eq!(seq.frame_count(), 3);
        assert_eq!(seq.current_index(), 1);
        assert_eq!(seq.current().painted_count(), 0);
        assert_eq!(seq.frame(2).map(|f| f.painted_count()), Some(1));
    }

    #[test]
    fn resize_discards_everything() {
        let mut seq = tagged(4);
        seq.resize(32);
        assert_eq!(seq.frame_count(), 1);
        assert_eq!(seq.current_index(), 0);
        assert_eq!(seq.sprite_size(), 32);
        assert_eq!(seq.current().width(), 32);
        assert_eq!(seq.current().painted_count(), 0);
    }

    #[test]
    fn from_frames_clamps_cursor_and_fills_empty() {
        let seq = FrameSequence::from_frames(4, Vec::new(), 3);
        assert_eq!(seq.frame_count(), 1);
        assert_eq!(seq.current_index(), 0);

        let frames = vec![PixelBuffer::new(4, 4), PixelBuffer::new(4, 4)];
        let seq = FrameSequence::from_frames(4, frames, 9);
        assert_eq!(seq.current_index(), 1);
    }
}
