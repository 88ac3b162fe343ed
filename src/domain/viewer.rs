use super::ImageEntry;
use crate::error::{Result, ShortlistError};
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    Idle,
    Displaying(usize),
    Exiting,
}

/// Direction of the most recent navigation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// Cursor over the scanned images.
///
/// Navigation clamps at both ends. Images that failed to decode are remembered
/// and stepped over by later navigation.
#[derive(Debug)]
pub struct Viewer {
    root: PathBuf,
    images: Vec<ImageEntry>,
    state: ViewerState,
    cursor: usize,
    last_direction: Direction,
    undisplayable: HashSet<usize>,
}

impl Viewer {
    pub fn new(root: impl Into<PathBuf>, images: Vec<ImageEntry>) -> Self {
        Self {
            root: root.into(),
            images,
            state: ViewerState::Idle,
            cursor: 0,
            last_direction: Direction::Forward,
            undisplayable: HashSet::new(),
        }
    }

    pub fn images(&self) -> &[ImageEntry] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    /// Index of the displayed image, `None` unless displaying
    pub fn cursor(&self) -> Option<usize> {
        match self.state {
            ViewerState::Displaying(i) => Some(i),
            _ => None,
        }
    }

    pub fn current(&self) -> Option<&ImageEntry> {
        self.cursor().and_then(|i| self.images.get(i))
    }

    /// Enters `Displaying` at `cursor`, clamped to the last image.
    ///
    /// Fails with [`ShortlistError::NoImages`] when there is nothing to show.
    pub fn start(&mut self, cursor: usize) -> Result<usize> {
        if self.images.is_empty() {
            return Err(ShortlistError::NoImages {
                root: self.root.clone(),
            });
        }
        if self.state == ViewerState::Exiting {
            return Ok(self.cursor);
        }

        let cursor = cursor.min(self.images.len() - 1);
        self.set_cursor(cursor);
        Ok(cursor)
    }

    /// Moves to the next displayable image. Returns whether the cursor moved.
    pub fn next(&mut self) -> bool {
        self.step(Direction::Forward)
    }

    /// Moves to the previous displayable image. Returns whether the cursor moved.
    pub fn previous(&mut self) -> bool {
        self.step(Direction::Backward)
    }

    /// The image the next step in the last direction would land on
    pub fn peek(&self) -> Option<&ImageEntry> {
        let current = self.cursor()?;
        self.find_displayable(current, self.last_direction)
            .and_then(|i| self.images.get(i))
    }

    /// The image to copy for a select command; the cursor does not move
    pub fn select(&self) -> Option<&ImageEntry> {
        self.current()
    }

    /// Transitions to `Exiting` and returns the cursor to persist
    pub fn quit(&mut self) -> Option<usize> {
        let cursor = self.cursor();
        self.state = ViewerState::Exiting;
        cursor
    }

    pub fn mark_undisplayable(&mut self, index: usize) {
        if index < self.images.len() {
            self.undisplayable.insert(index);
        }
    }

    pub fn is_undisplayable(&self, index: usize) -> bool {
        self.undisplayable.contains(&index)
    }

    /// Leaves an undisplayable current image.
    ///
    /// Searches in the last navigation direction first, then the other way.
    /// Returns the new cursor, or `None` if the cursor stayed put.
    pub fn skip_undisplayable(&mut self) -> Option<usize> {
        let current = self.cursor()?;
        if !self.is_undisplayable(current) {
            return None;
        }

        let other = match self.last_direction {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        };
        let target = self
            .find_displayable(current, self.last_direction)
            .or_else(|| self.find_displayable(current, other))?;

        self.set_cursor(target);
        Some(target)
    }

    fn step(&mut self, direction: Direction) -> bool {
        let Some(current) = self.cursor() else {
            return false;
        };
        self.last_direction = direction;

        match self.find_displayable(current, direction) {
            Some(target) => {
                self.set_cursor(target);
                true
            }
            None => false,
        }
    }

    fn find_displayable(&self, from: usize, direction: Direction) -> Option<usize> {
        match direction {
            Direction::Forward => ((from + 1)..self.images.len()).find(|i| !self.is_undisplayable(*i)),
            Direction::Backward => (0..from).rev().find(|i| !self.is_undisplayable(*i)),
        }
    }

    fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
        self.state = ViewerState::Displaying(cursor);
    }
}
