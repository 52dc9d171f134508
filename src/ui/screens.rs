use std::cmp::min;

use crate::models::Song;

/// The fetched collection plus the card currently highlighted.
#[derive(Default)]
pub(crate) struct SongList {
    pub(crate) songs: Vec<Song>,
    pub(crate) selected: usize,
}

impl SongList {
    /// Swap in a freshly fetched collection, keeping the highlight on the same
    /// song when it is still present.
    pub(crate) fn replace(&mut self, songs: Vec<Song>) {
        let focus_id = self.current_song().map(|song| song.id);
        self.songs = songs;
        self.selected = focus_id
            .and_then(|id| self.songs.iter().position(|song| song.id == id))
            .unwrap_or(self.selected);
        self.ensure_in_bounds();
    }

    pub(crate) fn current_song(&self) -> Option<&Song> {
        self.songs.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.songs.is_empty() {
            self.selected = 0;
            return;
        }
        let max_index = self.songs.len() as isize - 1;
        let next = (self.selected as isize + offset).clamp(0, max_index);
        self.selected = next as usize;
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.songs.len().saturating_sub(1);
    }

    fn ensure_in_bounds(&mut self) {
        if self.songs.is_empty() {
            self.selected = 0;
        } else {
            self.selected = min(self.selected, self.songs.len() - 1);
        }
    }
}
