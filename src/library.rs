use crate::model::{LibraryState, RepeatMode, Track};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::fmt;
use tracing::{debug, info};

/// Individually observable pieces of [`LibraryState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Tracks,
    CurrentIndex,
    Shuffle,
    LoopAll,
    LoopCurrent,
    Playing,
}

pub type Listener = Box<dyn FnMut(&LibraryState, &[Field])>;

/// Owns the track list and its playback flags.
///
/// Every mutation notifies subscribers synchronously with the fields that
/// changed, and also queues those fields until [`LibraryStore::take_changes`]
/// is called, so the owner can persist and re-derive menus once per turn.
pub struct LibraryStore {
    state: LibraryState,
    listeners: Vec<Listener>,
    pending: Vec<Field>,
    generation: u64,
    rng: SmallRng,
}

impl fmt::Debug for LibraryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryStore")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .field("pending", &self.pending)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl LibraryStore {
    pub fn create(initial: LibraryState) -> Self {
        Self::with_rng(initial, rand::make_rng::<SmallRng>())
    }

    pub fn with_rng(mut initial: LibraryState, rng: SmallRng) -> Self {
        if initial.original_order.is_empty() && !initial.tracks.is_empty() {
            initial.original_order = initial.tracks.clone();
        }
        if initial.tracks.is_empty() && !initial.original_order.is_empty() {
            initial.tracks = initial.original_order.clone();
        }
        if initial.loop_all && initial.loop_current {
            initial.loop_all = false;
        }
        initial.current_index = clamp_index(initial.current_index, initial.tracks.len());

        Self {
            state: initial,
            listeners: Vec::new(),
            pending: Vec::new(),
            generation: 0,
            rng,
        }
    }

    pub fn state(&self) -> &LibraryState {
        &self.state
    }

    /// Bumped whenever the whole library is cleared or replaced.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn take_changes(&mut self) -> Vec<Field> {
        std::mem::take(&mut self.pending)
    }

    pub fn replace_tracks(&mut self, tracks: Vec<Track>) {
        self.state.original_order = tracks;
        self.state.tracks = if self.state.is_shuffled {
            self.shuffled_order()
        } else {
            self.state.original_order.clone()
        };
        self.state.current_index = 0;
        self.generation += 1;
        info!(tracks = self.state.tracks.len(), "library replaced");
        self.emit(&[Field::Tracks, Field::CurrentIndex]);
    }

    pub fn set_current_index(&mut self, index: usize) {
        let index = clamp_index(index, self.state.tracks.len());
        if index != self.state.current_index {
            self.state.current_index = index;
            self.emit(&[Field::CurrentIndex]);
        }
    }

    pub fn play_index(&mut self, index: usize) {
        if self.state.tracks.is_empty() {
            return;
        }
        self.state.current_index = clamp_index(index, self.state.tracks.len());
        self.state.is_playing = true;
        self.emit(&[Field::CurrentIndex, Field::Playing]);
    }

    pub fn set_playing(&mut self, playing: bool) {
        if self.state.is_playing != playing {
            self.state.is_playing = playing;
            self.emit(&[Field::Playing]);
        }
    }

    pub fn toggle_playing(&mut self) {
        let playing = !self.state.is_playing;
        self.set_playing(playing);
    }

    /// Advances one track. At the last index this wraps only with `loop_all`;
    /// either way playback is requested.
    pub fn next_track(&mut self) {
        let len = self.state.tracks.len();
        if len == 0 {
            return;
        }
        let current = self.state.current_index;
        self.state.current_index = if current + 1 >= len {
            if self.state.loop_all { 0 } else { current }
        } else {
            current + 1
        };
        self.state.is_playing = true;
        debug!(index = self.state.current_index, "next track");
        self.emit(&[Field::CurrentIndex, Field::Playing]);
    }

    pub fn previous_track(&mut self) {
        let len = self.state.tracks.len();
        if len == 0 {
            return;
        }
        let current = self.state.current_index;
        self.state.current_index = if current == 0 {
            if self.state.loop_all { len - 1 } else { 0 }
        } else {
            current - 1
        };
        self.state.is_playing = true;
        debug!(index = self.state.current_index, "previous track");
        self.emit(&[Field::CurrentIndex, Field::Playing]);
    }

    /// Turning shuffle on derives a fresh permutation of the original order;
    /// turning it off restores the original order verbatim. The playing track
    /// keeps playing in both directions.
    pub fn toggle_shuffle(&mut self) {
        let current_id = self.state.current_track().map(|track| track.id.clone());
        self.state.is_shuffled = !self.state.is_shuffled;
        self.state.tracks = if self.state.is_shuffled {
            self.shuffled_order()
        } else {
            self.state.original_order.clone()
        };
        self.follow_track(current_id.as_deref());
        info!(shuffled = self.state.is_shuffled, "shuffle toggled");
        self.emit(&[Field::Shuffle, Field::Tracks, Field::CurrentIndex]);
    }

    /// Re-deals the shuffled order and starts playing from its first track.
    pub fn shuffle_from_start(&mut self) {
        self.state.is_shuffled = true;
        self.state.tracks = self.shuffled_order();
        self.state.current_index = 0;
        self.state.is_playing = !self.state.tracks.is_empty();
        self.emit(&[
            Field::Shuffle,
            Field::Tracks,
            Field::CurrentIndex,
            Field::Playing,
        ]);
    }

    /// Appends to both the live view and the original order and returns the
    /// track's position in the live view.
    pub fn add_track(&mut self, track: Track) -> usize {
        info!(id = %track.id, title = %track.title, "track added");
        self.state.original_order.push(track.clone());
        self.state.tracks.push(track);
        self.emit(&[Field::Tracks]);
        self.state.tracks.len() - 1
    }

    pub fn remove_track(&mut self, index: usize) -> Option<Track> {
        if index >= self.state.tracks.len() {
            return None;
        }
        let removed = self.state.tracks.remove(index);
        if let Some(pos) = self
            .state
            .original_order
            .iter()
            .position(|track| track.id == removed.id)
        {
            self.state.original_order.remove(pos);
        }

        let mut changed = vec![Field::Tracks];
        let current = self.state.current_index;
        if index < current {
            self.state.current_index = current - 1;
            changed.push(Field::CurrentIndex);
        } else if index == current {
            self.state.current_index = clamp_index(current, self.state.tracks.len());
            changed.push(Field::CurrentIndex);
        }
        if self.state.tracks.is_empty() && self.state.is_playing {
            self.state.is_playing = false;
            changed.push(Field::Playing);
        }
        info!(id = %removed.id, "track removed");
        self.emit(&changed);
        Some(removed)
    }

    pub fn clear_library(&mut self) {
        self.state.tracks.clear();
        self.state.original_order.clear();
        self.state.current_index = 0;
        self.state.is_playing = false;
        self.generation += 1;
        info!("library cleared");
        self.emit(&[Field::Tracks, Field::CurrentIndex, Field::Playing]);
    }

    pub fn toggle_loop_all(&mut self) {
        self.state.loop_all = !self.state.loop_all;
        if self.state.loop_all {
            self.state.loop_current = false;
        }
        self.emit(&[Field::LoopAll, Field::LoopCurrent]);
    }

    pub fn toggle_loop_current(&mut self) {
        self.state.loop_current = !self.state.loop_current;
        if self.state.loop_current {
            self.state.loop_all = false;
        }
        self.emit(&[Field::LoopAll, Field::LoopCurrent]);
    }

    pub fn set_repeat(&mut self, mode: RepeatMode) {
        let (loop_all, loop_current) = mode.flags();
        self.state.loop_all = loop_all;
        self.state.loop_current = loop_current;
        debug!(mode = mode.label(), "repeat mode set");
        self.emit(&[Field::LoopAll, Field::LoopCurrent]);
    }

    /// Off -> All -> One -> Off.
    pub fn cycle_repeat(&mut self) {
        let next = self.state.repeat_mode().next();
        self.set_repeat(next);
    }

    pub fn adjust_lyric_offset(&mut self, index: usize, delta_ms: i64) {
        let Some(id) = self.state.tracks.get(index).map(|track| track.id.clone()) else {
            return;
        };
        for track in self
            .state
            .tracks
            .iter_mut()
            .chain(self.state.original_order.iter_mut())
            .filter(|track| track.id == id)
        {
            let offset = track.lyric_offset_ms.unwrap_or(0).saturating_add(delta_ms);
            track.lyric_offset_ms = Some(offset);
        }
        self.emit(&[Field::Tracks]);
    }

    fn follow_track(&mut self, id: Option<&str>) {
        let position = id.and_then(|id| self.state.position_of(id));
        self.state.current_index = match position {
            Some(position) => position,
            None => clamp_index(self.state.current_index, self.state.tracks.len()),
        };
    }

    fn shuffled_order(&mut self) -> Vec<Track> {
        let mut order = self.state.original_order.clone();
        order.shuffle(&mut self.rng);
        if order.len() > 1 && same_ids(&order, &self.state.original_order) {
            order.rotate_left(1);
        }
        order
    }

    fn emit(&mut self, changed: &[Field]) {
        if changed.is_empty() {
            return;
        }
        for listener in self.listeners.iter_mut() {
            listener(&self.state, changed);
        }
        for field in changed {
            if !self.pending.contains(field) {
                self.pending.push(*field);
            }
        }
    }
}

fn clamp_index(index: usize, len: usize) -> usize {
    if len == 0 { 0 } else { index.min(len - 1) }
}

fn same_ids(left: &[Track], right: &[Track]) -> bool {
    left.len() == right.len() && left.iter().zip(right).all(|(a, b)| a.id == b.id)
}
