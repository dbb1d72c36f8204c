use std::collections::VecDeque;
use std::time::Duration;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sources::Track;

/// Modo de repetición de un player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    #[default]
    Off,
    /// Repetir el track actual
    Track,
    /// Reinsertar cada track al final de la cola
    Queue,
}

impl From<&str> for LoopMode {
    /// Cualquier valor que no sea `track` o `queue` se normaliza a `Off`
    fn from(value: &str) -> Self {
        match value {
            "track" => LoopMode::Track,
            "queue" => LoopMode::Queue,
            _ => LoopMode::Off,
        }
    }
}

/// Cola de reproducción de un player.
///
/// Los tracks pendientes se reproducen en orden FIFO. `current` nunca forma
/// parte de la secuencia pendiente: se extrae de ella antes de asignarse.
#[derive(Debug, Default)]
pub struct TrackQueue {
    tracks: VecDeque<Track>,
    current: Option<Track>,
    previous: Option<Track>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un track al final de la cola
    pub fn push(&mut self, track: Track) {
        self.tracks.push_back(track);
    }

    /// Inserta un track al frente de la cola (lo usa el loop de track)
    pub fn push_front(&mut self, track: Track) {
        self.tracks.push_front(track);
    }

    /// Quita y devuelve el track en `index`
    pub fn remove(&mut self, index: usize) -> Result<Track> {
        let size = self.tracks.len();
        self.tracks
            .remove(index)
            .ok_or(Error::IndexOutOfRange { index, size })
    }

    /// Quita y devuelve el primer track pendiente
    pub fn pop_head(&mut self) -> Option<Track> {
        self.tracks.pop_front()
    }

    /// Vacía los pendientes; `current` y `previous` no se tocan
    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Permuta aleatoriamente los pendientes; `current` queda fuera
    pub fn shuffle(&mut self) {
        let mut items: Vec<_> = self.tracks.drain(..).collect();
        items.shuffle(&mut rand::thread_rng());
        self.tracks.extend(items);
    }

    /// Cantidad de tracks pendientes (sin contar `current`)
    pub fn size(&self) -> usize {
        self.tracks.len()
    }

    /// Pendientes más el track actual si lo hay
    pub fn total_size(&self) -> usize {
        self.size() + usize::from(self.current.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Duración total de los pendientes (los streams no suman)
    pub fn duration_length(&self) -> Duration {
        self.tracks.iter().filter_map(|track| track.duration()).sum()
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&Track> {
        self.previous.as_ref()
    }

    /// Vista de los tracks pendientes en orden de reproducción
    pub fn tracks(&self) -> impl Iterator<Item = &Track> + '_ {
        self.tracks.iter()
    }

    pub(crate) fn set_current(&mut self, track: Track) {
        self.current = Some(track);
    }

    pub(crate) fn clear_current(&mut self) {
        self.current = None;
    }

    /// Cierra el track actual: pasa a `previous` y devuelve una copia
    pub(crate) fn finish_current(&mut self) -> Option<Track> {
        self.previous = self.current.take();
        self.previous.clone()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn track(title: &str) -> Track {
        Track::new(title).with_handle(format!("handle-{title}"))
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = TrackQueue::new();
        for title in ["uno", "dos", "tres"] {
            queue.push(track(title));
        }

        let popped: Vec<_> = std::iter::from_fn(|| queue.pop_head())
            .map(|t| t.title())
            .collect();
        assert_eq!(popped, vec!["uno", "dos", "tres"]);
        assert!(queue.pop_head().is_none());
    }

    #[test]
    fn test_total_size_counts_current() {
        let mut queue = TrackQueue::new();
        queue.push(track("uno"));
        queue.push(track("dos"));
        assert_eq!(queue.total_size(), queue.size());

        let head = queue.pop_head().unwrap();
        queue.set_current(head);
        assert_eq!(queue.size(), 1);
        assert_eq!(queue.total_size(), 2);

        queue.clear_current();
        assert_eq!(queue.total_size(), 1);
    }

    #[test]
    fn test_clear_keeps_current_and_previous() {
        let mut queue = TrackQueue::new();
        queue.set_current(track("actual"));
        queue.finish_current();
        queue.set_current(track("siguiente"));
        queue.push(track("pendiente"));

        queue.clear();

        assert_eq!(queue.size(), 0);
        assert_eq!(queue.current().unwrap().title(), "siguiente");
        assert_eq!(queue.previous().unwrap().title(), "actual");
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut queue = TrackQueue::new();
        queue.push(track("uno"));

        let removed = queue.remove(0).unwrap();
        assert_eq!(removed.title(), "uno");

        assert!(matches!(
            queue.remove(0),
            Err(Error::IndexOutOfRange { index: 0, size: 0 })
        ));
    }

    #[test]
    fn test_shuffle_only_touches_pending() {
        let mut queue = TrackQueue::new();
        queue.set_current(track("actual"));
        for i in 0..20 {
            queue.push(track(&format!("track-{i}")));
        }

        let mut before: Vec<_> = queue.tracks().map(|t| t.title()).collect();
        queue.shuffle();
        let mut after: Vec<_> = queue.tracks().map(|t| t.title()).collect();

        assert_eq!(queue.current().unwrap().title(), "actual");
        assert_eq!(queue.size(), 20);
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn test_duration_length_skips_unknown() {
        let mut queue = TrackQueue::new();
        queue.push(track("uno").with_duration(Duration::from_secs(120)));
        queue.push(track("dos"));
        queue.push(track("tres").with_duration(Duration::from_secs(30)));

        assert_eq!(queue.duration_length(), Duration::from_secs(150));
    }

    #[test]
    fn test_loop_mode_normalizes_unknown_values() {
        assert_eq!(LoopMode::from("track"), LoopMode::Track);
        assert_eq!(LoopMode::from("queue"), LoopMode::Queue);
        assert_eq!(LoopMode::from("none"), LoopMode::Off);
        assert_eq!(LoopMode::from("cualquier cosa"), LoopMode::Off);
        assert_eq!(LoopMode::from(""), LoopMode::Off);
    }
}
