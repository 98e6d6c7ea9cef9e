//! In-memory transitions over one user's playlist collection.
//!
//! The engine loads the collection, applies one of these and writes the
//! whole collection back.

use crate::store::{Playlist, PostId};
use rand::{rng, Rng};
use rand_distr::Alphanumeric;

/// Name used when a song is added without naming a playlist.
pub const DEFAULT_PLAYLIST_NAME: &str = "Favourites";

const PLAYLIST_ID_LEN: usize = 16;

/// A random A-z0-9 playlist id
pub fn new_playlist_id() -> String {
    let bytes = rng()
        .sample_iter(&Alphanumeric)
        .take(PLAYLIST_ID_LEN)
        .collect::<Vec<u8>>();
    String::from_utf8_lossy(&bytes).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistSelector {
    Id(String),
    /// Addresses the first playlist with this name when a single one is
    /// needed, all of them otherwise.
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddSongResult {
    Appended(String),
    AlreadyPresent(String),
    Created(String),
}

/// Adds `song` to the first playlist called `name`, creating that playlist at
/// the end of the collection when missing.
pub fn add_song<F>(playlists: &mut Vec<Playlist>, name: &str, song: PostId, new_id: F) -> AddSongResult
where
    F: FnOnce() -> String,
{
    match playlists.iter_mut().find(|p| p.name == name) {
        Some(playlist) if playlist.songs.contains(&song) => {
            AddSongResult::AlreadyPresent(playlist.id.clone())
        }
        Some(playlist) => {
            playlist.songs.push(song);
            AddSongResult::Appended(playlist.id.clone())
        }
        None => {
            let id = new_id();
            playlists.push(Playlist {
                id: id.clone(),
                name: name.to_string(),
                songs: vec![song],
            });
            AddSongResult::Created(id)
        }
    }
}

/// Returns false if no playlist has the given id.
pub fn rename(playlists: &mut [Playlist], id: &str, name: &str) -> bool {
    match playlists.iter_mut().find(|p| p.id == id) {
        Some(playlist) => {
            playlist.name = name.to_string();
            true
        }
        None => false,
    }
}

fn find_one<'a>(playlists: &'a mut [Playlist], selector: &PlaylistSelector) -> Option<&'a mut Playlist> {
    playlists.iter_mut().find(|p| match selector {
        PlaylistSelector::Id(id) => &p.id == id,
        PlaylistSelector::Name(name) => &p.name == name,
    })
}

/// Filters `song` out of the selected playlist, keeping the order of the
/// remaining songs. Returns false if no playlist matches.
pub fn remove_song(playlists: &mut [Playlist], selector: &PlaylistSelector, song: PostId) -> bool {
    match find_one(playlists, selector) {
        Some(playlist) => {
            playlist.songs.retain(|s| *s != song);
            true
        }
        None => false,
    }
}

/// Removes every playlist matching the selector and returns how many went.
pub fn remove_playlists(playlists: &mut Vec<Playlist>, selector: &PlaylistSelector) -> usize {
    let before = playlists.len();
    playlists.retain(|p| match selector {
        PlaylistSelector::Id(id) => &p.id != id,
        PlaylistSelector::Name(name) => &p.name != name,
    });
    before - playlists.len()
}
