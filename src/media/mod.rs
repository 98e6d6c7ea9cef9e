mod audio_storage;

pub use audio_storage::{
    release_in_background, AudioRef, AudioStorage, AudioStorageError, LocalAudioStorage,
    ACCEPTED_AUDIO_MIME, AUDIO_URL_SEGMENT,
};
