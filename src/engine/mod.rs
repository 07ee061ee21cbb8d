// Engine modules: assets, audio, events

pub mod assets;
pub mod audio;
pub mod events;
