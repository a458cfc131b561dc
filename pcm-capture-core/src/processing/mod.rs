pub mod channel_buffer;
pub mod level_meter;
pub mod pcm;
