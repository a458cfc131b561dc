pub mod line_buffer;
pub mod memory;
