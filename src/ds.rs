pub mod q_table;
pub mod ring_buffer;

pub use q_table::QTable;
pub use ring_buffer::RingBuffer;
