pub mod key;
pub mod pitch;
pub mod timebase;
