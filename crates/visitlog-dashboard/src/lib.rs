pub mod confirm;
pub mod console;
pub mod error;
pub mod lookup;
pub mod render;
pub mod state;
