mod draw_seal;

pub use draw_seal::{draw_seal, DrawInputs};
