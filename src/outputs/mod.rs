//! Output generation.
//!
//! # Submodules
//!
//! - [`html`]: validates the model's JSON and renders the post body fragment

pub mod html;
