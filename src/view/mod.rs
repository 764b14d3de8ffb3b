//! Screen selection and record presentation.

pub mod presenter;
pub mod router;
mod table;

pub use presenter::{format_rendered, gender_label, render, DisplayRow, Rendered, NAME_MASK, NO_RECORDS_TEXT};
pub use router::{NavIntent, Transition, ViewRouter, ViewState};
pub use table::render_table;
