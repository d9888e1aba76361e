mod table;

pub use table::{Align, Table};
