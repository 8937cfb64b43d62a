pub mod csv;
pub mod logging;
