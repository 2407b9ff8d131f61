//! # Extraction Engine
//!
//! Turns extraction specs into one [`OutputRecord`](crate::output::record::OutputRecord) per
//! worksheet:
//!
//! - [`spec`] splits `F4-样品名称` style lines into coordinate expression and field name
//! - [`expression`] parses `F4` / `A15:K15` expressions
//! - [`resolver`] looks expressions up in a worksheet, with bounds handling
//! - [`worksheet`] and [`workbook`] apply a spec list to one worksheet or every worksheet of a file
pub mod expression;
pub mod resolver;
pub mod spec;
pub mod workbook;
pub mod worksheet;
