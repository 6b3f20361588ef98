mod macros;

pub mod aggregate;
pub mod assemble;
pub mod config;
pub mod entity;
pub mod error;
pub mod frame;
pub mod io;
pub mod join;
pub mod pipeline;
pub mod prelude;
pub mod price;
pub mod reshape;
pub mod schema;
pub mod temporal;
pub mod window;
