pub mod resolution_error;
pub use resolution_error::*;

pub mod field_path;
pub use field_path::*;

pub mod allow_list;
pub use allow_list::*;

pub mod request_info;
pub use request_info::*;

pub mod multi_match;
pub use multi_match::*;

pub mod resolver_result;
pub use resolver_result::*;

pub mod field_resolver;
pub use field_resolver::*;

pub mod record_field_resolver;
pub use record_field_resolver::*;

pub mod resolver_runner;
pub use resolver_runner::*;

pub mod simple_field_resolver;
pub use simple_field_resolver::*;
