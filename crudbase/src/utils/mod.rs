//! Stateless helpers shared by the repository, resolvers and external clients.

pub mod boolean;
pub mod common;
pub mod date;
pub mod headers;
pub mod trim;
pub mod url;

pub use boolean::cast_boolean;
pub use common::{check_overlap_time, get_valid_array, is_empty_array, pick_by, trim_keys};
pub use date::{format_date, format_date_str, format_nullable_date, now_iso, parse_date};
pub use headers::accept_language;
pub use trim::{trim_str, trim_value};
pub use self::url::{format_url, is_valid_url};
