//! Well-known names the resolver and interpreter agree on.

pub const THIS: &str = "this";
pub const SUPER: &str = "super";
pub const INIT: &str = "__init__";
