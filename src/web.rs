//! Built-in control page, written to `web/index.html` on first run

pub const INDEX_HTML: &str = include_str!("../assets/index.html");
