//! File-system pages.
//!
//! Every file under a pages directory becomes a `GET` route. The route
//! pattern comes from the file's path relative to the directory:
//!
//! ```text
//! index.html                  -> /
//! about.html                  -> /about
//! users/[id].json             -> /users/:id
//! nested/[dir]/in/index.html  -> /nested/:dir/in
//! ```

mod loader;

pub use loader::{DEFAULT_PAGE_DIRS, Page, PageKind, discover_pages, find_pages_dir, route_pattern};
