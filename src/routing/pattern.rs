//! Route pattern construction from the routes directory tree.
//!
//! # Responsibilities
//! - Strip the source-file extension from a route file name
//! - Translate `[name]` into `:name` and `[...name]` into `name*`
//! - Collapse `index` files onto their directory
//! - Normalize separators (backslashes, repeated and trailing slashes)
//!
//! # Design Decisions
//! - Translation runs inside compound names too (`[id]-[post]` → `:id-:post`)
//! - An absolute-looking directory is treated as an ordinary segment chain
//! - Pure string functions: no filesystem access happens here

/// File extensions recognized as route files.
pub const ROUTE_EXTENSIONS: &[&str] = &["rs", "ts", "tsx", "js", "jsx"];

/// Returns true when `file_name` ends with one of [`ROUTE_EXTENSIONS`].
pub fn is_route_file(file_name: &str) -> bool {
    route_stem(file_name).is_some()
}

/// Strip a recognized extension, or `None` when the file is not a route file.
///
/// Only the last extension is removed: `build.module.test.ts` → `build.module.test`.
pub fn route_stem(file_name: &str) -> Option<&str> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || !ROUTE_EXTENSIONS.contains(&ext) {
        return None;
    }
    Some(stem)
}

/// Build the route pattern for `file_name` located in `directory`.
///
/// ```
/// use fsroute::routing::pattern::build_pattern;
///
/// assert_eq!(build_pattern("", "index.ts"), "/");
/// assert_eq!(build_pattern("users", "[id].ts"), "/users/:id");
/// assert_eq!(build_pattern("docs", "[...slug].ts"), "/docs/slug*");
/// ```
pub fn build_pattern(directory: &str, file_name: &str) -> String {
    let stem = route_stem(file_name).unwrap_or(file_name);
    let directory = translate(directory);

    let joined = if stem == "index" {
        format!("/{}", directory)
    } else {
        format!("/{}/{}", directory, translate(stem))
    };

    normalize(&joined)
}

/// Collect the parameter names declared by a file or directory name.
///
/// Both `[name]` and `[...name]` are reported, in order of appearance.
pub fn declared_params(name: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut rest = name;
    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(']') else {
            break;
        };
        let inner = &after[..close];
        if !inner.is_empty() {
            let inner = match inner.strip_prefix("...") {
                Some(catch_all) if !catch_all.is_empty() => catch_all,
                _ => inner,
            };
            params.push(inner.to_string());
        }
        rest = &after[close + 1..];
    }
    params
}

/// Rewrite bracket placeholders into pattern syntax.
fn translate(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut rest = text;

    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(']') {
            Some(close) if close > 0 => {
                let inner = &after[..close];
                match inner.strip_prefix("...") {
                    Some(name) if !name.is_empty() => {
                        out.push_str(name);
                        out.push('*');
                    }
                    _ => {
                        out.push(':');
                        out.push_str(inner);
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('[');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        return "/".to_string();
    }
    format!("/{}", segments.join("/"))
}
