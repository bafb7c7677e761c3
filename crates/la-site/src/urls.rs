//! Request URL helpers.

/// Replace every run of two or more slashes with a single slash.
#[must_use]
pub fn collapse_slashes(url: &str) -> String {
    let mut result = String::with_capacity(url.len());
    let mut last_was_slash = false;
    for c in url.chars() {
        if c == '/' {
            if !last_was_slash {
                result.push(c);
            }
            last_was_slash = true;
        } else {
            result.push(c);
            last_was_slash = false;
        }
    }
    result
}

/// Split a request URL into its path and the `?query`/`#fragment` suffix.
#[must_use]
pub fn split_path(url: &str) -> (&str, &str) {
    match url.find(['?', '#']) {
        Some(index) => url.split_at(index),
        None => (url, ""),
    }
}

/// Resolve `url` against the document URL `base`.
///
/// Rooted URLs are returned unchanged. Otherwise the last segment of `base`
/// is dropped unless `base` ends with `/`, and leading `./`, `../`, `.` and
/// `..` components of `url` are applied.
///
/// ```
/// use la_site::resolve_relative_url;
///
/// assert_eq!(resolve_relative_url("/subdir/", "otherpage"), "/subdir/otherpage");
/// assert_eq!(resolve_relative_url("/a/b/page", "../up"), "/a/up");
/// ```
#[must_use]
pub fn resolve_relative_url(base: &str, url: &str) -> String {
    if url.starts_with('/') {
        return url.to_owned();
    }

    let mut base = if base.ends_with('/') {
        base.to_owned()
    } else {
        dirname(base).to_owned()
    };

    let mut rest = url;
    loop {
        if let Some(tail) = rest.strip_prefix("../") {
            base = parent_dir(&base);
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("./") {
            rest = tail;
        } else if rest == ".." {
            base = parent_dir(&base);
            rest = "";
        } else if rest == "." {
            rest = "";
        } else {
            break;
        }
    }

    let base = base.strip_suffix('/').unwrap_or(&base);
    format!("{base}/{rest}")
}

/// Directory part of a URL path, ignoring trailing slashes.
fn dirname(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/",
        Some(index) => &trimmed[..index],
    }
}

fn parent_dir(base: &str) -> String {
    let parent = dirname(base);
    if parent.ends_with('/') {
        parent.to_owned()
    } else {
        format!("{parent}/")
    }
}
