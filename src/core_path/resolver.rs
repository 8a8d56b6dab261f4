use crate::core_auth::AuthContext;
use crate::core_error::{Result, VfsError};
use crate::core_path::Platform;
use log::{debug, trace};
use percent_encoding::percent_decode_str;
use std::path::Path;

const FILE_SCHEME: &str = "file://";

/// Replaces every `\` with `/`.
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

/// Strips a `file://` scheme and percent-decodes what is left.
///
/// A drive-letter form such as `file:///C:/data` loses the extra slash too.
/// Strings that do not start with the scheme are returned untouched, and a
/// malformed escape leaves the stripped string undecoded.
pub fn path_from_uri(uri: &str) -> String {
    if !uri.starts_with(FILE_SCHEME) {
        return uri.to_string();
    }
    let bytes = uri.as_bytes();
    let mut to_remove = FILE_SCHEME.len();
    if bytes.get(7) == Some(&b'/') && bytes.get(9) == Some(&b':') {
        to_remove += 1;
    }
    let path = &uri[to_remove..];
    if !path.contains('%') {
        return path.to_string();
    }
    match url_decode(path) {
        Some(decoded) => decoded,
        None => {
            debug!("Not url-encoded, keeping raw path: {}", path);
            path.to_string()
        }
    }
}

// Form decoding: '+' is a space, every '%' must introduce two hex digits.
fn url_decode(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let high = bytes.get(i + 1)?;
            let low = bytes.get(i + 2)?;
            if !high.is_ascii_hexdigit() || !low.is_ascii_hexdigit() {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    let spaced = raw.replace('+', " ");
    Some(percent_decode_str(&spaced).decode_utf8_lossy().into_owned())
}

/// Legacy absolute-path predicate.
///
/// On POSIX a path only counts as absolute when its parent is an existing
/// absolute directory other than `/` itself, so `/x` is never absolute while
/// `/x/y` is (if `/x` exists). Windows defers to the native rule.
pub fn is_absolute(path: &str, platform: &Platform) -> bool {
    let file = Path::new(path);
    if !platform.is_unix() {
        return file.is_absolute();
    }
    let absolute = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.is_absolute() && parent.is_dir() && parent != Path::new("/")
        }
        _ => false,
    };
    trace!("isAbsolute: {} -> {}", path, absolute);
    absolute
}

/// Resolves `.` and `..` segments.
///
/// On POSIX this is purely lexical: symbolic links are never followed and a
/// `..` with no segment left to remove is dropped. The result is always
/// rooted, `/` when nothing remains.
pub fn canonicalize(path: &str, platform: &Platform) -> String {
    if platform.is_unix() {
        return lexical_canonical(path);
    }
    match dunce::canonicalize(path) {
        Ok(canonical) => canonical.to_string_lossy().into_owned(),
        Err(_) => std::path::absolute(path)
            .map(|absolute| absolute.to_string_lossy().into_owned())
            .unwrap_or_else(|_| path.to_string()),
    }
}

fn lexical_canonical(path: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                kept.pop();
            }
            name => kept.push(name),
        }
    }
    if kept.is_empty() {
        return "/".to_string();
    }
    format!("/{}", kept.join("/"))
}

/// Canonicalizes a real path and translates it into a business path,
/// failing unless the result stays inside the session's sandbox.
pub fn validate(real_path: &str, auth: &AuthContext, platform: &Platform) -> Result<String> {
    let canonical = normalize(&canonicalize(real_path, platform));
    if !auth.contains_real_path(&canonical) {
        debug!("Path outside mount point: {} (from {})", canonical, real_path);
        return Err(VfsError::PathOutsideSandbox(canonical));
    }
    let business = auth.to_relative(&canonical);
    if auth.is_business_path_valid(&business) {
        trace!("final path: {}", business);
        return Ok(business);
    }
    debug!("Path rejected: {} (from {})", business, real_path);
    Err(VfsError::PathOutsideSandbox(business))
}

/// True when `path` holds one of the wildcard characters `*`, `?` or `~`.
pub fn has_wildcard(path: &str) -> bool {
    path.contains(['*', '?', '~'])
}
