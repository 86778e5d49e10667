//! Upload filename sanitization

/// Longest sanitized name kept, extension included
pub const MAX_FILENAME_LEN: usize = 120;

const FALLBACK: &str = "file";

/// Reduce a client-supplied file name to a safe, flat name.
///
/// Directory components are dropped, characters outside `[A-Za-z0-9._-]`
/// become `_`, runs of `_` collapse, leading dots are stripped and the
/// result is capped at [`MAX_FILENAME_LEN`] with the extension preserved.
#[must_use]
pub fn sanitize_filename(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let mut out = String::with_capacity(base.len());
    for c in base.chars() {
        let mapped = if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            c
        } else {
            '_'
        };
        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }

    let trimmed = out.trim_start_matches('.');
    if trimmed.is_empty() {
        return FALLBACK.to_string();
    }

    truncate_keeping_extension(trimmed, MAX_FILENAME_LEN)
}

/// Stored name that cannot collide with another upload
#[must_use]
pub fn stored_filename(prefix: impl std::fmt::Display, original: &str) -> String {
    format!("{prefix}-{}", sanitize_filename(original))
}

fn truncate_keeping_extension(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    // name is ASCII at this point, byte slicing is safe
    match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= 16 => {
            let ext = &name[dot..];
            let stem = &name[..max - ext.len()];
            format!("{stem}{ext}")
        }
        _ => name[..max].to_string(),
    }
}
