//! Stored-name derivation
//!
//! Turns a user-supplied filename into a name that is safe on any filesystem and
//! readable by a human browsing the store: ASCII only, lowercase, words joined by `-`.

use crate::constants::NAME_SEPARATORS;
use crate::sniff::FileFormat;

/// Splits a filename into its stem and extension.
///
/// Any directory components are discarded. A leading dot does not start an
/// extension (`.profile` has no extension), matching the usual `splitext` rules.
pub fn split_filename(filename: &str) -> (&str, Option<&str>) {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Transliterates a filename stem into a safe stored name.
///
/// Returns `None` when nothing usable survives, e.g. for `"|"` or `"---"`.
///
/// ```
/// use docstore_files::naming::slugify;
///
/// assert_eq!(slugify("Çingleton").as_deref(), Some("cingleton"));
/// assert_eq!(slugify("Annual report: 2019").as_deref(), Some("annual-report-2019"));
/// assert_eq!(slugify("|"), None);
/// ```
pub fn slugify(stem: &str) -> Option<String> {
    let separated: String = stem
        .chars()
        .map(|c| if NAME_SEPARATORS.contains(&c) { '-' } else { c })
        .collect();

    let ascii = deunicode::deunicode(&separated).to_lowercase();

    let mut slug = String::with_capacity(ascii.len());
    for c in ascii.chars() {
        let c = match c {
            'a'..='z' | '0'..='9' => c,
            '-' | ' ' => '-',
            _ => continue,
        };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }

    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        None
    } else {
        Some(slug.to_owned())
    }
}

/// Returns the extension implied by a filename, lowercased.
///
/// Extensions containing anything other than ASCII letters and digits are ignored.
pub fn filename_extension(filename: &str) -> Option<String> {
    let (_, extension) = split_filename(filename);
    extension
        .filter(|ext| ext.bytes().all(|b| b.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
}

/// Picks the extension for a buffer: the sniffed format's if recognised, otherwise
/// the one from `original_filename`, otherwise none.
pub fn detect_extension(buffer: &[u8], original_filename: Option<&str>) -> Option<String> {
    if let Some(format) = FileFormat::sniff(buffer) {
        return Some(format.extension().to_owned());
    }
    original_filename.and_then(filename_extension)
}
