//! Constants used by the file and thumbnail managers.

/// Longest edge, in pixels, of a rendered thumbnail.
pub const THUMBNAIL_MAX_DIMENSION: u32 = 400;

/// Only every n-th frame of an animation is kept in its thumbnail.
pub const ANIMATION_FRAME_STRIDE: usize = 2;

/// External tool used to rasterise the first page of a PDF.
pub const PDF_RENDERER: &str = "pdftoppm";

/// Punctuation that separates words in a filename and becomes `-` in a stored name.
pub const NAME_SEPARATORS: &[char] = &['–', '—', '/', ':', ';', ',', '.', '_', ' '];

/// Hex characters of randomness in a thumbnail revision name (`<id>-<suffix>`).
pub const REVISION_SUFFIX_LEN: usize = 12;

/// Random revision names tried before giving up on storing a re-rendered thumbnail.
pub const REVISION_CLAIM_ATTEMPTS: usize = 8;
