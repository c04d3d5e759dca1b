//! Constants shared between the pipeline and the HTTP boundary.

/// Prefix of every JSON API route
pub const API_PREFIX: &str = "/api";

/// Route prefix under which the filesystem thumbnail root is served
pub const ASSETS_ROUTE: &str = "/assets";

/// Route prefix of the in-memory thumbnail lookup
pub const THUMBNAILS_ROUTE: &str = "/api/thumbnails";

/// Multipart field carrying the video file
pub const VIDEO_FORM_FIELD: &str = "video";

/// Multipart field carrying the thumbnail image
pub const THUMBNAIL_FORM_FIELD: &str = "thumbnail";

/// Extension of every published video object
pub const VIDEO_EXTENSION: &str = ".mp4";

/// Content type the published object is stored with
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Random bytes drawn per storage key (256 bits)
pub const KEY_RANDOM_BYTES: usize = 32;

/// Suffix of the remuxer's sibling output file
pub const REMUX_SUFFIX: &str = ".processing";

/// Route prefix under which the local object backend is served
pub const OBJECTS_ROUTE: &str = "/objects";

/// Signed-URL lifetime used when no explicit TTL is configured
pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 60;
