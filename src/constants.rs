// MIT License

//! Protocol constants for the Paradox IP module's web interface.
//!
//! The module serves a fixed set of pages over plain HTTP (lwIP firmware).
//! All status data is embedded as JavaScript literal arrays inside the HTML,
//! so the scrape markers below are part of the wire contract.

/// Login landing page; carries the session token and lockout notices.
pub const PAGE_LOGIN: &str = "login_page.html";

/// Authenticated entry page; takes the derived `u`/`p` query parameters.
pub const PAGE_AUTH: &str = "default.html";

/// Module-initialization progress page, polled until ready.
pub const PAGE_WAIT: &str = "waitlive.html";

/// Landing page carrying the area/zone name tables.
pub const PAGE_INDEX: &str = "index.html";

/// Live status page; also accepts `?area=NN&value=X` arm requests.
pub const PAGE_STATUS: &str = "statuslive.html";

/// Session teardown page. The response body is encoded and is not inspected.
pub const PAGE_LOGOUT: &str = "logout.html";

/// Session tokens issued by the module are always 16 characters.
pub const SESSION_TOKEN_LEN: usize = 16;

/// Login page notice emitted once the per-device attempt ceiling is hit.
pub const MSG_ATTEMPT_CEILING: &str = "Maximum number of attempts reached.";

/// Marker pair surrounding the name of an already-logged-in user.
pub const MARKER_LOGGED_USER_PREFIX: &str = "top.cant('";
pub const MARKER_LOGGED_USER_SUFFIX: &str = "');";

/// Marker pair surrounding the session token on the login page.
pub const MARKER_SESSION_TOKEN_PREFIX: &str = "loginaff(\"";
pub const MARKER_SESSION_TOKEN_SUFFIX: &str = "\",";

/// Marker pair surrounding the area name table on the landing page.
pub const MARKER_AREA_NAMES_PREFIX: &str = "tbl_areanam = new Array(";

/// Marker pair surrounding the zone name table on the landing page.
pub const MARKER_ZONE_NAMES_PREFIX: &str = "tbl_zone = new Array(";

/// Marker pair surrounding the per-area status codes on the status page.
pub const MARKER_AREA_STATUS_PREFIX: &str = "tbl_useraccess = new Array(";

/// Marker pair surrounding the per-zone status codes on the status page.
pub const MARKER_ZONE_STATUS_PREFIX: &str = "tbl_statuszone = new Array(";

/// Common closing marker for all embedded arrays.
pub const MARKER_ARRAY_SUFFIX: &str = ");";

/// Marker pair surrounding the initialization stage on the wait page.
pub const MARKER_INIT_STAGE_PREFIX: &str = "var prg=";
pub const MARKER_INIT_STAGE_SUFFIX: &str = ";";

/// Initialization stage value that signals the module is ready.
pub const INIT_STAGE_READY: u32 = 4;
