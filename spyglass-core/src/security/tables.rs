// Payloads and detection heuristics shared by the probes

pub const SQL_PAYLOAD: &str = "' OR '1'='1";
pub const XSS_PAYLOAD: &str = "<script>alert('xss')</script>";
pub const TRAVERSAL_PAYLOAD: &str = "../../../../etc/passwd";
pub const REDIRECT_PAYLOAD: &str = "https://evil.example.com";
pub const REDIRECT_PAYLOAD_HOST: &str = "evil.example.com";

/// Parameter name used when a probe knows no parameters at all.
pub const FALLBACK_PARAM: &str = "q";
pub const DEFAULT_REDIRECT_PARAM: &str = "next";
pub const DEFAULT_TRAVERSAL_PARAM: &str = "file";

pub const DEFAULT_BURST_REQUESTS: usize = 12;

/// Lower-case substrings of database error pages.
pub const SQL_ERROR_SIGNATURES: &[&str] = &[
    "sql syntax",
    "warning: mysql",
    "unclosed quotation mark",
    "psql",
    "sqlite",
    "odbc",
];

/// Matched case-insensitively against the whole parameter name.
pub const REDIRECT_PARAM_NAMES: &[&str] = &["next", "url", "redirect", "return", "return_to"];

/// Matched case-insensitively as substrings of the parameter name.
pub const TRAVERSAL_PARAM_HINTS: &[&str] = &["file", "path", "dir", "folder", "template"];

pub enum SignatureMatch {
    Exact,
    CaseInsensitive,
}

pub const TRAVERSAL_SIGNATURES: &[(&str, SignatureMatch)] = &[
    ("root:x:", SignatureMatch::Exact),
    ("[boot loader]", SignatureMatch::CaseInsensitive),
];

pub const SENSITIVE_PATH_SEGMENTS: &[&str] = &[
    "admin",
    "account",
    "profile",
    "settings",
    "billing",
    "dashboard",
];

pub const REQUIRED_SECURITY_HEADERS: &[&str] = &[
    "Content-Security-Policy",
    "X-Frame-Options",
    "X-Content-Type-Options",
    "Strict-Transport-Security",
];

pub const RATE_LIMITED_STATUS: u16 = 429;
