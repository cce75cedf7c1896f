// sensitivity.rs - Sensitive Object Heuristic
// Purpose: Flag discovered objects whose name or leading content suggests
//          configuration, credentials, or data dumps

/// Extensions matched anywhere in the lowercase file name
pub const SENSITIVE_EXTENSIONS: &[&str] = &[".env", ".sql", ".json", ".xml", ".yml", ".yaml"];

/// Keywords matched in the lowercase content prefix
pub const SENSITIVE_KEYWORDS: &[&str] = &[
    "password", "secret", "key", "token", "credential",
    "database", "connection", "mysql", "postgres", "mongodb",
    "api_key", "private_key", "access_token", "bearer",
    "smtp_", "mail_", "email_password",
];

/// Characters of content inspected for keywords
pub const CONTENT_SCAN_LIMIT: usize = 1000;

pub fn is_sensitive(filename: &str, content: &str) -> bool {
    has_sensitive_extension(filename) || sensitive_keyword(content).is_some()
}

pub fn has_sensitive_extension(filename: &str) -> bool {
    let name = filename.to_lowercase();
    SENSITIVE_EXTENSIONS.iter().any(|ext| name.contains(ext))
}

/// First keyword found in the scanned prefix of `content`
pub fn sensitive_keyword(content: &str) -> Option<&'static str> {
    let prefix: String = content.chars().take(CONTENT_SCAN_LIMIT).collect();
    let prefix = prefix.to_lowercase();

    SENSITIVE_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| prefix.contains(keyword))
}
