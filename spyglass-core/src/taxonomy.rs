use std::collections::BTreeSet;

/// One named attack class in the coverage taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackClass {
    pub id: &'static str,
    pub category: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

const fn class(
    id: &'static str,
    category: &'static str,
    name: &'static str,
    description: &'static str,
) -> AttackClass {
    AttackClass {
        id,
        category,
        name,
        description,
    }
}

/// Baseline attack classes across web, API, auth, runtime and abuse scenarios.
pub const ATTACK_TAXONOMY: &[AttackClass] = &[
    // Access control / identity
    class(
        "AC-01",
        "access-control",
        "Broken object level authorization (IDOR)",
        "Accessing objects across tenant/user boundaries.",
    ),
    class(
        "AC-02",
        "access-control",
        "Broken function level authorization",
        "Calling privileged endpoints as low-privilege user.",
    ),
    class(
        "AC-03",
        "access-control",
        "Mass assignment",
        "Overposting hidden/protected fields in payloads.",
    ),
    class(
        "AC-04",
        "access-control",
        "Privilege escalation",
        "Escalating from user to admin/system roles.",
    ),
    // Authentication / sessions
    class(
        "AU-01",
        "authentication",
        "Credential stuffing",
        "Automated login attempts with breached credentials.",
    ),
    class("AU-02", "authentication", "Brute force", "Password/PIN guessing at auth endpoints."),
    class(
        "AU-03",
        "authentication",
        "Session fixation",
        "Forcing predictable/predefined session IDs.",
    ),
    class("AU-04", "authentication", "Session replay", "Reusing stolen tokens/cookies."),
    class(
        "AU-05",
        "authentication",
        "JWT/token tampering",
        "Manipulating algorithm, claims, signature, expiry, audience.",
    ),
    class("AU-06", "authentication", "MFA bypass", "Bypassing/abusing second-factor flow."),
    // Injection family
    class(
        "IN-01",
        "injection",
        "SQL injection",
        "Injecting SQL via parameters, headers, or JSON bodies.",
    ),
    class("IN-02", "injection", "NoSQL injection", "Injecting query operators or JSON conditions."),
    class(
        "IN-03",
        "injection",
        "Command injection",
        "Executing shell/system commands through unsanitized input.",
    ),
    class(
        "IN-04",
        "injection",
        "Server-side template injection",
        "Injecting template expressions for code execution.",
    ),
    class("IN-05", "injection", "LDAP/XPath injection", "Injecting directory/query expressions."),
    class(
        "IN-06",
        "injection",
        "CRLF/header injection",
        "Injecting response headers or splitting responses.",
    ),
    // XSS / browser-side
    class(
        "XS-01",
        "client-side",
        "Reflected XSS",
        "Script injection reflected from request to response.",
    ),
    class("XS-02", "client-side", "Stored XSS", "Persistent script payloads rendered to users."),
    class("XS-03", "client-side", "DOM XSS", "Client-side sink misuse in JavaScript."),
    class("XS-04", "client-side", "CSRF", "Cross-site requests exploiting ambient auth."),
    class(
        "XS-05",
        "client-side",
        "Clickjacking",
        "UI redressing using iframes and missing frame controls.",
    ),
    // File / deserialization
    class(
        "FD-01",
        "file-handling",
        "Path traversal",
        "Reading/writing files outside allowed paths.",
    ),
    class(
        "FD-02",
        "file-handling",
        "Unsafe file upload",
        "Uploading executable or polyglot payloads.",
    ),
    class(
        "FD-03",
        "file-handling",
        "Insecure deserialization",
        "Triggering gadget chains / object abuse.",
    ),
    class("FD-04", "file-handling", "XXE", "XML external entity processing abuse."),
    // Server-side / network
    class(
        "SV-01",
        "server-side",
        "SSRF",
        "Forcing server to fetch internal or metadata endpoints.",
    ),
    class("SV-02", "server-side", "Open redirect", "Abusing redirection for phishing/token theft."),
    class(
        "SV-03",
        "server-side",
        "CORS misconfiguration",
        "Overly permissive origins/credentials.",
    ),
    class(
        "SV-04",
        "server-side",
        "HTTP request smuggling",
        "Desyncing front-end/back-end parsers.",
    ),
    class(
        "SV-05",
        "server-side",
        "Host header injection",
        "Abusing trust in Host/X-Forwarded headers.",
    ),
    // Cryptography / secrets / data exposure
    class(
        "CR-01",
        "crypto-data",
        "Weak cryptography",
        "Deprecated algorithms, bad modes, short keys.",
    ),
    class(
        "CR-02",
        "crypto-data",
        "Sensitive data exposure",
        "PII/secret leakage in responses/logs/errors.",
    ),
    class(
        "CR-03",
        "crypto-data",
        "Secrets in source/control plane",
        "Hardcoded keys, tokens, credentials.",
    ),
    class(
        "CR-04",
        "crypto-data",
        "TLS misconfiguration",
        "Weak ciphers/protocols or invalid certificate handling.",
    ),
    // Availability / abuse
    class(
        "AV-01",
        "availability",
        "Rate-limit bypass",
        "Evading throttling with distributed identities/IPs.",
    ),
    class(
        "AV-02",
        "availability",
        "Application-level DoS",
        "Expensive query/payload amplification abuse.",
    ),
    class(
        "AV-03",
        "availability",
        "Race condition",
        "Winning concurrency window in critical operations.",
    ),
    // Supply chain / config / operations
    class(
        "OP-01",
        "operations",
        "Vulnerable dependency",
        "Known CVEs in direct/transitive packages.",
    ),
    class(
        "OP-02",
        "operations",
        "Security misconfiguration",
        "Debug mode, default creds, unsafe headers.",
    ),
    class(
        "OP-03",
        "operations",
        "Insufficient logging/monitoring",
        "No audit trail for critical events.",
    ),
    class(
        "OP-04",
        "operations",
        "CI/CD artifact poisoning",
        "Tampering build dependencies or release artifacts.",
    ),
];

pub fn taxonomy_ids() -> BTreeSet<&'static str> {
    ATTACK_TAXONOMY.iter().map(|attack| attack.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_eq!(taxonomy_ids().len(), ATTACK_TAXONOMY.len());
        assert_eq!(ATTACK_TAXONOMY.len(), 41);
    }

    #[test]
    fn test_sql_injection_class() {
        let sqli = ATTACK_TAXONOMY
            .iter()
            .find(|attack| attack.id == "IN-01")
            .unwrap();
        assert_eq!(sqli.name, "SQL injection");
        assert_eq!(sqli.category, "injection");
        assert!(!taxonomy_ids().contains("ZZ-99"));
    }
}
