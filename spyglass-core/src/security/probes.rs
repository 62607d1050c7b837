// Active HTTP probes run against every discovered target

use super::tables::*;
use super::{ProbeKind, ProbeSettings};
use crate::finding::{Finding, Severity};
use spyglass_scanner::{FetchFailure, FetchRequest, Fetcher};
use tracing::{debug, warn};
use url::Url;

/// Assigns `payload` to every known parameter, or to `q` when none are known.
pub fn build_param_map(params: &[String], payload: &str) -> Vec<(String, String)> {
    if params.is_empty() {
        return vec![(FALLBACK_PARAM.to_string(), payload.to_string())];
    }
    params
        .iter()
        .map(|param| (param.clone(), payload.to_string()))
        .collect()
}

fn request_failed(test: ProbeKind, url: &str, failure: FetchFailure) -> Vec<Finding> {
    warn!("{} probe request to {} failed: {}", test.as_str(), url, failure);
    vec![Finding::request_failed(test, url, failure)]
}

pub async fn check_sql_injection(
    fetcher: &dyn Fetcher,
    url: &str,
    params: &[String],
) -> Vec<Finding> {
    let request = FetchRequest::get(url).with_query(build_param_map(params, SQL_PAYLOAD));

    match fetcher.fetch(&request).await {
        Ok(response) => {
            let body = response.body.to_lowercase();
            if SQL_ERROR_SIGNATURES.iter().any(|sig| body.contains(sig)) {
                debug!("SQL error signature in response from {}", response.final_url);
                vec![Finding::new(
                    ProbeKind::SqlInjection,
                    Severity::High,
                    response.final_url,
                    "Database error signature detected",
                )]
            } else {
                Vec::new()
            }
        }
        Err(e) => request_failed(ProbeKind::SqlInjection, url, e),
    }
}

pub async fn check_reflected_xss(
    fetcher: &dyn Fetcher,
    url: &str,
    params: &[String],
) -> Vec<Finding> {
    let request = FetchRequest::get(url).with_query(build_param_map(params, XSS_PAYLOAD));

    match fetcher.fetch(&request).await {
        Ok(response) if response.body.contains(XSS_PAYLOAD) => vec![Finding::new(
            ProbeKind::Xss,
            Severity::High,
            response.final_url,
            "Payload reflected in response",
        )],
        Ok(_) => Vec::new(),
        Err(e) => request_failed(ProbeKind::Xss, url, e),
    }
}

pub async fn check_open_redirect(
    fetcher: &dyn Fetcher,
    url: &str,
    params: &[String],
) -> Vec<Finding> {
    let mut redirect_params: Vec<&str> = params
        .iter()
        .map(String::as_str)
        .filter(|param| REDIRECT_PARAM_NAMES.contains(&param.to_lowercase().as_str()))
        .collect();
    if redirect_params.is_empty() {
        redirect_params.push(DEFAULT_REDIRECT_PARAM);
    }

    let request = FetchRequest::get(url)
        .with_query(redirect_params.into_iter().map(|name| (name, REDIRECT_PAYLOAD)))
        .without_redirects();

    match fetcher.fetch(&request).await {
        Ok(response) => {
            let location = response.header("location").unwrap_or_default();
            if response.is_redirect() && location.contains(REDIRECT_PAYLOAD_HOST) {
                let evidence = format!("Redirected to external location: {}", location);
                vec![Finding::new(
                    ProbeKind::OpenRedirect,
                    Severity::Medium,
                    response.final_url.clone(),
                    evidence,
                )]
            } else {
                Vec::new()
            }
        }
        Err(e) => request_failed(ProbeKind::OpenRedirect, url, e),
    }
}

pub async fn check_security_headers(fetcher: &dyn Fetcher, url: &str) -> Vec<Finding> {
    match fetcher.fetch(&FetchRequest::get(url)).await {
        Ok(response) => REQUIRED_SECURITY_HEADERS
            .iter()
            .filter(|header| !response.has_header(header))
            .map(|header| {
                Finding::new(
                    ProbeKind::SecurityHeaders,
                    Severity::Medium,
                    url,
                    format!("Missing header: {}", header),
                )
            })
            .collect(),
        Err(e) => request_failed(ProbeKind::SecurityHeaders, url, e),
    }
}

pub async fn check_directory_traversal(
    fetcher: &dyn Fetcher,
    url: &str,
    params: &[String],
) -> Vec<Finding> {
    let mut candidates: Vec<&str> = params
        .iter()
        .map(String::as_str)
        .filter(|param| {
            let lowered = param.to_lowercase();
            TRAVERSAL_PARAM_HINTS.iter().any(|hint| lowered.contains(hint))
        })
        .collect();
    if candidates.is_empty() {
        candidates.push(DEFAULT_TRAVERSAL_PARAM);
    }

    let request = FetchRequest::get(url)
        .with_query(candidates.into_iter().map(|name| (name, TRAVERSAL_PAYLOAD)));

    match fetcher.fetch(&request).await {
        Ok(response) => {
            let lowered = response.body.to_lowercase();
            let leaked = TRAVERSAL_SIGNATURES.iter().any(|(sig, mode)| match mode {
                SignatureMatch::Exact => response.body.contains(sig),
                SignatureMatch::CaseInsensitive => lowered.contains(sig),
            });
            if leaked {
                vec![Finding::new(
                    ProbeKind::DirectoryTraversal,
                    Severity::High,
                    response.final_url,
                    "Sensitive file content signature detected",
                )]
            } else {
                Vec::new()
            }
        }
        Err(e) => request_failed(ProbeKind::DirectoryTraversal, url, e),
    }
}

pub async fn check_auth_exposure(fetcher: &dyn Fetcher, url: &str) -> Vec<Finding> {
    let request = FetchRequest::get(url).without_redirects();

    match fetcher.fetch(&request).await {
        Ok(response) => {
            let path = Url::parse(url)
                .map(|parsed| parsed.path().to_lowercase())
                .unwrap_or_default();
            let likely_protected = SENSITIVE_PATH_SEGMENTS
                .iter()
                .any(|segment| path.contains(segment));

            if likely_protected && response.status == 200 {
                vec![Finding::new(
                    ProbeKind::AuthRequiredEndpoint,
                    Severity::High,
                    url,
                    "Potentially sensitive path accessible without auth",
                )]
            } else {
                Vec::new()
            }
        }
        Err(e) => request_failed(ProbeKind::AuthRequiredEndpoint, url, e),
    }
}

pub async fn check_rate_limit(
    fetcher: &dyn Fetcher,
    url: &str,
    settings: &ProbeSettings,
) -> Vec<Finding> {
    let request = FetchRequest::get(url);
    let mut throttled = false;

    for _ in 0..settings.burst_requests.max(1) {
        match fetcher.fetch(&request).await {
            Ok(response) => throttled |= response.status == RATE_LIMITED_STATUS,
            Err(e) => return request_failed(ProbeKind::RateLimit, url, e),
        }
    }

    if throttled {
        Vec::new()
    } else {
        vec![Finding::new(
            ProbeKind::RateLimit,
            Severity::Medium,
            url,
            "No HTTP 429 observed during burst requests",
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_map_falls_back_to_q() {
        assert_eq!(
            build_param_map(&[], SQL_PAYLOAD),
            vec![("q".to_string(), SQL_PAYLOAD.to_string())]
        );
    }

    #[test]
    fn test_param_map_covers_every_param() {
        let params = vec!["id".to_string(), "name".to_string()];
        let map = build_param_map(&params, "x");

        assert_eq!(
            map,
            vec![
                ("id".to_string(), "x".to_string()),
                ("name".to_string(), "x".to_string()),
            ]
        );
    }
}
