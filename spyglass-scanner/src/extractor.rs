use crate::surface::Form;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::trace;
use url::Url;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));
static FORM_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form").expect("static selector"));
static INPUT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[name]").expect("static selector"));

/// Output of one extraction pass over a page body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Absolute, fragment-free link targets in document order.
    pub links: Vec<Url>,
    pub forms: Vec<Form>,
    /// Query parameter names from the page URL, every link and every action.
    pub query_params: Vec<String>,
}

/// Pulls links, forms and query parameter names out of a response body.
///
/// Extraction is best effort: malformed markup or missing attributes yield
/// less data, never an error.
pub trait Extractor: Send + Sync {
    fn extract_links(&self, base: &Url, body: &str) -> Vec<Url>;

    fn extract_forms(&self, base: &Url, body: &str) -> Vec<Form>;

    fn extract_query_params(&self, base: &Url, links: &[Url], forms: &[Form]) -> Vec<String> {
        let actions = forms.iter().filter_map(|form| Url::parse(&form.action).ok());
        let mut seen = BTreeSet::new();
        std::iter::once(base.clone())
            .chain(links.iter().cloned())
            .chain(actions)
            .flat_map(|url| {
                url.query_pairs()
                    .map(|(name, _)| name.into_owned())
                    .collect::<Vec<_>>()
            })
            .filter(|name| !name.is_empty() && seen.insert(name.clone()))
            .collect()
    }

    fn extract(&self, base: &Url, body: &str) -> Extraction {
        let links = self.extract_links(base, body);
        let forms = self.extract_forms(base, body);
        let query_params = self.extract_query_params(base, &links, &forms);
        Extraction {
            links,
            forms,
            query_params,
        }
    }
}

/// [`Extractor`] backed by the `scraper` HTML5 parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }

    fn links_in(document: &Html, base: &Url) -> Vec<Url> {
        document
            .select(&LINK_SELECTOR)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| resolve_url(base, href))
            .collect()
    }

    fn forms_in(document: &Html, base: &Url) -> Vec<Form> {
        document
            .select(&FORM_SELECTOR)
            .map(|form| Self::form_record(form, base))
            .collect()
    }

    fn form_record(form: ElementRef<'_>, base: &Url) -> Form {
        let mut page = base.clone();
        page.set_fragment(None);

        let action = form
            .value()
            .attr("action")
            .map(str::trim)
            .filter(|action| !action.is_empty())
            .and_then(|action| join_without_fragment(base, action))
            .unwrap_or_else(|| page.clone());

        let method = form
            .value()
            .attr("method")
            .map(str::trim)
            .filter(|method| !method.is_empty())
            .map(str::to_uppercase)
            .unwrap_or_else(|| "GET".to_string());

        let inputs = form
            .select(&INPUT_SELECTOR)
            .filter_map(|input| input.value().attr("name"))
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();

        Form {
            page: page.to_string(),
            action: action.to_string(),
            method,
            inputs,
        }
    }
}

impl Extractor for HtmlExtractor {
    fn extract_links(&self, base: &Url, body: &str) -> Vec<Url> {
        Self::links_in(&Html::parse_document(body), base)
    }

    fn extract_forms(&self, base: &Url, body: &str) -> Vec<Form> {
        Self::forms_in(&Html::parse_document(body), base)
    }

    // Parse once instead of once per capability.
    fn extract(&self, base: &Url, body: &str) -> Extraction {
        let document = Html::parse_document(body);
        let links = Self::links_in(&document, base);
        let forms = Self::forms_in(&document, base);
        let query_params = self.extract_query_params(base, &links, &forms);
        trace!(
            "Extracted {} links, {} forms, {} params from {}",
            links.len(),
            forms.len(),
            query_params.len(),
            base
        );
        Extraction {
            links,
            forms,
            query_params,
        }
    }
}

fn resolve_url(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    let lowered = href.to_ascii_lowercase();
    // Skip empty, javascript:, mailto:, tel:, data: and in-page anchors
    if href.is_empty()
        || href.starts_with('#')
        || lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    join_without_fragment(base, href)
}

fn join_without_fragment(base: &Url, reference: &str) -> Option<Url> {
    let mut resolved = base.join(reference).ok()?;
    resolved.set_fragment(None);
    Some(resolved)
}

/// Same-origin check used to split internal links from external ones.
pub fn is_internal(link: &Url, origin: &url::Origin) -> bool {
    &link.origin() == origin
}
