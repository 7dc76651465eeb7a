// src/discover/listing.rs
// =============================================================================
// Reads one directory listing page (the HTML an Apache/nginx autoindex
// produces) and classifies every anchor on it.
//
// Classification of an href:
// - ignored: parent/self markers ("../", "./", "Parent Directory"),
//   query-only targets ("?C=M;O=A" sort links), fragments, javascript:,
//   and anything that is not http(s) after resolution
// - directory: the href ends with '/', or the last path segment has no '.'
// - file: everything else
//
// Whether a file is *eligible* (extension allow-list) is a separate check,
// see has_allowed_extension().
// =============================================================================

use scraper::{Html, Selector};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

// One usable anchor from a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Absolute URL, fragment removed
    pub url: Url,
    pub kind: EntryKind,
}

// Extracts and classifies all anchors in a listing page
//
// Parameters:
//   html: the page body
//   page_url: the (canonical) URL the page was fetched from
//
// Example:
//   <a href="bro/">bro/</a>       -> Directory  https://host/cap/bro/
//   <a href="capture.pcap.netflow.labeled">  -> File
//   <a href="../">Parent Directory</a>      -> ignored
pub fn parse_listing(html: &str, page_url: &Url) -> Vec<ListingEntry> {
    let document = Html::parse_document(html);

    // "a[href]" is a constant selector, so parsing cannot fail
    let selector = Selector::parse("a[href]").expect("constant selector is valid");

    let mut entries = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        let text = element.text().collect::<String>();

        if is_navigation_marker(href, &text) {
            continue;
        }

        let Ok(mut url) = page_url.join(href) else {
            continue;
        };
        if url.scheme() != "http" && url.scheme() != "https" {
            continue;
        }
        url.set_fragment(None);

        let kind = if href.ends_with('/') || !last_segment(&url).contains('.') {
            EntryKind::Directory
        } else {
            EntryKind::File
        };

        entries.push(ListingEntry { url, kind });
    }

    entries
}

// True if the file's name ends with one of the allowed extensions
//
// Extensions are compared case-insensitively against the whole final
// segment, so ".labeled" matches "capture20110810.binetflow.labeled".
pub fn has_allowed_extension(url: &Url, allowed: &[String]) -> bool {
    let name = last_segment(url).to_ascii_lowercase();
    allowed.iter().any(|ext| name.ends_with(ext.as_str()))
}

// Final path segment ("" for a URL ending in '/')
pub fn last_segment(url: &Url) -> &str {
    url.path().rsplit('/').next().unwrap_or("")
}

// Anchors that never lead anywhere new
fn is_navigation_marker(href: &str, text: &str) -> bool {
    let text = text.trim().to_ascii_lowercase();
    let lower_href = href.to_ascii_lowercase();

    href.is_empty()
        || matches!(href, "../" | "./" | ".." | ".")
        || href.starts_with('?')
        || href.starts_with('#')
        || lower_href.starts_with("javascript:")
        || text == "parent directory"
        || text == "parent"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://mcfp.example.org/publicDatasets/CTU-1/").unwrap()
    }

    fn exts() -> Vec<String> {
        vec![".csv".to_string(), ".binetflow".to_string(), ".labeled".to_string()]
    }

    #[test]
    fn test_apache_autoindex_page() {
        let html = r#"
            <table>
              <tr><th><a href="?C=N;O=D">Name</a></th><th><a href="?C=M;O=A">Last modified</a></th></tr>
              <tr><td><a href="/publicDatasets/">Parent Directory</a></td></tr>
              <tr><td><a href="bro/">bro/</a></td></tr>
              <tr><td><a href="capture.binetflow">capture.binetflow</a></td></tr>
              <tr><td><a href="README">README</a></td></tr>
            </table>
        "#;
        let entries = parse_listing(html, &page());
        let urls: Vec<(&str, &EntryKind)> = entries.iter().map(|e| (e.url.as_str(), &e.kind)).collect();
        assert_eq!(
            urls,
            vec![
                ("https://mcfp.example.org/publicDatasets/CTU-1/bro/", &EntryKind::Directory),
                ("https://mcfp.example.org/publicDatasets/CTU-1/capture.binetflow", &EntryKind::File),
                ("https://mcfp.example.org/publicDatasets/CTU-1/README", &EntryKind::Directory),
            ]
        );
    }

    #[test]
    fn test_skips_markers_and_pseudo_urls() {
        let html = r##"
            <a href="../">../</a>
            <a href="./">.</a>
            <a href="#top">top</a>
            <a href="javascript:void(0)">js</a>
            <a href="mailto:admin@example.org">mail</a>
            <a href="">empty</a>
        "##;
        assert!(parse_listing(html, &page()).is_empty());
    }

    #[test]
    fn test_fragment_removed() {
        let html = r#"<a href="a.csv#row2">a.csv</a>"#;
        let entries = parse_listing(html, &page());
        assert_eq!(entries[0].url.as_str(), "https://mcfp.example.org/publicDatasets/CTU-1/a.csv");
        assert_eq!(entries[0].kind, EntryKind::File);
    }

    #[test]
    fn test_allowed_extension_is_case_insensitive_suffix() {
        let allowed = exts();
        let url = |s: &str| Url::parse(s).unwrap();
        assert!(has_allowed_extension(&url("https://h/c/Flows.CSV"), &allowed));
        assert!(has_allowed_extension(&url("https://h/c/x.binetflow.labeled"), &allowed));
        assert!(!has_allowed_extension(&url("https://h/c/index.php"), &allowed));
        assert!(!has_allowed_extension(&url("https://h/c/capture.pcap"), &allowed));
    }
}
