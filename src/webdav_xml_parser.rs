use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use std::str;
use tracing::debug;
use url::Url;

/// One entry of a PROPFIND multi-status document.
#[derive(Debug, Clone, PartialEq)]
pub struct WebDAVItem {
    /// Percent-decoded last path segment of the href
    pub name: String,
    /// The raw href exactly as the server sent it
    pub path: String,
    pub display_name: Option<String>,
    pub size: u64,
    pub content_type: Option<String>,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub is_directory: bool,
    pub url: Url,
}

impl WebDAVItem {
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Default)]
struct PropFindResponse {
    href: String,
    displayname: String,
    content_length: Option<u64>,
    content_type: Option<String>,
    creation_date: Option<String>,
    last_modified: Option<String>,
    is_collection: bool,
}

/// Parses a depth-1 PROPFIND response into a flat list of items.
///
/// Element prefixes are ignored (`D:href`, `d:href` and an unprefixed default
/// namespace all match) and local names are compared case-insensitively.
/// Entries whose href is missing or cannot be resolved against `base_url` are
/// dropped. When `guess_mime` is set, files without a `getcontenttype` get a
/// type guessed from their extension.
pub fn parse_propfind_response(xml_text: &str, base_url: &Url, guess_mime: bool) -> Result<Vec<WebDAVItem>> {
    let mut reader = Reader::from_str(xml_text);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current_response = PropFindResponse::default();
    let mut current_element = String::new();
    let mut in_response = false;
    let mut in_resourcetype = false;

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = get_local_name(&e)?;

                match name.as_str() {
                    "response" => {
                        in_response = true;
                        current_response = PropFindResponse::default();
                    }
                    "resourcetype" => {
                        in_resourcetype = true;
                    }
                    "collection" if in_resourcetype => {
                        current_response.is_collection = true;
                    }
                    _ => {
                        current_element = name;
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = get_local_name(&e)?;
                if name == "collection" && in_resourcetype {
                    current_response.is_collection = true;
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape()?;
                let text = text.trim();

                if in_response && !text.is_empty() {
                    match current_element.as_str() {
                        "href" => {
                            current_response.href = text.to_string();
                        }
                        "displayname" => {
                            current_response.displayname = text.to_string();
                        }
                        "getcontentlength" => {
                            current_response.content_length = text.parse().ok();
                        }
                        "getcontenttype" => {
                            current_response.content_type = Some(text.to_string());
                        }
                        "creationdate" => {
                            current_response.creation_date = Some(text.to_string());
                        }
                        "getlastmodified" => {
                            current_response.last_modified = Some(text.to_string());
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = get_local_name_from_end(&e)?;

                match name.as_str() {
                    "response" => {
                        let resp = std::mem::take(&mut current_response);
                        if let Some(item) = finalize_response(resp, base_url, guess_mime) {
                            items.push(item);
                        }
                        in_response = false;
                        in_resourcetype = false;
                    }
                    "resourcetype" => {
                        in_resourcetype = false;
                    }
                    _ => {}
                }

                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("XML parsing error: {}", e)),
            _ => {}
        }

        buf.clear();
    }

    Ok(items)
}

fn finalize_response(resp: PropFindResponse, base_url: &Url, guess_mime: bool) -> Option<WebDAVItem> {
    if resp.href.is_empty() {
        debug!("Dropping PROPFIND entry without href");
        return None;
    }

    let url = match base_url.join(&resp.href) {
        Ok(url) => url,
        Err(e) => {
            debug!("Dropping PROPFIND entry with unresolvable href '{}': {}", resp.href, e);
            return None;
        }
    };

    let name = last_segment(&resp.href);

    let content_type = match resp.content_type {
        Some(ct) => Some(ct),
        None if guess_mime && !resp.is_collection => mime_guess::from_path(&name)
            .first()
            .map(|mime| mime.essence_str().to_string()),
        None => None,
    };

    let created = resp.creation_date.as_deref().and_then(parse_http_date);
    let modified = resp.last_modified.as_deref().and_then(parse_http_date);

    Some(WebDAVItem {
        name,
        path: resp.href,
        display_name: Some(resp.displayname).filter(|s| !s.is_empty()),
        size: resp.content_length.unwrap_or(0),
        content_type,
        created_date: created.or(modified).unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        modified_date: modified.or(created).unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        is_directory: resp.is_collection,
        url,
    })
}

/// Last non-empty path segment of an href, percent-decoded.
fn last_segment(href: &str) -> String {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let segment = path
        .split('/')
        .filter(|s| !s.is_empty())
        .last()
        .unwrap_or(path);

    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

fn get_local_name(e: &BytesStart) -> Result<String> {
    let qname = e.name();
    let local = qname.local_name();
    let name = str::from_utf8(local.as_ref())
        .map_err(|e| anyhow!("Invalid UTF-8 in element name: {}", e))?;
    Ok(name.to_ascii_lowercase())
}

fn get_local_name_from_end(e: &BytesEnd) -> Result<String> {
    let qname = e.name();
    let local = qname.local_name();
    let name = str::from_utf8(local.as_ref())
        .map_err(|e| anyhow!("Invalid UTF-8 in element name: {}", e))?;
    Ok(name.to_ascii_lowercase())
}

fn parse_http_date(date_str: &str) -> Option<DateTime<Utc>> {
    if date_str.is_empty() {
        return None;
    }

    // getlastmodified is RFC 1123, creationdate is RFC 3339
    DateTime::parse_from_rfc2822(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            DateTime::parse_from_rfc3339(date_str)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(date_str, "%a, %d %b %Y %H:%M:%S GMT")
                .ok()
                .map(|ndt| DateTime::from_naive_utc_and_offset(ndt, Utc))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> Url {
        Url::parse("https://dav.example.com/").unwrap()
    }

    #[test]
    fn test_parse_simple_propfind() {
        let xml = r#"<?xml version="1.0"?>
        <d:multistatus xmlns:d="DAV:">
            <d:response>
                <d:href>/photos/beach.jpg</d:href>
                <d:propstat>
                    <d:prop>
                        <d:displayname>beach.jpg</d:displayname>
                        <d:getcontentlength>1024</d:getcontentlength>
                        <d:getlastmodified>Mon, 01 Jan 2024 12:00:00 GMT</d:getlastmodified>
                        <d:creationdate>2023-12-31T08:30:00Z</d:creationdate>
                        <d:getcontenttype>image/jpeg</d:getcontenttype>
                        <d:resourcetype/>
                    </d:prop>
                    <d:status>HTTP/1.1 200 OK</d:status>
                </d:propstat>
            </d:response>
        </d:multistatus>"#;

        let items = parse_propfind_response(xml, &base(), false).unwrap();
        assert_eq!(items.len(), 1);

        let item = &items[0];
        assert_eq!(item.name, "beach.jpg");
        assert_eq!(item.path, "/photos/beach.jpg");
        assert_eq!(item.display_name.as_deref(), Some("beach.jpg"));
        assert_eq!(item.size, 1024);
        assert_eq!(item.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(item.url.as_str(), "https://dav.example.com/photos/beach.jpg");
        assert_eq!(item.modified_date, Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        assert_eq!(item.created_date, Utc.with_ymd_and_hms(2023, 12, 31, 8, 30, 0).unwrap());
        assert!(!item.is_directory);
        assert!(item.is_image());
    }

    #[test]
    fn test_uppercase_prefix_and_directories() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
        <D:multistatus xmlns:D="DAV:">
            <D:response>
                <D:href>/photos/</D:href>
                <D:propstat>
                    <D:prop>
                        <D:resourcetype><D:collection/></D:resourcetype>
                    </D:prop>
                </D:propstat>
            </D:response>
            <D:response>
                <D:href>/photos/Vacation/</D:href>
                <D:propstat>
                    <D:prop>
                        <D:resourcetype>
                            <D:collection/>
                        </D:resourcetype>
                    </D:prop>
                </D:propstat>
            </D:response>
            <D:response>
                <D:href>/photos/notes.txt</D:href>
                <D:propstat>
                    <D:prop>
                        <D:getcontenttype>text/plain</D:getcontenttype>
                        <D:getcontentlength>12</D:getcontentlength>
                        <D:resourcetype/>
                    </D:prop>
                </D:propstat>
            </D:response>
        </D:multistatus>"#;

        let items = parse_propfind_response(xml, &base(), false).unwrap();
        assert_eq!(items.len(), 3);

        assert!(items[0].is_directory);
        assert_eq!(items[0].name, "photos");
        assert!(items[1].is_directory);
        assert_eq!(items[1].name, "Vacation");
        assert_eq!(items[1].url.as_str(), "https://dav.example.com/photos/Vacation/");
        assert!(!items[2].is_directory);
        assert!(!items[2].is_image());
        assert_eq!(items[2].size, 12);
    }

    #[test]
    fn test_mixed_prefixes_in_one_document() {
        let xml = r#"<?xml version="1.0"?>
        <D:multistatus xmlns:D="DAV:" xmlns:d="DAV:">
            <D:response>
                <D:href>/a.png</D:href>
                <D:propstat><D:prop><D:getcontenttype>image/png</D:getcontenttype></D:prop></D:propstat>
            </D:response>
            <d:response>
                <d:href>/b.png</d:href>
                <d:propstat><d:prop><d:getcontenttype>image/png</d:getcontenttype></d:prop></d:propstat>
            </d:response>
        </D:multistatus>"#;

        let items = parse_propfind_response(xml, &base(), false).unwrap();
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
        assert!(items.iter().all(|i| i.is_image()));
    }

    #[test]
    fn test_unprefixed_default_namespace() {
        let xml = r#"<?xml version="1.0"?>
        <multistatus xmlns="DAV:">
            <response>
                <href>/c.gif</href>
                <propstat><prop><getcontenttype>image/gif</getcontenttype></prop></propstat>
            </response>
        </multistatus>"#;

        let items = parse_propfind_response(xml, &base(), false).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content_type.as_deref(), Some("image/gif"));
    }

    #[test]
    fn test_entries_without_href_are_dropped() {
        let xml = r#"<?xml version="1.0"?>
        <d:multistatus xmlns:d="DAV:">
            <d:response>
                <d:propstat><d:prop><d:getcontenttype>image/jpeg</d:getcontenttype></d:prop></d:propstat>
            </d:response>
            <d:response>
                <d:href>   </d:href>
            </d:response>
            <d:response>
                <d:href>/kept.jpg</d:href>
                <d:propstat><d:prop><d:getcontenttype>image/jpeg</d:getcontenttype></d:prop></d:propstat>
            </d:response>
        </d:multistatus>"#;

        let items = parse_propfind_response(xml, &base(), false).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "kept.jpg");
    }

    #[test]
    fn test_state_resets_between_entries() {
        let xml = r#"<?xml version="1.0"?>
        <d:multistatus xmlns:d="DAV:">
            <d:response>
                <d:href>/dir/</d:href>
                <d:propstat><d:prop>
                    <d:getcontentlength>99</d:getcontentlength>
                    <d:getcontenttype>httpd/unix-directory</d:getcontenttype>
                    <d:resourcetype><d:collection/></d:resourcetype>
                </d:prop></d:propstat>
            </d:response>
            <d:response>
                <d:href>/file.bin</d:href>
            </d:response>
        </d:multistatus>"#;

        let items = parse_propfind_response(xml, &base(), false).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_directory);
        assert!(!items[1].is_directory);
        assert_eq!(items[1].size, 0);
        assert!(items[1].content_type.is_none());
    }

    #[test]
    fn test_url_encoded_names_and_full_url_hrefs() {
        let xml = r#"<?xml version="1.0"?>
        <d:multistatus xmlns:d="DAV:">
            <d:response>
                <d:href>/photos/Summer%20Trip/IMG%201.JPG</d:href>
            </d:response>
            <d:response>
                <d:href>https://cdn.example.com/x/y.jpg</d:href>
            </d:response>
        </d:multistatus>"#;

        let items = parse_propfind_response(xml, &base(), false).unwrap();
        assert_eq!(items[0].name, "IMG 1.JPG");
        assert_eq!(items[0].path, "/photos/Summer%20Trip/IMG%201.JPG");
        assert_eq!(items[0].url.as_str(), "https://dav.example.com/photos/Summer%20Trip/IMG%201.JPG");
        assert_eq!(items[1].url.as_str(), "https://cdn.example.com/x/y.jpg");
    }

    #[test]
    fn test_guesses_missing_content_type_from_extension() {
        let xml = r#"<?xml version="1.0"?>
        <d:multistatus xmlns:d="DAV:">
            <d:response><d:href>/a/photo.png</d:href></d:response>
            <d:response>
                <d:href>/a/sub/</d:href>
                <d:propstat><d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop></d:propstat>
            </d:response>
        </d:multistatus>"#;

        let guessed = parse_propfind_response(xml, &base(), true).unwrap();
        assert_eq!(guessed[0].content_type.as_deref(), Some("image/png"));
        assert!(guessed[1].content_type.is_none());

        let strict = parse_propfind_response(xml, &base(), false).unwrap();
        assert!(strict[0].content_type.is_none());
        assert!(!strict[0].is_image());
    }

    #[test]
    fn test_missing_dates_fall_back() {
        let xml = r#"<?xml version="1.0"?>
        <d:multistatus xmlns:d="DAV:">
            <d:response>
                <d:href>/only-modified.jpg</d:href>
                <d:propstat><d:prop><d:getlastmodified>Tue, 02 Jan 2024 10:00:00 GMT</d:getlastmodified></d:prop></d:propstat>
            </d:response>
            <d:response><d:href>/no-dates.jpg</d:href></d:response>
        </d:multistatus>"#;

        let items = parse_propfind_response(xml, &base(), false).unwrap();
        assert_eq!(items[0].created_date, items[0].modified_date);
        assert_eq!(items[1].modified_date, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let xml = r#"<d:multistatus xmlns:d="DAV:"><d:response><d:href>/a</d:response></d:multistatus>"#;
        assert!(parse_propfind_response(xml, &base(), false).is_err());
    }

    #[test]
    fn test_empty_response() {
        let xml = r#"<?xml version="1.0"?>
        <d:multistatus xmlns:d="DAV:">
        </d:multistatus>"#;

        let items = parse_propfind_response(xml, &base(), false).unwrap();
        assert_eq!(items.len(), 0);
    }
}
