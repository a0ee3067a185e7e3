//! The browser front end, compiled into the binary.

/// A static file served as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asset {
    pub content_type: &'static str,
    pub body: &'static str,
}

const INDEX: Asset = Asset {
    content_type: "text/html; charset=utf-8",
    body: include_str!("../static/index.html"),
};

const ABOUT: Asset = Asset {
    content_type: "text/html; charset=utf-8",
    body: include_str!("../static/about.html"),
};

const CLIENT_JS: Asset = Asset {
    content_type: "application/javascript; charset=utf-8",
    body: include_str!("../static/client.js"),
};

const STYLES: Asset = Asset {
    content_type: "text/css; charset=utf-8",
    body: include_str!("../static/styles.css"),
};

pub fn asset(path: &str) -> Option<Asset> {
    match path {
        "/" => Some(INDEX),
        "/about" => Some(ABOUT),
        "/client.js" => Some(CLIENT_JS),
        "/styles.css" => Some(STYLES),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_script_streams_with_one_decoder() {
        let script = asset("/client.js").unwrap().body;
        assert!(script.contains("new TextDecoder()"));
        assert!(script.contains("{ stream: true }"));
        assert!(script.contains("textContent = accumulated"));
        assert!(script.contains("/api/render"));
        assert!(script.contains("Failed to ask Claude"));
    }

    #[test]
    fn client_script_writes_html_once_after_the_last_chunk() {
        let script = asset("/client.js").unwrap().body;
        let flush = script.find("accumulated += decoder.decode();").unwrap();
        let render = script.find("await renderMarkdown(accumulated)").unwrap();
        let write = script.find("innerHTML = html").unwrap();

        assert_eq!(script.matches("innerHTML = html").count(), 1);
        assert!(flush < render && render < write);
    }

    #[test]
    fn unknown_paths_have_no_asset() {
        assert_eq!(asset("/index.html"), None);
        assert_eq!(asset("/api/ask"), None);
    }
}
