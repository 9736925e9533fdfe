//! Static web UI stored in flash

/// A file served verbatim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asset {
    pub body: &'static [u8],
    pub content_type: &'static str,
}

/// Read-only lookup of static files by request path.
pub trait AssetStore {
    fn get(&self, path: &str) -> Option<Asset>;
}

/// Files compiled into the firmware image.
pub struct EmbeddedAssets {
    files: &'static [(&'static str, &'static [u8])],
}

/// The bundled web UI
pub static WEB_UI: EmbeddedAssets = EmbeddedAssets::new(&[
    ("/index.html", include_bytes!("../web/index.html") as &[u8]),
    (
        "/img/favicon.svg",
        include_bytes!("../web/img/favicon.svg") as &[u8],
    ),
]);

impl EmbeddedAssets {
    pub const fn new(files: &'static [(&'static str, &'static [u8])]) -> Self {
        Self { files }
    }
}

impl AssetStore for EmbeddedAssets {
    fn get(&self, path: &str) -> Option<Asset> {
        self.files
            .iter()
            .find(|(file, _)| *file == path)
            .map(|&(file, body)| Asset {
                body,
                content_type: content_type_for(file),
            })
    }
}

/// MIME type from the file extension
pub fn content_type_for(path: &str) -> &'static str {
    let extension = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match extension {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type_for("/index.html"), "text/html");
        assert_eq!(content_type_for("/img/logo.png"), "image/png");
        assert_eq!(content_type_for("/img/favicon.svg"), "image/svg+xml");
        assert_eq!(content_type_for("/README"), "application/octet-stream");
    }

    #[test]
    fn test_web_ui_is_bundled() {
        let index = WEB_UI.get("/index.html").unwrap();
        assert_eq!(index.content_type, "text/html");
        assert!(index.body.starts_with(b"<!DOCTYPE html>"));
        assert!(WEB_UI.get("/img/favicon.svg").is_some());
        assert!(WEB_UI.get("/missing.html").is_none());
    }
}
