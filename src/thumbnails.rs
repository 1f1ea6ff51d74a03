//! Decoded data-URL payloads handed to egui's image loaders.

use eframe::egui;
use std::collections::HashMap;
use std::sync::Arc;

use crate::data_url;

/// Keeps the raw bytes of every stored image that is on screen, keyed by a
/// `bytes://` URI, so base64 is decoded once and egui caches the texture.
#[derive(Default)]
pub struct ImageCache {
    entries: HashMap<String, Option<Arc<[u8]>>>,
}

impl ImageCache {
    /// `key` must be unique per image (e.g. `material-<id>`).
    pub fn image(&mut self, key: &str, url: &str) -> Option<egui::Image<'static>> {
        let uri = uri_for(key, url)?;
        let bytes = self
            .entries
            .entry(uri.clone())
            .or_insert_with(|| match data_url::decode_bytes(url) {
                Ok(bytes) => Some(bytes.into()),
                Err(e) => {
                    log::warn!("cannot show {}: {}", key, e);
                    None
                }
            })
            .clone()?;
        Some(egui::Image::from_bytes(uri, bytes))
    }

    /// Drop an image from this cache and from egui's texture cache.
    pub fn forget(&mut self, ctx: &egui::Context, key: &str) {
        let prefix = format!("bytes://{}.", key);
        self.entries.retain(|uri, _| {
            if uri.starts_with(&prefix) {
                ctx.forget_image(uri);
                false
            } else {
                true
            }
        });
    }
}

fn uri_for(key: &str, url: &str) -> Option<String> {
    let (mime, _) = data_url::split(url).ok()?;
    Some(format!("bytes://{}.{}", key, data_url::extension_for(mime)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_carries_extension_for_loader() {
        assert_eq!(
            uri_for("material-1", "data:image/jpeg;base64,AAAA").as_deref(),
            Some("bytes://material-1.jpg")
        );
        assert!(uri_for("x", "garbage").is_none());
    }

    #[test]
    fn broken_payload_is_remembered_as_missing() {
        let mut cache = ImageCache::default();
        assert!(cache.image("p", "data:image/png;base64,@@@").is_none());
        assert_eq!(cache.entries.len(), 1);
        assert!(cache.image("p", "data:image/png;base64,@@@").is_none());
        assert_eq!(cache.entries.len(), 1);
    }

    #[test]
    fn forget_removes_only_matching_key() {
        let ctx = egui::Context::default();
        let mut cache = ImageCache::default();
        assert!(cache.image("material-1", "data:image/png;base64,AAAA").is_some());
        assert!(cache.image("material-10", "data:image/png;base64,AAAA").is_some());
        cache.forget(&ctx, "material-1");
        assert_eq!(cache.entries.len(), 1);
        assert!(cache.entries.contains_key("bytes://material-10.png"));
    }
}
