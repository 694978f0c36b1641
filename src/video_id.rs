use url::Url;

/// Pull the video id out of a bare id or one of the usual YouTube URL shapes
/// (`youtu.be/<id>`, `/watch?v=<id>`, `/shorts/<id>`, `/embed/<id>`).
/// Anything else comes back trimmed but otherwise unchanged.
pub fn extract_video_id(value: &str) -> String {
    let value = value.trim();
    if !value.contains("://") {
        return value.to_string();
    }
    let Ok(url) = Url::parse(value) else {
        return value.to_string();
    };

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let path = url.path();

    if host.ends_with("youtu.be") {
        return path.trim_start_matches('/').split('/').next().unwrap_or_default().to_string();
    }
    if path == "/watch" {
        if let Some((_, v)) = url.query_pairs().find(|(k, v)| k == "v" && !v.is_empty()) {
            return v.into_owned();
        }
    }
    for prefix in ["/shorts/", "/embed/"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            return rest.split('/').next().unwrap_or_default().to_string();
        }
    }
    value.to_string()
}
