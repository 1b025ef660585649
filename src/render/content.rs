use std::path::Path;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde_json::Value;

use super::markdown::{escape_html, render_markdown};
use crate::assets::AssetResolver;
use crate::models::{AssetIndex, AssetResolution, MessageContent};

// Characters to percent-encode in one media URL path segment
const SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%')
    .add(b'\'')
    .add(b'\\');

/// Kind of media a pointer part refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

/// Everything content rendering needs to turn asset pointers into media elements
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub resolver: AssetResolver<'a>,
    pub media_root: &'a Path,
    pub index: &'a AssetIndex,
    /// Prepended to the percent-encoded path relative to the media root
    pub media_url_prefix: &'a str,
}

impl RenderContext<'_> {
    fn media_url(&self, relative: &Path) -> String {
        let encoded: Vec<String> = relative
            .components()
            .map(|c| utf8_percent_encode(&c.as_os_str().to_string_lossy(), SEGMENT_ENCODE_SET).to_string())
            .collect();
        format!("{}/{}", self.media_url_prefix.trim_end_matches('/'), encoded.join("/"))
    }
}

/// HTML and plain text of one message body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedBody {
    pub html: String,
    pub text: String,
}

impl RenderedBody {
    fn push_html(&mut self, html: &str) {
        self.html.push_str(html);
    }

    fn push_text(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(text);
    }

    pub fn is_empty(&self) -> bool {
        self.html.trim().is_empty()
    }
}

/// Renders one message body
///
/// Text parts go through sanitized markdown, transcriptions stay plain text and asset
/// pointers become media elements (or a "missing" block when they do not resolve).
pub fn render_content(content: &MessageContent, ctx: &RenderContext<'_>) -> RenderedBody {
    let mut body = RenderedBody::default();

    match content.content_type.as_str() {
        "code" => {
            if let Some(text) = content.text.as_deref() {
                let class = content
                    .language
                    .as_deref()
                    .filter(|lang| !lang.is_empty() && *lang != "unknown")
                    .map(|lang| format!(r#" class="language-{}""#, escape_html(lang)))
                    .unwrap_or_default();
                body.push_html(&format!("<pre><code{}>{}</code></pre>", class, escape_html(text)));
                body.push_text(text);
            }
        }
        "execution_output" => {
            if let Some(text) = content.text.as_deref() {
                body.push_html(&format!(
                    r#"<pre class="execution-output">{}</pre>"#,
                    escape_html(text)
                ));
                body.push_text(text);
            }
        }
        _ => match (&content.parts, content.text.as_deref()) {
            (Some(parts), _) => {
                for part in parts {
                    render_part(part, ctx, &mut body);
                }
            }
            (None, Some(text)) => {
                body.push_html(&render_markdown(text));
                body.push_text(text);
            }
            (None, None) => {}
        },
    }

    body
}

/// Plain text of a message body, without resolving any assets
pub fn content_text(content: &MessageContent) -> String {
    let mut body = RenderedBody::default();

    if let Some(parts) = &content.parts {
        for part in parts {
            match part {
                Value::String(text) => body.push_text(text),
                Value::Object(map) => {
                    if let Some(text) = map.get("text").and_then(Value::as_str) {
                        body.push_text(text);
                    }
                }
                _ => {}
            }
        }
    } else if let Some(text) = content.text.as_deref() {
        body.push_text(text);
    }

    body.text
}

fn render_part(part: &Value, ctx: &RenderContext<'_>, body: &mut RenderedBody) {
    let map = match part {
        Value::String(text) => {
            if !text.trim().is_empty() {
                body.push_html(&render_markdown(text));
                body.push_text(text);
            }
            return;
        }
        Value::Object(map) => map,
        _ => return,
    };

    let content_type = map.get("content_type").and_then(Value::as_str).unwrap_or_default();
    match content_type {
        "audio_transcription" => {
            if let Some(text) = map.get("text").and_then(Value::as_str) {
                body.push_html(&format!(r#"<p class="transcription">{}</p>"#, escape_html(text)));
                body.push_text(text);
            }
        }
        "image_asset_pointer" => render_pointer(part, MediaKind::Image, ctx, body),
        "audio_asset_pointer" => render_pointer(part, MediaKind::Audio, ctx, body),
        "video_container_asset_pointer" => render_pointer(part, MediaKind::Video, ctx, body),
        "real_time_user_audio_video_asset_pointer" => render_realtime(part, ctx, body),
        _ => {
            if let Some(text) = map.get("text").and_then(Value::as_str) {
                body.push_html(&render_markdown(text));
                body.push_text(text);
            } else {
                tracing::debug!(content_type, "skipping unsupported content part");
            }
        }
    }
}

/// Audio, video and captured frames from a real-time voice session
fn render_realtime(part: &Value, ctx: &RenderContext<'_>, body: &mut RenderedBody) {
    if let Some(audio) = part.get("audio_asset_pointer").filter(|v| v.is_object()) {
        render_pointer(audio, MediaKind::Audio, ctx, body);
    }
    if let Some(video) = part.get("video_container_asset_pointer").filter(|v| v.is_object()) {
        render_pointer(video, MediaKind::Video, ctx, body);
    }

    let frames: Vec<&Value> = part
        .get("frames_asset_pointers")
        .and_then(Value::as_array)
        .map(|frames| frames.iter().collect())
        .unwrap_or_default();
    if frames.is_empty() {
        return;
    }

    body.push_html(r#"<div class="asset-frames">"#);
    for frame in frames {
        render_pointer(frame, MediaKind::Image, ctx, body);
    }
    body.push_html("</div>");
}

fn render_pointer(part: &Value, kind: MediaKind, ctx: &RenderContext<'_>, body: &mut RenderedBody) {
    let pointer = part.get("asset_pointer").and_then(Value::as_str).unwrap_or_default();

    let resolution = if pointer.is_empty() {
        AssetResolution::NotFound
    } else {
        ctx.resolver.resolve(pointer, ctx.media_root, ctx.index)
    };

    match resolution {
        AssetResolution::Found { relative, .. } => {
            let src = escape_html(&ctx.media_url(&relative));
            let element = match kind {
                MediaKind::Image => format!(r#"<img src="{}" alt="image" loading="lazy">"#, src),
                MediaKind::Audio => format!(r#"<audio controls preload="none" src="{}"></audio>"#, src),
                MediaKind::Video => format!(r#"<video controls preload="none" src="{}"></video>"#, src),
            };
            body.push_html(&format!(
                r#"<figure class="asset asset-{}">{}</figure>"#,
                kind.as_str(),
                element
            ));
        }
        AssetResolution::NotFound => {
            body.push_html(&format!(
                r#"<div class="asset-missing" data-kind="{}">Missing {}</div>"#,
                kind.as_str(),
                kind.as_str()
            ));
        }
    }
}
