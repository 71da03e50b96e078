//! Rendering of generation results
//!
//! Turns a [`Generation`] into the single-page HTML shown to the user, the
//! `marketing_copy.txt` download and the thumbnail files.

use crate::app::Generation;
use crate::copy::ParsedCopy;
use crate::image::{encode_set, EncodedImage};
use crate::models::{Creativity, Tone};
use crate::Result;
use base64::Engine as _;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const COPY_FILE_NAME: &str = "marketing_copy.txt";
pub const REPORT_FILE_NAME: &str = "index.html";
pub const EMPTY_CAPTION: &str = "Enter your product description above and click Generate.";
const DESCRIPTION_PLACEHOLDER: &str =
    "e.g., A plant-based protein bar with 20g protein, no sugar, and compostable wrapper";

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    // Raw HTML from the model is shown as text, never interpreted.
    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) => Event::Text(raw),
        Event::Start(Tag::Link(kind, dest, title)) if !is_safe_destination(&dest) => {
            Event::Start(Tag::Link(kind, CowStr::Borrowed("#"), title))
        }
        Event::End(Tag::Link(kind, dest, title)) if !is_safe_destination(&dest) => {
            Event::End(Tag::Link(kind, CowStr::Borrowed("#"), title))
        }
        Event::Start(Tag::Image(kind, dest, title)) if !is_safe_destination(&dest) => {
            Event::Start(Tag::Image(kind, CowStr::Borrowed(""), title))
        }
        Event::End(Tag::Image(kind, dest, title)) if !is_safe_destination(&dest) => {
            Event::End(Tag::Image(kind, CowStr::Borrowed(""), title))
        }
        other => other,
    });
    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, parser);
    out
}

fn is_safe_destination(dest: &str) -> bool {
    // Browsers ignore whitespace and control characters inside the scheme.
    let scheme: String = dest
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    !["javascript:", "vbscript:", "data:"]
        .iter()
        .any(|prefix| scheme.starts_with(prefix))
}

/// Inline download link payload carrying `text` byte for byte.
pub fn text_data_uri(text: &str) -> String {
    format!(
        "data:text/plain;charset=utf-8;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(text.as_bytes())
    )
}

pub fn image_file_name(index: usize) -> String {
    format!("thumbnail_{}.png", index + 1)
}

/// Display-ready form of a [`Generation`].
pub struct Report {
    pub id: Uuid,
    pub copy_text: String,
    pub copy_html: String,
    pub parsed: ParsedCopy,
    pub warnings: Vec<String>,
    pub images: std::result::Result<Vec<EncodedImage>, String>,
}

impl Report {
    pub async fn build(generation: &Generation) -> Self {
        let images = match &generation.images {
            Ok(set) => encode_set(set).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        let copy_text = generation.copy.text().to_string();

        Self {
            id: generation.id,
            copy_html: markdown_to_html(&copy_text),
            copy_text,
            parsed: generation.copy.parsed().clone(),
            warnings: generation.copy.warnings().to_vec(),
            images,
        }
    }

    pub fn copy_download_uri(&self) -> String {
        text_data_uri(&self.copy_text)
    }

    pub fn image_data_uris(&self) -> Vec<String> {
        match &self.images {
            Ok(images) => images.iter().map(EncodedImage::data_uri).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Results section of the page.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        out.push_str("<section class=\"results\">\n");
        out.push_str("<h2>📄 Generated Marketing Copy</h2>\n");
        let _ = writeln!(out, "<div class=\"copy\">\n{}</div>", self.copy_html);

        if !self.warnings.is_empty() {
            out.push_str("<ul class=\"warnings\">\n");
            for warning in &self.warnings {
                let _ = writeln!(out, "<li>{}</li>", escape_html(warning));
            }
            out.push_str("</ul>\n");
        }

        out.push_str("<h2>🖼️ AI-Generated Thumbnails</h2>\n");
        match &self.images {
            Ok(images) => {
                out.push_str("<div class=\"grid\">\n");
                for (index, image) in images.iter().enumerate() {
                    let uri = image.data_uri();
                    let _ = writeln!(
                        out,
                        "<figure><img src=\"{uri}\" alt=\"Thumbnail {n}\">\
                         <figcaption><a download=\"{name}\" href=\"{uri}\">Download</a></figcaption></figure>",
                        uri = uri,
                        n = index + 1,
                        name = image_file_name(index),
                    );
                }
                out.push_str("</div>\n");
            }
            Err(message) => {
                let _ = writeln!(
                    out,
                    "<p class=\"error\">Image generation failed: {}</p>",
                    escape_html(message)
                );
            }
        }

        let _ = writeln!(
            out,
            "<a class=\"button\" download=\"{}\" href=\"{}\">⬇️ Download copy (.txt)</a>",
            COPY_FILE_NAME,
            self.copy_download_uri()
        );
        out.push_str("</section>\n");
        out
    }

    /// Write the copy, the thumbnails and a standalone page into `dir`.
    pub async fn write_to_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(dir).await?;
        let mut written = Vec::new();

        let copy_path = dir.join(COPY_FILE_NAME);
        tokio::fs::write(&copy_path, self.copy_text.as_bytes()).await?;
        written.push(copy_path);

        if let Ok(images) = &self.images {
            for (index, image) in images.iter().enumerate() {
                let path = dir.join(image_file_name(index));
                tokio::fs::write(&path, image.png()).await?;
                written.push(path);
            }
        }

        let report_path = dir.join(REPORT_FILE_NAME);
        tokio::fs::write(&report_path, page(None, None, Some(&self.to_html()))).await?;
        written.push(report_path);

        Ok(written)
    }
}

/// Values echoed back into the form.
#[derive(Debug, Clone, Deserialize)]
pub struct FormValues {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default = "default_creativity")]
    pub creativity: f64,
}

fn default_creativity() -> f64 {
    Creativity::DEFAULT
}

impl Default for FormValues {
    fn default() -> Self {
        Self {
            description: String::new(),
            tone: Tone::default(),
            creativity: Creativity::DEFAULT,
        }
    }
}

pub enum Notice<'a> {
    Info(&'a str),
    Error(&'a str),
}

fn form_html(form: &FormValues) -> String {
    let creativity = form.creativity.clamp(Creativity::MIN, Creativity::MAX);
    let mut options = String::new();
    for tone in Tone::ALL {
        let selected = if tone == form.tone { " selected" } else { "" };
        let _ = writeln!(
            options,
            "<option value=\"{}\"{}>{}</option>",
            tone.value(),
            selected,
            tone.label()
        );
    }

    format!(
        r#"<form method="post" action="/generate" id="generate-form">
<label for="description">📝 Describe your product or service</label>
<textarea id="description" name="description" rows="7" placeholder="{placeholder}">{description}</textarea>
<label for="creativity">Creativity / Temperature: <output id="creativity-value">{creativity:.2}</output></label>
<input type="range" id="creativity" name="creativity" min="{min}" max="{max}" step="{step}" value="{creativity:.2}"
 oninput="document.getElementById('creativity-value').value = Number(this.value).toFixed(2)">
<label for="tone">Tone</label>
<select id="tone" name="tone">
{options}</select>
<button type="submit">🚀 Generate copy &amp; images</button>
<p id="working" class="working" hidden>Writing marketing copy, then rendering images (may take ~40s on CPU)…</p>
</form>
<script>
document.getElementById('generate-form').addEventListener('submit', function () {{
  document.getElementById('working').hidden = false;
}});
</script>
"#,
        placeholder = DESCRIPTION_PLACEHOLDER,
        description = escape_html(&form.description),
        creativity = creativity,
        min = Creativity::MIN,
        max = Creativity::MAX,
        step = Creativity::STEP,
        options = options,
    )
}

/// The single page: title, demo notice, optional form, notice and results.
pub fn page(form: Option<&FormValues>, notice: Option<Notice<'_>>, results: Option<&str>) -> String {
    let mut body = String::new();
    if let Some(form) = form {
        body.push_str(&form_html(form));
    }
    match notice {
        Some(Notice::Info(text)) => {
            let _ = writeln!(body, "<p class=\"caption\">{}</p>", escape_html(text));
        }
        Some(Notice::Error(text)) => {
            let _ = writeln!(body, "<p class=\"error\">{}</p>", escape_html(text));
        }
        None => {}
    }
    if let Some(results) = results {
        body.push_str(results);
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Generative Marketing Copywriter</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 1100px; margin: 2rem auto; padding: 0 1rem; }}
form {{ display: grid; gap: 0.5rem; }}
textarea {{ width: 100%; }}
.notice {{ background: #eef6ff; border-left: 4px solid #3b82f6; padding: 0.75rem 1rem; }}
.caption {{ color: #666; }}
.error {{ color: #b91c1c; }}
.warnings {{ color: #92400e; font-size: 0.9rem; }}
.working::before {{ content: "⏳ "; }}
.grid {{ display: grid; grid-template-columns: repeat(3, 1fr); gap: 1rem; }}
.grid img {{ width: 100%; height: auto; }}
.button {{ display: inline-block; margin-top: 1rem; }}
</style>
</head>
<body>
<h1>🎨🤖 Generative Marketing Copywriter</h1>
<p class="notice">💡 <strong>Demo Notice</strong>: this app is a lightweight proof-of-concept without brand-safety filtering.</p>
{body}</body>
</html>
"#,
        body = body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copy::CopyResult;
    use crate::image::{GeneratedImage, ImageSet};
    use crate::models::GenerationRequest;
    use crate::Error;
    use image::{DynamicImage, RgbImage};
    use pretty_assertions::assert_eq;

    const COPY: &str = "- **Headline:** Snack Happy\n- **Body:** Protein & <no> sugar.\n";

    fn generation(images: crate::Result<ImageSet>) -> Generation {
        Generation {
            id: Uuid::new_v4(),
            request: GenerationRequest::new("A protein bar", Tone::Playful, Creativity::default())
                .unwrap(),
            copy: CopyResult::new(COPY.to_string()),
            images,
        }
    }

    fn three_images() -> ImageSet {
        ImageSet::new(
            (0..3)
                .map(|_| GeneratedImage::from_dynamic(DynamicImage::ImageRgb8(RgbImage::new(4, 4))))
                .collect(),
        )
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<a href=\"x\">Tom's & co</a>"),
            "&lt;a href=&quot;x&quot;&gt;Tom&#39;s &amp; co&lt;/a&gt;"
        );
    }

    #[test]
    fn test_markdown_to_html_renders_bullets() {
        let html = markdown_to_html("- **Headline:** Hi\n- two");
        assert!(html.contains("<ul>"));
        assert!(html.contains("<strong>Headline:</strong> Hi"));
    }

    #[test]
    fn test_markdown_to_html_escapes_raw_html() {
        let html = markdown_to_html(
            "- **Body:** Great bar <script>alert(1)</script> <img src=x onerror=alert(2)>",
        );

        assert!(!html.contains("<script>"));
        assert!(!html.contains("<img"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("&lt;img src=x onerror=alert(2)&gt;"));
        assert!(html.contains("<strong>Body:</strong> Great bar"));
    }

    #[test]
    fn test_markdown_to_html_escapes_html_blocks() {
        let html = markdown_to_html("<div onclick=\"steal()\">\nhi\n</div>\n");
        assert!(!html.contains("<div"));
        assert!(html.contains("&lt;div onclick="));
    }

    #[test]
    fn test_markdown_to_html_drops_script_link_targets() {
        let html = markdown_to_html(
            "[Buy now](javascript:alert(1)) [Shop](https://example.com/shop) \
             [x](JavaScript:alert(3)) <javascript:alert(2)> ![pic](data:text/html,hi)",
        );

        let lower = html.to_ascii_lowercase();
        assert!(!lower.contains("href=\"javascript:"));
        assert!(!lower.contains("src=\"data:"));
        assert!(html.contains("<a href=\"#\">Buy now</a>"));
        assert!(html.contains("<a href=\"https://example.com/shop\">Shop</a>"));
    }

    #[tokio::test]
    async fn test_copy_download_round_trips_rendered_text() {
        let report = Report::build(&generation(Ok(three_images()))).await;

        let uri = report.copy_download_uri();
        let payload = uri
            .strip_prefix("data:text/plain;charset=utf-8;base64,")
            .unwrap();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .unwrap();

        assert_eq!(bytes, COPY.as_bytes());
        assert_eq!(report.copy_html, markdown_to_html(COPY));
    }

    #[tokio::test]
    async fn test_results_html_links_every_image() {
        let report = Report::build(&generation(Ok(three_images()))).await;
        let html = report.to_html();

        assert_eq!(report.image_data_uris().len(), 3);
        assert_eq!(html.matches("data:image/png;base64,").count(), 6);
        assert!(html.contains("download=\"thumbnail_3.png\""));
        assert!(html.contains("download=\"marketing_copy.txt\""));
        assert!(html.contains("Protein &amp; &lt;no&gt; sugar."));
    }

    #[tokio::test]
    async fn test_image_failure_is_rendered_next_to_copy() {
        let report = Report::build(&generation(Err(Error::Inference(
            "server <down>".to_string(),
        ))))
        .await;
        let html = report.to_html();

        assert!(report.image_data_uris().is_empty());
        assert!(html.contains("Generated Marketing Copy"));
        assert!(html.contains("Image generation failed: Image inference error: server &lt;down&gt;"));
        assert!(html.contains("download=\"marketing_copy.txt\""));
    }

    #[tokio::test]
    async fn test_write_to_dir_writes_copy_images_and_page() {
        let dir = tempfile::tempdir().unwrap();
        let report = Report::build(&generation(Ok(three_images()))).await;

        let written = report.write_to_dir(dir.path()).await.unwrap();
        assert_eq!(written.len(), 5);

        let copy = std::fs::read(dir.path().join(COPY_FILE_NAME)).unwrap();
        assert_eq!(copy, COPY.as_bytes());

        let thumb = image::open(dir.path().join("thumbnail_1.png")).unwrap();
        assert_eq!(thumb.width(), 4);

        let page = std::fs::read_to_string(dir.path().join(REPORT_FILE_NAME)).unwrap();
        assert!(page.contains("AI-Generated Thumbnails"));
        assert!(!page.contains("<form"));
    }

    #[test]
    fn test_page_form_echoes_values() {
        let form = FormValues {
            description: "Mugs <3".to_string(),
            tone: Tone::TechSavvy,
            creativity: 0.35,
        };
        let html = page(Some(&form), Some(Notice::Info(EMPTY_CAPTION)), None);

        assert!(html.contains(">Mugs &lt;3</textarea>"));
        assert!(html.contains("<option value=\"tech-savvy\" selected>Tech-Savvy</option>"));
        assert!(html.contains("value=\"0.35\""));
        assert!(html.contains("min=\"0.2\" max=\"1\" step=\"0.05\""));
        assert!(html.contains(EMPTY_CAPTION));
    }
}
