use crate::lifecycle::format_timestamp;
use crate::pastes::OpenedPaste;

/// Escape text for use inside HTML elements and quoted attributes.
pub fn escape_html(input: &str) -> String {
    html_escape::encode_safe(input).into_owned()
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }}
pre {{ white-space: pre-wrap; word-break: break-word; background: #f5f5f5; padding: 1rem; border-radius: 4px; }}
.meta {{ color: #555; font-size: 0.9rem; }}
</style>
</head>
<body>
{body}
</body>
</html>
"#
    )
}

pub fn render_paste(paste: &OpenedPaste) -> String {
    let views = match paste.remaining_views {
        Some(0) => "This was the last view.".to_string(),
        Some(1) => "1 view remaining.".to_string(),
        Some(n) => format!("{n} views remaining."),
        None => "Unlimited views.".to_string(),
    };
    let expiry = match paste.expires_at {
        Some(ms) => format!(
            r#"Expires at <time datetime="{ts}">{ts}</time>."#,
            ts = format_timestamp(ms)
        ),
        None => "Never expires.".to_string(),
    };

    let body = format!(
        r#"<h1>Paste {id}</h1>
<pre>{content}</pre>
<p class="meta">{views} {expiry}</p>
<p><a href="/">Create a new paste</a></p>"#,
        id = escape_html(&paste.id),
        content = escape_html(&paste.content),
    );

    layout("Paste", &body)
}

pub fn render_not_found() -> String {
    layout(
        "Paste not found",
        r#"<h1>Paste not found</h1>
<p>This paste does not exist, has expired, or has reached its view limit.</p>
<p><a href="/">Create a new paste</a></p>"#,
    )
}

pub fn render_error() -> String {
    layout(
        "Something went wrong",
        r#"<h1>Something went wrong</h1>
<p>Please try again later.</p>"#,
    )
}
