//! Inline HTML for the login page.

const LOGIN_STYLES: &str = r#"
    body {
        font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Arial, sans-serif;
        max-width: 420px;
        margin: 60px auto;
        padding: 0 20px;
        background: #f5f5f5;
    }
    .container {
        background: white;
        padding: 30px;
        border-radius: 8px;
        box-shadow: 0 2px 4px rgba(0,0,0,0.1);
    }
    label { display: block; font-weight: bold; margin: 12px 0 5px; }
    input[type="email"], input[type="password"] {
        width: 100%;
        padding: 10px;
        border: 1px solid #ddd;
        border-radius: 4px;
        box-sizing: border-box;
    }
    button {
        margin-top: 20px;
        background: #0066cc;
        color: white;
        padding: 10px 20px;
        border: none;
        border-radius: 4px;
        cursor: pointer;
    }
    .error { color: #b00020; margin-bottom: 10px; }
"#;

/// Minimal escaping for values echoed back into attributes and text.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn login_page(error: Option<&str>, email: &str, next: Option<&str>) -> String {
    let error_html = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape(e)))
        .unwrap_or_default();
    let next_html = next
        .map(|n| format!(r#"<input type="hidden" name="next" value="{}">"#, escape(n)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Log in</title>
    <style>{styles}</style>
</head>
<body>
    <div class="container">
        <h1>Log in</h1>
        {error_html}
        <form method="post" action="/login/">
            <label for="email">Email</label>
            <input type="email" id="email" name="email" value="{email}" autofocus required>
            <label for="password">Password</label>
            <input type="password" id="password" name="password" required>
            {next_html}
            <button type="submit">Log in</button>
        </form>
    </div>
</body>
</html>"#,
        styles = LOGIN_STYLES,
        email = escape(email),
    )
}
