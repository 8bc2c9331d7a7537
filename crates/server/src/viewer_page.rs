/// Landing page: a single live image pointed at the stream endpoint.
pub const VIEWER_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Door camera</title>
  <style>
    body { margin: 0; background: #111; color: #ddd; font-family: sans-serif; text-align: center; }
    img { max-width: 100%; margin-top: 1rem; border: 1px solid #333; }
    p { font-size: 0.9rem; }
  </style>
</head>
<body>
  <img src="/serve" alt="Live door camera">
  <p>Reload the page to try again.</p>
</body>
</html>
"#;
