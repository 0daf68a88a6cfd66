/// Title line printed above a view, e.g. `bookshelf | localhost:5000 | Books`
pub fn header(service_url: &str, title: &str) -> String {
  format!("bookshelf | {} | {}\n", extract_domain(service_url), title)
}

/// Extract host (and port) from the service URL
fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}
