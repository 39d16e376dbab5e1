pub fn is_remote(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();

    lower.starts_with("http://") || lower.starts_with("https://")
}
