/// Clean comment HTML using the ammonia library.
///
/// Whitelist-based: safe formatting tags (like <b>, <p>) survive,
/// <script> and <style> are dropped together with their content, and
/// unknown tags and event-handler attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
