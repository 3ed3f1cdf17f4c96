use ollama_api::normalize_chat_url;
use ollama_api::url::DEFAULT_CHAT_BASE_URL;

#[test]
fn empty_input_uses_default_base() {
    assert_eq!(
        normalize_chat_url(""),
        format!("{DEFAULT_CHAT_BASE_URL}/api/chat/")
    );
}

#[test]
fn bare_host_gets_full_path() {
    assert_eq!(
        normalize_chat_url("https://blog.example.com"),
        "https://blog.example.com/api/chat/"
    );
}

#[test]
fn api_suffix_gets_chat_segment() {
    assert_eq!(
        normalize_chat_url("https://blog.example.com/api"),
        "https://blog.example.com/api/chat/"
    );
}

#[test]
fn full_endpoint_is_kept() {
    assert_eq!(
        normalize_chat_url("https://blog.example.com/api/chat/"),
        "https://blog.example.com/api/chat/"
    );
}

#[test]
fn trailing_slashes_and_whitespace_are_normalized() {
    assert_eq!(
        normalize_chat_url("  https://blog.example.com///  "),
        "https://blog.example.com/api/chat/"
    );
}
